pub mod activation;
pub mod runtime;
