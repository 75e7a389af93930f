mod ownership;
mod replay;
mod routing;
mod support;

use shell_activation::VERSION;

#[test]
fn scenarios_binary_smoke_runs() {
    assert!(!VERSION.is_empty());
}
