pub mod deep_link_route;
