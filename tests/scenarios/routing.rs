use shell_activation::shell::activation::DiagnosticEventType;
use shell_activation::shell::activation::diagnostics::{OUTCOME_NO_ACTIVE_PRIMARY, OUTCOME_NO_MATCH};
use shell_activation::shell::activation::request::{METADATA_ROUTE, METADATA_SOURCE};
use shell_activation::{IngressOutcome, RegistrationService, RouteDeclaration, RouteRegistration};

use crate::support::{Recorder, ingest};

fn route(app: &str, scheme: &str, host: Option<&str>) -> RouteDeclaration {
    RouteDeclaration::new(app, scheme, host).expect("declaration should be valid")
}

#[test]
fn duplicate_declaration_is_rejected_the_second_time() {
    let service = RegistrationService::default();

    assert_eq!(
        service.register_route(route("appA", "x", None)),
        RouteRegistration::Accepted
    );
    assert_eq!(
        service.register_route(route("appA", "x", None)),
        RouteRegistration::Rejected("duplicate-declaration".to_string())
    );
}

#[tokio::test]
async fn scheme_and_host_isolate_identities() {
    let service = RegistrationService::default();
    service.register_route(route("appA", "x", Some("open")));
    service.register_route(route("appB", "x", Some("launch")));
    let app_a = Recorder::default();
    let app_b = Recorder::default();
    let _a = app_a.register(&service, "appA");
    let _b = app_b.register(&service, "appB");

    let routed = ingest(&service, "x://open/path").await.expect("ingest");
    let unrouted = ingest(&service, "x://other/path").await.expect("ingest");

    assert_eq!(routed, IngressOutcome::Dispatched);
    assert_eq!(unrouted, IngressOutcome::NoMatchingRoute);
    assert_eq!(app_a.calls(), 1);
    assert_eq!(app_b.calls(), 0);
}

#[tokio::test]
async fn delivered_request_carries_uri_and_metadata() {
    let service = RegistrationService::default();
    service.register_route(route("app1", "myapp", None));
    let recorder = Recorder::default();
    let _primary = recorder.register(&service, "app1");

    ingest(&service, "myapp://Host/Test/").await.expect("ingest");

    let requests = recorder.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].deep_link_uri().as_str(), "myapp://Host/Test/");
    assert_eq!(requests[0].metadata_value(METADATA_SOURCE), Some("ProtocolLaunch"));
    assert_eq!(requests[0].metadata_value(METADATA_ROUTE), Some("myapp://host/test"));
}

#[tokio::test]
async fn unmatched_and_unowned_routes_share_outcome_but_not_diagnostics() {
    let service = RegistrationService::default();
    service.register_route(route("app1", "myapp", None));
    let diagnostics = service.subscribe_diagnostics();

    let unowned = ingest(&service, "myapp://host/test").await.expect("ingest");
    let unmatched = ingest(&service, "other://host/test").await.expect("ingest");

    assert_eq!(unowned, IngressOutcome::NoMatchingRoute);
    assert_eq!(unmatched, IngressOutcome::NoMatchingRoute);

    let outcomes: Vec<_> = diagnostics
        .try_iter()
        .filter(|event| event.event_type == DiagnosticEventType::NoMatchingRoute)
        .map(|event| (event.outcome, event.reason))
        .collect();
    assert_eq!(
        outcomes,
        [
            (OUTCOME_NO_ACTIVE_PRIMARY, Some("no-active-primary".to_string())),
            (OUTCOME_NO_MATCH, None),
        ]
    );
}
