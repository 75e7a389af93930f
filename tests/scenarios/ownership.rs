use std::thread;

use shell_activation::{
    ActivationError, ActivationRequest, ForwardOutcome, IngressOutcome, OwnershipCoordinator,
    RegistrationService, RegistrationServiceConfig, RouteDeclaration,
};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::support::{Recorder, ingest};

fn service() -> RegistrationService {
    let service = RegistrationService::default();
    service.register_route(
        RouteDeclaration::new("app1", "myapp", None).expect("declaration should be valid"),
    );
    service
}

#[test]
fn concurrent_registrations_produce_one_primary() {
    let service = service();
    let recorder = Recorder::default();

    let handles = thread::scope(|scope| {
        let workers: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| recorder.register(&service, "app1")))
            .collect();
        workers
            .into_iter()
            .map(|worker| worker.join().expect("register thread should finish"))
            .collect::<Vec<_>>()
    });

    assert_eq!(handles.iter().filter(|handle| handle.is_primary()).count(), 1);
}

#[tokio::test]
async fn new_primary_takes_over_after_dispose() {
    let service = service();
    let first = Recorder::default();
    let second = Recorder::default();

    let first_handle = first.register(&service, "app1");
    ingest(&service, "myapp://host/one").await.expect("ingest");
    first_handle.dispose();

    let second_handle = second.register(&service, "app1");
    assert!(second_handle.is_primary());
    ingest(&service, "myapp://host/two").await.expect("ingest");

    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn stale_handle_dispose_keeps_newer_owner() {
    let service = service();
    let original = Recorder::default();
    let stale = Recorder::default();
    let current = Recorder::default();

    let original_handle = original.register(&service, "app1");
    let stale_handle = stale.register(&service, "app1");
    assert!(!stale_handle.is_primary());
    original_handle.dispose();

    let current_handle = current.register(&service, "app1");
    assert!(current_handle.is_primary());

    // The secondary's first dispose runs the conditional release.
    drop(stale_handle);

    assert_eq!(
        service.coordinator().primary_registration("app1"),
        Some(current_handle.registration_id())
    );
    let outcome = ingest(&service, "myapp://host/test").await.expect("ingest");

    assert_eq!(outcome, IngressOutcome::Dispatched);
    assert_eq!(current.calls(), 1);
    assert_eq!(stale.calls(), 0);
    assert_eq!(original.calls(), 0);
}

#[tokio::test]
async fn secondary_instance_forwards_to_primary_of_shared_coordinator() {
    let coordinator = OwnershipCoordinator::new();
    let primary_service = RegistrationService::with_coordinator(
        RegistrationServiceConfig::default(),
        coordinator.clone(),
    );
    let primary = Recorder::default();
    let _primary_handle = primary.register(&primary_service, "app1");

    let secondary_service =
        RegistrationService::with_coordinator(RegistrationServiceConfig::default(), coordinator);
    let secondary = Recorder::default();
    let secondary_handle = secondary.register(&secondary_service, "app1");
    assert!(!secondary_handle.is_primary());

    let request = ActivationRequest::new(
        Url::parse("myapp://host/forwarded").expect("uri should parse"),
        [("origin", "secondary")],
        None,
    );
    let outcome = secondary_handle
        .forward(request, &CancellationToken::new())
        .await
        .expect("forward should succeed");

    assert_eq!(outcome, ForwardOutcome::Delivered);
    assert_eq!(primary.calls(), 1);
    assert_eq!(secondary.calls(), 0);
    assert_eq!(
        primary.requests()[0].metadata_value("origin"),
        Some("secondary")
    );
}

#[tokio::test]
async fn forwarding_through_disposed_handle_fails() {
    let service = service();
    let recorder = Recorder::default();
    let handle = recorder.register(&service, "app1");
    handle.dispose();

    let request = ActivationRequest::new(
        Url::parse("myapp://host/late").expect("uri should parse"),
        Vec::<(String, String)>::new(),
        None,
    );
    let result = handle.forward(request, &CancellationToken::new()).await;

    assert!(matches!(result, Err(ActivationError::Disposed)));
}
