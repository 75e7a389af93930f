use std::sync::Arc;
use std::time::Duration;

use shell_activation::{
    IngressOutcome, RegistrationHandle, RegistrationService, RegistrationServiceConfig,
    RouteDeclaration,
};

use crate::support::{Recorder, ingest};

const WINDOW: Duration = Duration::from_secs(5);

fn service_with_primary(window: Duration) -> (RegistrationService, Recorder, RegistrationHandle) {
    let service = RegistrationService::new(RegistrationServiceConfig {
        replay_window: window,
    });
    service.register_route(
        RouteDeclaration::new("app1", "myapp", None).expect("declaration should be valid"),
    );
    let recorder = Recorder::default();
    let handle = recorder.register(&service, "app1");
    (service, recorder, handle)
}

#[tokio::test(start_paused = true)]
async fn same_uri_is_suppressed_within_window_and_admitted_after() {
    let (service, recorder, _primary) = service_with_primary(WINDOW);

    let first = ingest(&service, "myapp://host/test?id=1").await.expect("ingest");
    tokio::time::advance(WINDOW - Duration::from_millis(1)).await;
    let second = ingest(&service, "myapp://host/test?id=1").await.expect("ingest");
    tokio::time::advance(Duration::from_millis(2)).await;
    let third = ingest(&service, "myapp://host/test?id=1").await.expect("ingest");

    assert_eq!(first, IngressOutcome::Dispatched);
    assert_eq!(second, IngressOutcome::Duplicate);
    assert_eq!(third, IngressOutcome::Dispatched);
    assert_eq!(recorder.calls(), 2);
}

#[tokio::test]
async fn case_and_trailing_slash_variants_count_as_duplicates() {
    let (service, recorder, _primary) = service_with_primary(WINDOW);

    let first = ingest(&service, "MyApp://HOST/Test/").await.expect("ingest");
    let second = ingest(&service, "myapp://host/test").await.expect("ingest");

    assert_eq!(first, IngressOutcome::Dispatched);
    assert_eq!(second, IngressOutcome::Duplicate);
    assert_eq!(recorder.calls(), 1);
}

#[tokio::test]
async fn different_queries_are_independent() {
    let (service, recorder, _primary) = service_with_primary(WINDOW);

    ingest(&service, "myapp://host/test?id=1").await.expect("ingest");
    let other = ingest(&service, "myapp://host/test?id=2").await.expect("ingest");

    assert_eq!(other, IngressOutcome::Dispatched);
    assert_eq!(recorder.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_activations_dispatch_exactly_once() {
    let (service, recorder, _primary) = service_with_primary(WINDOW);
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { ingest(&service, "myapp://host/race").await })
        })
        .collect();

    let mut dispatched = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.expect("task should join").expect("ingest") {
            IngressOutcome::Dispatched => dispatched += 1,
            IngressOutcome::Duplicate => duplicates += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(dispatched, 1);
    assert_eq!(duplicates, 15);
    assert_eq!(recorder.calls(), 1);
}
