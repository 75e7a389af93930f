use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use shell_activation::{
    ActivationError, ActivationRequest, ActivationSource, HandlerError, IngressOutcome,
    RegistrationHandle, RegistrationService,
};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Records every request a primary handler receives.
#[derive(Clone, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<ActivationRequest>>>,
    calls: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ActivationRequest> {
        self.requests.lock().clone()
    }

    pub fn register(&self, service: &RegistrationService, app: &str) -> RegistrationHandle {
        let recorder = self.clone();
        service
            .coordinator()
            .register(app, move |request: ActivationRequest, _cancel: CancellationToken| {
                let recorder = recorder.clone();
                async move {
                    recorder.calls.fetch_add(1, Ordering::SeqCst);
                    recorder.requests.lock().push(request);
                    Ok::<(), HandlerError>(())
                }
            })
            .expect("primary registration should succeed")
    }
}

pub async fn ingest(
    service: &RegistrationService,
    raw: &str,
) -> Result<IngressOutcome, ActivationError> {
    let uri = Url::parse(raw).expect("scenario uri should parse");
    service
        .ingest_activation(&uri, ActivationSource::ProtocolLaunch, &CancellationToken::new())
        .await
}
