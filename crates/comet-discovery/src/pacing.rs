//! Minimum spacing between consecutive calls to one external API.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces out calls through it by at least `min_gap`, across every phase and
/// worker that shares the gate. The first call never waits.
#[derive(Debug)]
pub(crate) struct RequestGate {
    name: &'static str,
    min_gap: Duration,
    last: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub(crate) fn new(name: &'static str, min_gap: Duration) -> Self {
        Self {
            name,
            min_gap,
            last: Mutex::new(None),
        }
    }

    /// Waits until `min_gap` has passed since the previous call, then claims
    /// the slot. The lock is held while sleeping so concurrent callers queue.
    pub(crate) async fn wait(&self) {
        if self.min_gap.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_gap {
                let delay = self.min_gap.saturating_sub(elapsed);
                tracing::trace!(api = self.name, ?delay, "pacing request");
                tokio::time::sleep(delay).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// One gate per external collaborator the engine calls repeatedly.
#[derive(Debug)]
pub(crate) struct Pacing {
    pub(crate) trends: RequestGate,
    pub(crate) search: RequestGate,
    pub(crate) profiles: RequestGate,
    pub(crate) classifier: RequestGate,
}

impl Pacing {
    pub(crate) fn new(min_gap: Duration) -> Self {
        Self {
            trends: RequestGate::new("trends", min_gap),
            search: RequestGate::new("search", min_gap),
            profiles: RequestGate::new("profiles", min_gap),
            classifier: RequestGate::new("classifier", min_gap),
        }
    }
}
