use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::PlayerEvent;

/// Outbound progress reporting. Must never block or fail playback, so the
/// interface is synchronous fire-and-forget.
pub trait AnalyticsSink: Send + Sync {
    fn report(&self, event: &PlayerEvent);
}

/// POSTs each event as JSON to a configured endpoint from a spawned task;
/// delivery failures are logged and dropped.
pub struct HttpAnalyticsSink {
    client: Client,
    endpoint: String,
}

impl HttpAnalyticsSink {
    pub fn new(endpoint: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, endpoint }
    }
}

impl AnalyticsSink for HttpAnalyticsSink {
    fn report(&self, event: &PlayerEvent) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let payload = event.clone();
        tokio::spawn(async move {
            if let Err(e) = client.post(&endpoint).json(&payload).send().await {
                debug!(error = %e, "analytics post dropped");
            }
        });
    }
}

/// Discards everything; the default when no endpoint is configured.
pub struct NullAnalyticsSink;

impl AnalyticsSink for NullAnalyticsSink {
    fn report(&self, _event: &PlayerEvent) {}
}
