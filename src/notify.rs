//! Best-effort notification delivery.
//!
//! One POST per message, no retries, failures logged and discarded. The
//! dispatcher never blocks the caller beyond one request timeout and never
//! propagates an error into the cycle.

use crate::error::{BrainError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// An external channel messages can be posted to.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post one message. An error here is the sink's problem alone.
    async fn post(&self, content: &str) -> Result<()>;
}

/// Webhook sink (Discord-compatible): POST `{"content": ...}`, success is
/// exactly 204 No Content.
pub struct WebhookSink {
    url: String,
    client: reqwest::Client,
}

impl WebhookSink {
    /// Create a sink posting to `url`.
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BrainError::Notify(format!("cannot build webhook client: {e}")))?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn post(&self, content: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| BrainError::Notify(format!("webhook request failed: {e}")))?;

        if response.status() != reqwest::StatusCode::NO_CONTENT {
            return Err(BrainError::Notify(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Fire-and-forget wrapper over an optional sink.
#[derive(Clone, Default)]
pub struct Dispatcher {
    sink: Option<Arc<dyn NotificationSink>>,
}

impl Dispatcher {
    /// Dispatcher over a configured sink.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Dispatcher with no channel configured; every notify is a no-op.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Whether a channel is configured.
    pub fn is_configured(&self) -> bool {
        self.sink.is_some()
    }

    /// Deliver one message, best effort.
    pub async fn notify(&self, message: &str) {
        let Some(sink) = self.sink.as_ref() else {
            debug!("no notification channel configured, dropping message");
            return;
        };

        match sink.post(message).await {
            Ok(()) => debug!("notification sent"),
            Err(e) => warn!(error = %e, "notification failed, not retrying"),
        }
    }
}
