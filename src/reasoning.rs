//! Reasoning backend wrapper: the only component allowed to spend budget.
//!
//! [`ReasoningClient::think`] fails closed: a missing credential, a budget
//! rejection, or any backend error yields `None` and never an escaping error.
//! On success the actual cost is computed from the reported token counts and
//! recorded against the tracker.

use crate::budget::BudgetGate;
use crate::config::ReasoningConfig;
use crate::error::{BrainError, Result};
use crate::state::{BudgetTracker, StateStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-token prices (currency units). Two-tier: input and output.
pub const PRICE_PER_INPUT_TOKEN: f64 = 0.000_003;
pub const PRICE_PER_OUTPUT_TOKEN: f64 = 0.000_015;

/// One completed backend call: generated text plus reported token usage.
#[derive(Debug, Clone)]
pub struct ReasoningResponse {
    /// Generated text.
    pub text: String,
    /// Tokens consumed by the prompt.
    pub input_tokens: u64,
    /// Tokens generated.
    pub output_tokens: u64,
}

impl ReasoningResponse {
    /// Actual cost of this call under the fixed price table.
    pub fn cost(&self) -> f64 {
        self.input_tokens as f64 * PRICE_PER_INPUT_TOKEN
            + self.output_tokens as f64 * PRICE_PER_OUTPUT_TOKEN
    }
}

/// A reasoning backend capable of one prompt-to-text completion.
///
/// Injected as a capability so tests substitute deterministic fakes.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Whether a usable credential is configured. When `false` the client
    /// refuses to call without contacting the network.
    fn has_credential(&self) -> bool;

    /// Run one completion.
    async fn complete(&self, prompt: &str) -> Result<ReasoningResponse>;
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Anthropic Messages API backend, non-streaming.
pub struct AnthropicBackend {
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicBackend {
    /// Build a backend from config, resolving the credential reference once.
    pub fn from_config(config: &ReasoningConfig) -> Self {
        Self::new(
            config.api_url.clone(),
            config.api_key.resolve(),
            config.model.clone(),
            config.max_tokens,
        )
    }

    /// Create a backend with explicit connection details.
    pub fn new(base_url: String, api_key: Option<String>, model: String, max_tokens: u32) -> Self {
        Self {
            base_url,
            api_key,
            model,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ReasoningBackend for AnthropicBackend {
    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, prompt: &str) -> Result<ReasoningResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(BrainError::Reasoning("no API key configured".to_owned()));
        };

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BrainError::Reasoning(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".into());
            return Err(BrainError::Reasoning(format!(
                "backend returned {status}: {body}"
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| BrainError::Reasoning(format!("invalid response body: {e}")))?;

        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();

        Ok(ReasoningResponse {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }
}

/// Budget-gated wrapper around a [`ReasoningBackend`].
#[derive(Clone)]
pub struct ReasoningClient {
    backend: Arc<dyn ReasoningBackend>,
    gate: BudgetGate,
}

impl ReasoningClient {
    /// Wrap a backend behind the default budget gate.
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self {
            backend,
            gate: BudgetGate::default(),
        }
    }

    /// Override the gate. Test hook.
    pub fn with_gate(mut self, gate: BudgetGate) -> Self {
        self.gate = gate;
        self
    }

    /// Run one paid thinking call.
    ///
    /// Returns `None` (and logs) when no credential is configured, the budget
    /// gate rejects, or the backend call errors. On success the actual cost
    /// is recorded and persisted before the text is returned.
    pub async fn think(
        &self,
        prompt: &str,
        budget: &mut BudgetTracker,
        store: &StateStore,
    ) -> Option<String> {
        if !self.backend.has_credential() {
            warn!("no reasoning credential configured, skipping thought");
            return None;
        }

        if !self.gate.check(budget, Utc::now(), store) {
            return None;
        }

        debug!("thinking");
        match self.backend.complete(prompt).await {
            Ok(response) => {
                self.gate.record_cost(budget, response.cost(), store);
                debug!(
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "thought complete"
                );
                Some(response.text)
            }
            Err(e) => {
                warn!(error = %e, "thinking failed");
                None
            }
        }
    }
}
