//! Decision engine: asks the backend whether to research, and what.
//!
//! The backend is not required to answer in pure JSON; the parser takes the
//! first balanced JSON object found anywhere in the free-text response and
//! decodes it strictly. Parse failure is a tagged error, and the caller
//! treats it the same as a decision not to research.

use crate::reasoning::ReasoningClient;
use crate::state::{BrainMemory, BudgetTracker, StateStore};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

/// The structured outcome of one decision prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchDecision {
    /// Whether this cycle should run a research pass.
    pub should_research: bool,
    /// The topic to research, when deciding yes.
    #[serde(default)]
    pub topic: Option<String>,
    /// Why the decision was made.
    #[serde(default)]
    pub reasoning: String,
    /// Preferred search query; falls back to the topic when absent.
    #[serde(default)]
    pub search_query: Option<String>,
}

impl ResearchDecision {
    /// The query to hand to the search providers: the explicit search query
    /// when present, otherwise the topic.
    pub fn effective_query(&self) -> Option<&str> {
        self.search_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or(self.topic.as_deref())
    }
}

/// Why a decision response could not be turned into a [`ResearchDecision`].
#[derive(Debug, thiserror::Error)]
pub enum DecisionParseError {
    /// The response contained no balanced JSON object.
    #[error("no JSON object found in response")]
    NoObject,
    /// An object was found but did not decode into a decision.
    #[error("decision object did not decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Builds decision prompts and decodes their answers.
pub struct DecisionEngine {
    /// How many recent history entries appear in the prompt.
    recent_history: usize,
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self { recent_history: 3 }
    }
}

impl DecisionEngine {
    /// Ask the backend for a research decision.
    ///
    /// Returns `None` when the backend yields nothing (credential, budget, or
    /// transport) or when the response does not parse; the caller must treat
    /// both identically to "decided not to research".
    pub async fn decide(
        &self,
        client: &ReasoningClient,
        memory: &BrainMemory,
        budget: &mut BudgetTracker,
        store: &StateStore,
    ) -> Option<ResearchDecision> {
        let prompt = self.build_prompt(memory, Utc::now());
        let response = client.think(&prompt, budget, store).await?;

        match parse_decision(&response) {
            Ok(decision) => {
                debug!(
                    should_research = decision.should_research,
                    topic = decision.topic.as_deref().unwrap_or("-"),
                    "decision parsed"
                );
                Some(decision)
            }
            Err(e) => {
                warn!(error = %e, "cannot parse decision, treating as skip");
                None
            }
        }
    }

    /// Assemble the decision prompt from interests and recent history.
    pub fn build_prompt(&self, memory: &BrainMemory, now: DateTime<Utc>) -> String {
        let interests = memory
            .interests
            .iter()
            .map(|interest| format!("- {interest}"))
            .collect::<Vec<_>>()
            .join("\n");

        let recent: Vec<String> = memory
            .research_history
            .iter()
            .rev()
            .take(self.recent_history)
            .map(|entry| format!("- [{}] {}: {}", entry.timestamp, entry.topic, entry.summary))
            .collect();
        let recent = if recent.is_empty() {
            "None yet".to_owned()
        } else {
            recent.join("\n")
        };

        format!(
            "You are an autonomous research agent.\n\n\
             Your current interests:\n{interests}\n\n\
             Recent research:\n{recent}\n\n\
             Current time: {}\n\n\
             Decide: should you research something now? If yes, what topic?\n\
             Avoid repeating recent research. Only research if it matters, \
             not just to think.\n\n\
             Respond with a JSON object:\n\
             {{\n\
             \x20   \"should_research\": true or false,\n\
             \x20   \"topic\": \"specific research topic\" or null,\n\
             \x20   \"reasoning\": \"why this matters\",\n\
             \x20   \"search_query\": \"optimal search query\" or null\n\
             }}",
            now.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Decode the first balanced JSON object in `text` as a [`ResearchDecision`].
pub fn parse_decision(text: &str) -> Result<ResearchDecision, DecisionParseError> {
    let object = extract_first_object(text).ok_or(DecisionParseError::NoObject)?;
    Ok(serde_json::from_str(object)?)
}

/// Find the first balanced `{...}` span in `text`.
///
/// Brace depth is tracked with string-literal and escape awareness, so braces
/// inside JSON strings do not confuse the scan.
fn extract_first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}
