//! Analyzer: summarizes gathered results against the topic.
//!
//! A response containing the `NOT_INTERESTING` sentinel anywhere is a
//! negative verdict. The caller skips analysis entirely when no results
//! were gathered.

use crate::reasoning::ReasoningClient;
use crate::research::SearchHit;
use crate::state::{BudgetTracker, StateStore};

/// Sentinel the prompt asks the backend to emit for a negative verdict.
pub const NOT_INTERESTING: &str = "NOT_INTERESTING";

/// Summarizes research results through the reasoning client.
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    /// Ask for a short verdict on the gathered results.
    ///
    /// Returns `None` when the backend yields nothing; the presence of the
    /// sentinel in a returned summary is checked with [`is_not_interesting`].
    pub async fn analyze(
        &self,
        client: &ReasoningClient,
        topic: &str,
        hits: &[SearchHit],
        budget: &mut BudgetTracker,
        store: &StateStore,
    ) -> Option<String> {
        let prompt = self.build_prompt(topic, hits);
        client.think(&prompt, budget, store).await
    }

    /// Assemble the analysis prompt from topic and tagged results.
    pub fn build_prompt(&self, topic: &str, hits: &[SearchHit]) -> String {
        let results = serde_json::to_string_pretty(hits).unwrap_or_else(|_| "[]".to_owned());

        format!(
            "You researched: {topic}\n\n\
             Search results (web and forum, tagged by source):\n{results}\n\n\
             Analyze these results:\n\
             1. Are they relevant to the topic?\n\
             2. What are the key findings across both sources?\n\
             3. Is this worth a notification?\n\n\
             Provide a concise summary (2-3 sentences) of the most important \
             findings. If not interesting, say \"{NOT_INTERESTING}\"."
        )
    }
}

/// Whether a summary carries the negative-verdict sentinel.
pub fn is_not_interesting(summary: &str) -> bool {
    summary.contains(NOT_INTERESTING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::Source;

    fn hit(title: &str) -> SearchHit {
        SearchHit {
            title: title.to_owned(),
            url: "https://example.com".to_owned(),
            snippet: "snippet".to_owned(),
            source: Source::Web,
        }
    }

    #[test]
    fn sentinel_detected_anywhere() {
        assert!(is_not_interesting("NOT_INTERESTING"));
        assert!(is_not_interesting(
            "Summary first. On reflection: NOT_INTERESTING, nothing new here."
        ));
        assert!(!is_not_interesting("genuinely interesting findings"));
    }

    #[test]
    fn prompt_embeds_topic_and_results() {
        let prompt = Analyzer.build_prompt("quantum dots", &[hit("paper one"), hit("paper two")]);
        assert!(prompt.contains("quantum dots"));
        assert!(prompt.contains("paper one"));
        assert!(prompt.contains("paper two"));
        assert!(prompt.contains(NOT_INTERESTING));
    }
}
