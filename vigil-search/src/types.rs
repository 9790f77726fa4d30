//! Result type returned from a web search.

use serde::{Deserialize, Serialize};

/// A single result scraped from the search engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResult {
    /// The title of the result page.
    pub title: String,
    /// The URL of the result.
    pub url: String,
    /// A text snippet summarising the page content.
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_result_serde_round_trip() {
        let result = WebResult {
            title: "Example".into(),
            url: "https://example.com".into(),
            snippet: "An example page".into(),
        };
        let json = serde_json::to_string(&result).expect("serialize");
        let decoded: WebResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded.title, "Example");
        assert_eq!(decoded.url, "https://example.com");
    }
}
