//! # vigil-search
//!
//! Zero-configuration, embedded web search for vigil.
//!
//! Provides web search by scraping DuckDuckGo's HTML-only endpoint directly,
//! so the research loop needs no search API key and no external service. It
//! compiles into the vigil binary as a library dependency.
//!
//! ## Design
//!
//! - Scrapes `https://html.duckduckgo.com/html/` using CSS selectors; the
//!   endpoint requires no JavaScript and tolerates automated requests
//! - User-Agent rotation for reliability
//! - No network listeners; this is a library, not a server
//! - Search queries are logged only at trace level

pub mod config;
pub mod error;
pub mod http;
pub mod types;

pub use config::SearchConfig;
pub use error::{Result, SearchError};
pub use types::WebResult;

use scraper::{Html, Selector};
use url::Url;

/// Search the web and return up to `config.max_results` results.
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the request fails or the engine answers
/// with a non-success status, [`SearchError::Parse`] if the response HTML
/// cannot be parsed, or [`SearchError::Config`] for an invalid configuration.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> vigil_search::Result<()> {
/// let config = vigil_search::SearchConfig::default();
/// let results = vigil_search::search("rust programming", &config).await?;
/// for result in &results {
///     println!("{}: {}", result.title, result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<WebResult>> {
    config.validate()?;
    tracing::trace!(query, "web search");

    let client = http::build_client(config)?;

    let response = client
        .post("https://html.duckduckgo.com/html/")
        .form(&[("q", query), ("kp", "1")])
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| SearchError::Http(format!("search request failed: {e}")))?
        .error_for_status()
        .map_err(|e| SearchError::Http(format!("search HTTP error: {e}")))?;

    let html = response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("search response read failed: {e}")))?;

    tracing::trace!(bytes = html.len(), "search response received");

    parse_results(&html, config.max_results)
}

/// Parse the engine's HTML response into search results.
///
/// Extracted as a separate function for testability with mock HTML.
pub(crate) fn parse_results(html: &str, max_results: usize) -> Result<Vec<WebResult>> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(
        ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)",
    )
    .map_err(|e| SearchError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse(".result__a")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let snippet_sel = Selector::parse(".result__snippet")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {e:?}")))?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = title_el.text().collect::<String>().trim().to_owned();
        if title.is_empty() {
            continue;
        }

        let Some(href) = title_el.value().attr("href") else {
            continue;
        };
        let Some(url) = unwrap_redirect(href) else {
            continue;
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_owned())
            .unwrap_or_default();

        results.push(WebResult {
            title,
            url,
            snippet,
        });

        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "search results parsed");
    Ok(results)
}

/// Extract the destination URL from the engine's redirect wrapper.
///
/// Result links look like `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`;
/// the real URL is the decoded `uddg` query parameter. Direct links pass
/// through unchanged.
fn unwrap_redirect(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_owned()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}
