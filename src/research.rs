//! Research aggregation: two independent, failure-isolated lookups.
//!
//! One generic web lookup (embedded vigil-search) and one forum lookup over
//! a bounded set of subreddits, queried through injected provider traits and
//! merged with a source tag. A provider failing yields an empty list for
//! that provider and a warning; it never aborts the other lookup or the
//! cycle.

use crate::error::{BrainError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How many configured forum channels are queried per cycle.
const FORUM_CHANNELS_PER_CYCLE: usize = 3;

/// Result cap per forum channel.
const RESULTS_PER_CHANNEL: usize = 2;

/// Which provider a merged result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Generic web search.
    Web,
    /// Forum/community search.
    Forum,
}

/// One tagged result from either lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Result page title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Snippet of the page or post content.
    pub snippet: String,
    /// Which provider returned this hit.
    pub source: Source,
}

/// Generic web search capability.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Search the web, returning at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Forum search capability, scoped to one channel per call.
#[async_trait]
pub trait ForumSearchProvider: Send + Sync {
    /// Search one channel, returning at most `limit` hits.
    async fn search(&self, query: &str, channel: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Web provider backed by the embedded vigil-search crate.
pub struct EmbeddedWebSearch;

#[async_trait]
impl WebSearchProvider for EmbeddedWebSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let config = vigil_search::SearchConfig {
            max_results: limit,
            ..Default::default()
        };
        let results = vigil_search::search(query, &config)
            .await
            .map_err(|e| BrainError::Research(format!("web search failed: {e}")))?;

        Ok(results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.url,
                snippet: r.snippet,
                source: Source::Web,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RedditListing {
    data: RedditListingData,
}

#[derive(Debug, Deserialize)]
struct RedditListingData {
    #[serde(default)]
    children: Vec<RedditChild>,
}

#[derive(Debug, Deserialize)]
struct RedditChild {
    data: RedditPost,
}

#[derive(Debug, Deserialize)]
struct RedditPost {
    #[serde(default)]
    title: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    selftext: String,
}

/// Forum provider using Reddit's public JSON search endpoints. No API key.
pub struct RedditForumSearch {
    base_url: String,
    client: reqwest::Client,
}

impl RedditForumSearch {
    /// Provider against the public reddit.com endpoints.
    pub fn public() -> Result<Self> {
        Self::new("https://www.reddit.com".to_owned())
    }

    /// Create a provider against the given base URL (the test seam).
    pub fn new(base_url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("vigil-research/0.3 (autonomous research daemon)")
            .build()
            .map_err(|e| BrainError::Research(format!("cannot build forum client: {e}")))?;
        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl ForumSearchProvider for RedditForumSearch {
    async fn search(&self, query: &str, channel: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/r/{channel}/search.json",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("restrict_sr", "true"),
                ("limit", &limit.to_string()),
                ("sort", "relevance"),
            ])
            .send()
            .await
            .map_err(|e| BrainError::Research(format!("forum request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(BrainError::Research(format!(
                "forum search returned {}",
                response.status()
            )));
        }

        let listing: RedditListing = response
            .json()
            .await
            .map_err(|e| BrainError::Research(format!("invalid forum response: {e}")))?;

        let hits = listing
            .data
            .children
            .into_iter()
            .take(limit)
            .map(|child| {
                let post = child.data;
                SearchHit {
                    title: post.title,
                    url: format!("{}{}", self.base_url.trim_end_matches('/'), post.permalink),
                    snippet: format!(
                        "r/{} ({} pts) - {}",
                        post.subreddit,
                        post.score,
                        truncate_chars(&post.selftext, 200)
                    ),
                    source: Source::Forum,
                }
            })
            .collect();

        Ok(hits)
    }
}

/// Char-boundary-safe prefix of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Runs both lookups and merges tagged results.
pub struct ResearchAggregator {
    web: Arc<dyn WebSearchProvider>,
    forum: Arc<dyn ForumSearchProvider>,
    channels: Vec<String>,
    max_results: usize,
}

impl ResearchAggregator {
    /// Create an aggregator over the two providers.
    pub fn new(
        web: Arc<dyn WebSearchProvider>,
        forum: Arc<dyn ForumSearchProvider>,
        channels: Vec<String>,
        max_results: usize,
    ) -> Self {
        Self {
            web,
            forum,
            channels,
            max_results,
        }
    }

    /// Gather results for one query.
    ///
    /// The web lookup is capped at `max_results`; the forum lookup queries
    /// the first three configured channels at two results each, then
    /// truncates its merged list to `max_results`. The two lists are
    /// concatenated, web first. Either side failing contributes an empty
    /// list; this method itself never fails.
    pub async fn gather(&self, query: &str) -> Vec<SearchHit> {
        let web_hits = match self.web.search(query, self.max_results).await {
            Ok(hits) => {
                debug!(count = hits.len(), "web lookup returned");
                hits
            }
            Err(e) => {
                warn!(error = %e, "web lookup failed, continuing without it");
                Vec::new()
            }
        };

        let mut forum_hits = Vec::new();
        for channel in self.channels.iter().take(FORUM_CHANNELS_PER_CYCLE) {
            match self.forum.search(query, channel, RESULTS_PER_CHANNEL).await {
                Ok(hits) => forum_hits.extend(hits),
                Err(e) => {
                    warn!(channel = %channel, error = %e, "forum lookup failed, skipping channel");
                }
            }
        }
        forum_hits.truncate(self.max_results);
        debug!(count = forum_hits.len(), "forum lookup returned");

        let mut merged = web_hits;
        merged.extend(forum_hits);
        merged
    }
}

/// Per-source counts for notification text.
pub fn source_counts(hits: &[SearchHit]) -> (usize, usize) {
    let web = hits.iter().filter(|h| h.source == Source::Web).count();
    (web, hits.len() - web)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Mutex;

    struct FakeWeb {
        hits: usize,
        fail: bool,
    }

    #[async_trait]
    impl WebSearchProvider for FakeWeb {
        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>> {
            if self.fail {
                return Err(BrainError::Research("web down".to_owned()));
            }
            Ok((0..self.hits.min(limit))
                .map(|i| SearchHit {
                    title: format!("web-{i}"),
                    url: format!("https://example.com/{i}"),
                    snippet: String::new(),
                    source: Source::Web,
                })
                .collect())
        }
    }

    struct FakeForum {
        queried: Mutex<Vec<String>>,
        per_channel: usize,
        fail: bool,
    }

    impl FakeForum {
        fn new(per_channel: usize, fail: bool) -> Self {
            Self {
                queried: Mutex::new(Vec::new()),
                per_channel,
                fail,
            }
        }
    }

    #[async_trait]
    impl ForumSearchProvider for FakeForum {
        async fn search(&self, _query: &str, channel: &str, limit: usize) -> Result<Vec<SearchHit>> {
            self.queried.lock().unwrap().push(channel.to_owned());
            if self.fail {
                return Err(BrainError::Research("forum down".to_owned()));
            }
            Ok((0..self.per_channel.min(limit))
                .map(|i| SearchHit {
                    title: format!("{channel}-{i}"),
                    url: format!("https://forum.example/{channel}/{i}"),
                    snippet: String::new(),
                    source: Source::Forum,
                })
                .collect())
        }
    }

    fn channels() -> Vec<String> {
        ["alpha", "beta", "gamma", "delta", "epsilon"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect()
    }

    #[tokio::test]
    async fn merges_web_then_forum_with_tags() {
        let forum = Arc::new(FakeForum::new(2, false));
        let agg = ResearchAggregator::new(
            Arc::new(FakeWeb {
                hits: 3,
                fail: false,
            }),
            Arc::clone(&forum) as Arc<dyn ForumSearchProvider>,
            channels(),
            5,
        );

        let hits = agg.gather("query").await;
        assert_eq!(hits.len(), 8); // 3 web + 3 channels * 2
        assert!(hits[..3].iter().all(|h| h.source == Source::Web));
        assert!(hits[3..].iter().all(|h| h.source == Source::Forum));
        assert_eq!(source_counts(&hits), (3, 5));
    }

    #[tokio::test]
    async fn queries_only_first_three_channels() {
        let forum = Arc::new(FakeForum::new(1, false));
        let agg = ResearchAggregator::new(
            Arc::new(FakeWeb {
                hits: 0,
                fail: false,
            }),
            Arc::clone(&forum) as Arc<dyn ForumSearchProvider>,
            channels(),
            5,
        );

        agg.gather("query").await;
        let queried = forum.queried.lock().unwrap().clone();
        assert_eq!(queried, vec!["alpha", "beta", "gamma"]);
    }

    #[tokio::test]
    async fn web_failure_is_isolated_from_forum() {
        let forum = Arc::new(FakeForum::new(2, false));
        let agg = ResearchAggregator::new(
            Arc::new(FakeWeb {
                hits: 0,
                fail: true,
            }),
            Arc::clone(&forum) as Arc<dyn ForumSearchProvider>,
            channels(),
            5,
        );

        let hits = agg.gather("query").await;
        assert_eq!(hits.len(), 5); // 6 forum hits truncated to max_results
        assert!(hits.iter().all(|h| h.source == Source::Forum));
    }

    #[tokio::test]
    async fn forum_failure_is_isolated_from_web() {
        let agg = ResearchAggregator::new(
            Arc::new(FakeWeb {
                hits: 4,
                fail: false,
            }),
            Arc::new(FakeForum::new(0, true)),
            channels(),
            5,
        );

        let hits = agg.gather("query").await;
        assert_eq!(hits.len(), 4);
        assert!(hits.iter().all(|h| h.source == Source::Web));
    }

    #[tokio::test]
    async fn both_failing_yields_empty_not_error() {
        let agg = ResearchAggregator::new(
            Arc::new(FakeWeb {
                hits: 0,
                fail: true,
            }),
            Arc::new(FakeForum::new(0, true)),
            channels(),
            5,
        );
        assert!(agg.gather("query").await.is_empty());
    }

    #[test]
    fn truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 200), "short");
    }

    #[test]
    fn reddit_listing_parses() {
        let raw = r#"{
            "data": {
                "children": [
                    {"data": {"title": "A post", "subreddit": "alpha", "score": 42,
                              "permalink": "/r/alpha/comments/1/a_post/", "selftext": "body text"}}
                ]
            }
        }"#;
        let listing: RedditListing = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.data.children.len(), 1);
        assert_eq!(listing.data.children[0].data.title, "A post");
        assert_eq!(listing.data.children[0].data.score, 42);
    }
}
