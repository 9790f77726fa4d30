//! Wire-level tests for the HTTP-facing components, run against wiremock.

use std::sync::Arc;

use vigil::notify::{Dispatcher, NotificationSink, WebhookSink};
use vigil::reasoning::{AnthropicBackend, ReasoningBackend, ReasoningClient};
use vigil::research::{ForumSearchProvider, RedditForumSearch, Source};
use vigil::state::{BudgetTracker, StateStore};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn messages_body(text: &str, input_tokens: u64, output_tokens: u64) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{ "type": "text", "text": text }],
        "model": "claude-sonnet-4-20250514",
        "stop_reason": "end_turn",
        "usage": { "input_tokens": input_tokens, "output_tokens": output_tokens },
    })
}

fn backend_for(server: &MockServer) -> AnthropicBackend {
    AnthropicBackend::new(
        server.uri(),
        Some("sk-test".to_owned()),
        "claude-sonnet-4-20250514".to_owned(),
        1024,
    )
}

#[tokio::test]
async fn anthropic_complete_parses_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages_body("hello", 200, 100)))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let response = backend.complete("say hello").await.expect("completes");
    assert_eq!(response.text, "hello");
    assert_eq!(response.input_tokens, 200);
    assert_eq!(response.output_tokens, 100);
    // 200 input and 100 output tokens under the fixed price table.
    assert!((response.cost() - 0.0021).abs() < 1e-12);
}

#[tokio::test]
async fn anthropic_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let err = backend.complete("anything").await.expect_err("must fail");
    assert!(err.to_string().contains("529"), "got: {err}");
}

#[tokio::test]
async fn anthropic_without_key_never_touches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let backend = AnthropicBackend::new(
        server.uri(),
        None,
        "claude-sonnet-4-20250514".to_owned(),
        1024,
    );
    assert!(!backend.has_credential());
    assert!(backend.complete("anything").await.is_err());
}

#[tokio::test]
async fn think_records_actual_cost_against_the_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages_body("pondered", 200, 100)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let store = StateStore::new(dir.path());
    let mut budget = BudgetTracker {
        limit: 20.0,
        ..Default::default()
    };

    let client = ReasoningClient::new(Arc::new(backend_for(&server)));
    let answer = client.think("ponder", &mut budget, &store).await;
    assert_eq!(answer.as_deref(), Some("pondered"));
    assert!((budget.total_spent - 0.0021).abs() < 1e-12);
    assert_eq!(budget.calls_this_month, 1);

    // The updated tracker is on disk, not just in memory.
    let (_, persisted) = store.load(&[], 20.0).expect("loads");
    assert!((persisted.total_spent - 0.0021).abs() < 1e-12);
}

#[tokio::test]
async fn webhook_accepts_exactly_204() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sink = WebhookSink::new(format!("{}/hook", server.uri())).expect("sink builds");
    sink.post("a finding").await.expect("204 is success");
}

#[tokio::test]
async fn webhook_treats_200_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let sink = WebhookSink::new(format!("{}/hook", server.uri())).expect("sink builds");
    assert!(sink.post("a finding").await.is_err());
}

#[tokio::test]
async fn dispatcher_swallows_webhook_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let sink = WebhookSink::new(format!("{}/hook", server.uri())).expect("sink builds");
    let dispatcher = Dispatcher::new(Arc::new(sink));
    // Must not panic or propagate the failure.
    dispatcher.notify("a finding").await;
}

#[tokio::test]
async fn reddit_search_parses_listing_into_hits() {
    let server = MockServer::start().await;
    let listing = serde_json::json!({
        "kind": "Listing",
        "data": {
            "children": [
                {
                    "kind": "t3",
                    "data": {
                        "title": "Strange loops revisited",
                        "permalink": "/r/consciousness/comments/abc/strange_loops/",
                        "score": 42,
                        "subreddit": "consciousness",
                        "selftext": "A long discussion about self-reference."
                    }
                },
                {
                    "kind": "t3",
                    "data": {
                        "title": "Second post",
                        "permalink": "/r/consciousness/comments/def/second/",
                        "score": 7,
                        "subreddit": "consciousness",
                        "selftext": ""
                    }
                }
            ]
        }
    });
    Mock::given(method("GET"))
        .and(path("/r/consciousness/search.json"))
        .and(query_param("q", "strange loops"))
        .and(query_param("restrict_sr", "true"))
        .and(query_param("limit", "2"))
        .and(query_param("sort", "relevance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing))
        .expect(1)
        .mount(&server)
        .await;

    let forum = RedditForumSearch::new(server.uri()).expect("provider builds");
    let hits = forum
        .search("strange loops", "consciousness", 2)
        .await
        .expect("parses");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].title, "Strange loops revisited");
    assert_eq!(hits[0].source, Source::Forum);
    assert!(hits[0].snippet.starts_with("r/consciousness (42 pts) - "));
    assert!(hits[0]
        .url
        .ends_with("/r/consciousness/comments/abc/strange_loops/"));
}

#[tokio::test]
async fn reddit_error_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let forum = RedditForumSearch::new(server.uri()).expect("provider builds");
    assert!(forum.search("q", "rust", 2).await.is_err());
}
