//! Web search via the Brave Search API.
//!
//! Results are flattened into a short markdown digest for the model. Missing
//! credentials and upstream failures produce fallback text instead of errors.

use std::time::Duration;

use askmycar_config::SearchConfig;
use serde::Deserialize;
use tracing::{debug, warn};

pub struct WebSearch {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
}

impl WebSearch {
    pub fn new(config: &SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            max_results: config.max_results,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Run `query` and format the top results. Never fails.
    pub async fn search(&self, query: &str) -> String {
        let Some(key) = self.api_key.as_deref() else {
            return format!("Web search unavailable. I'll answer based on my training knowledge about: {query}");
        };

        match self.fetch_results(key, query).await {
            Ok(results) if results.is_empty() => "No results found.".to_string(),
            Ok(results) => {
                debug!(count = results.len(), "Web search returned results");
                results
                    .iter()
                    .take(self.max_results)
                    .map(SearchHit::to_markdown)
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
            Err(e) => {
                warn!(error = %e, "Web search failed");
                format!("Search failed. Answering from training knowledge about: {query}")
            }
        }
    }

    async fn fetch_results(&self, key: &str, query: &str) -> Result<Vec<SearchHit>, reqwest::Error> {
        let url = format!("{}/res/v1/web/search", self.base_url);
        let body: SearchResponse = self
            .client
            .get(&url)
            .header("X-Subscription-Token", key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", "5"), ("freshness", "py")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body.web.map(|w| w.results).unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

impl SearchHit {
    fn to_markdown(&self) -> String {
        format!("**{}**\n{}\nSource: {}", self.title, self.description, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::{Json, Router, routing::get};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn config(base_url: String, key: Option<&str>) -> SearchConfig {
        SearchConfig {
            api_key: key.map(String::from),
            base_url,
            timeout_secs: 2,
            max_results: 4,
        }
    }

    fn hit(n: usize) -> serde_json::Value {
        serde_json::json!({
            "title": format!("Result {n}"),
            "url": format!("https://example.com/{n}"),
            "description": format!("Description {n}"),
        })
    }

    #[tokio::test]
    async fn no_key_returns_unavailable() {
        let search = WebSearch::new(&config("http://127.0.0.1:1".into(), None));
        assert_eq!(
            search.search("2019 Toyota Camry recalls").await,
            "Web search unavailable. I'll answer based on my training knowledge about: 2019 Toyota Camry recalls"
        );
    }

    #[tokio::test]
    async fn formats_at_most_four_results() {
        let app = Router::new().route(
            "/res/v1/web/search",
            get(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(headers["x-subscription-token"], "brave-key");
                assert_eq!(headers["accept"], "application/json");
                assert_eq!(q["q"], "2019 Toyota Camry recalls");
                assert_eq!(q["count"], "5");
                assert_eq!(q["freshness"], "py");
                Json(serde_json::json!({"web": {"results": (1..=5).map(hit).collect::<Vec<_>>()}}))
            }),
        );
        let search = WebSearch::new(&config(serve(app).await, Some("brave-key")));

        let text = search.search("2019 Toyota Camry recalls").await;
        let entries: Vec<&str> = text.split("\n\n").collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], "**Result 1**\nDescription 1\nSource: https://example.com/1");
        assert!(!text.contains("Result 5"));
    }

    #[tokio::test]
    async fn empty_results() {
        let app = Router::new().route("/res/v1/web/search", get(|| async { Json(serde_json::json!({})) }));
        let search = WebSearch::new(&config(serve(app).await, Some("brave-key")));
        assert_eq!(search.search("anything").await, "No results found.");
    }

    #[tokio::test]
    async fn upstream_error_falls_back() {
        let app = Router::new().route("/res/v1/web/search", get(|| async { StatusCode::TOO_MANY_REQUESTS }));
        let search = WebSearch::new(&config(serve(app).await, Some("brave-key")));
        assert_eq!(
            search.search("camry tsb").await,
            "Search failed. Answering from training knowledge about: camry tsb"
        );
    }

    #[tokio::test]
    async fn unreachable_host_falls_back() {
        let search = WebSearch::new(&config("http://127.0.0.1:1".into(), Some("brave-key")));
        assert!(search.search("camry tsb").await.starts_with("Search failed."));
    }

    #[tokio::test]
    async fn slow_upstream_times_out_to_fallback() {
        let app = Router::new().route(
            "/res/v1/web/search",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Json(serde_json::json!({"web": {"results": [hit(1)]}}))
            }),
        );
        let mut config = config(serve(app).await, Some("brave-key"));
        config.timeout_secs = 1;
        let search = WebSearch::new(&config);

        let started = std::time::Instant::now();
        assert_eq!(
            search.search("camry recalls").await,
            "Search failed. Answering from training knowledge about: camry recalls"
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }
}
