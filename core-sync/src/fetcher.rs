//! # Rate-Limited Fetcher
//!
//! Retrieves enrichment content one item at a time. Items are never fetched
//! concurrently, and the configured delay is observed after every item whether
//! it succeeded or not, which bounds the request rate seen by the API.
//!
//! A failed item is logged and skipped. It is reported in the summary but not
//! retried within the batch; since only fetched paths reach the ledger, the
//! next run picks it up again.

use crate::render::PendingFetch;
use bridge_traits::{
    http::{HttpClient, HttpRequest},
    storage::Storage,
    BridgeError,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a fetch batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Output paths written
    pub fetched: Vec<String>,
    /// Source URLs that failed
    pub failed: Vec<String>,
}

impl FetchSummary {
    pub fn attempted(&self) -> usize {
        self.fetched.len() + self.failed.len()
    }
}

pub struct RateLimitedFetcher {
    http: Arc<dyn HttpClient>,
    storage: Arc<dyn Storage>,
    delay: Duration,
}

impl RateLimitedFetcher {
    pub fn new(http: Arc<dyn HttpClient>, storage: Arc<dyn Storage>, delay: Duration) -> Self {
        Self {
            http,
            storage,
            delay,
        }
    }

    /// Fetch every item in order, sleeping `delay` after each one.
    pub async fn run(&self, items: &[PendingFetch]) -> FetchSummary {
        let mut summary = FetchSummary::default();
        info!(count = items.len(), delay_ms = self.delay.as_millis() as u64, "Fetching bookmark content");

        for item in items {
            match self.fetch_one(item).await {
                Ok(size) => {
                    debug!(url = %item.source_url, path = %item.output_path, size, "Fetched bookmark content");
                    summary.fetched.push(item.output_path.clone());
                }
                Err(e) => {
                    warn!(url = %item.source_url, error = %e, "Fetch failed, will retry next run");
                    summary.failed.push(item.source_url.clone());
                }
            }

            tokio::time::sleep(self.delay).await;
        }

        info!(
            fetched = summary.fetched.len(),
            failed = summary.failed.len(),
            "Finished fetching bookmark content"
        );
        summary
    }

    async fn fetch_one(&self, item: &PendingFetch) -> Result<usize, BridgeError> {
        let response = self
            .http
            .execute(HttpRequest::get(&item.source_url))
            .await?
            .error_for_status(&item.source_url)?;

        let size = response.body.len();
        self.storage
            .write_file(Path::new(&item.output_path), response.body)
            .await?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{HttpResponse, MemoryStorage};
    use bytes::Bytes;
    use mockall::{mock, predicate::*, Sequence};
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &'static str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body),
        }
    }

    fn item(url: &str, path: &str) -> PendingFetch {
        PendingFetch {
            source_url: url.to_string(),
            output_path: path.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_fetch_with_delay_after_each_item() {
        let mut http = MockHttpClient::new();
        let mut seq = Sequence::new();
        http.expect_execute()
            .withf(|req| req.url == "api/http://a.test")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, "# A")));
        http.expect_execute()
            .withf(|req| req.url == "api/http://b.test")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(500, "oops")));
        http.expect_execute()
            .withf(|req| req.url == "api/http://c.test")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BridgeError::OperationFailed("connection reset".to_string())));

        let storage = Arc::new(MemoryStorage::new());
        let fetcher = RateLimitedFetcher::new(
            Arc::new(http),
            storage.clone(),
            Duration::from_millis(900),
        );

        let started = tokio::time::Instant::now();
        let summary = fetcher
            .run(&[
                item("api/http://a.test", "notes/A.md"),
                item("api/http://b.test", "notes/B.md"),
                item("api/http://c.test", "notes/C.md"),
            ])
            .await;

        assert_eq!(summary.fetched, vec!["notes/A.md".to_string()]);
        assert_eq!(
            summary.failed,
            vec!["api/http://b.test".to_string(), "api/http://c.test".to_string()]
        );
        assert_eq!(summary.attempted(), 3);
        assert_eq!(storage.contents("notes/A.md").as_deref(), Some("# A"));
        assert!(storage.contents("notes/B.md").is_none());
        assert!(started.elapsed() >= Duration::from_millis(2700));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_requests() {
        let mut http = MockHttpClient::new();
        http.expect_execute().never();

        let fetcher = RateLimitedFetcher::new(
            Arc::new(http),
            Arc::new(MemoryStorage::new()),
            Duration::from_millis(10),
        );

        let summary = fetcher.run(&[]).await;
        assert_eq!(summary, FetchSummary::default());
    }

    #[tokio::test]
    async fn test_success_overwrites_existing_file() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .with(eq(HttpRequest::get("api/x")))
            .returning(|_| Ok(response(200, "new")));

        let storage = Arc::new(MemoryStorage::new());
        storage.insert("X.md", "old");
        let fetcher = RateLimitedFetcher::new(Arc::new(http), storage.clone(), Duration::ZERO);

        fetcher.run(&[item("api/x", "X.md")]).await;
        assert_eq!(storage.contents("X.md").as_deref(), Some("new"));
    }
}
