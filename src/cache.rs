use std::sync::Arc;

use tracing::{error, info, warn};

use crate::fetch::{FetchPort, FetchedPage};
use crate::inflight::InFlightRegistry;
use crate::key;
use crate::store::ShardedStore;

/// Answer to a status query for one key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// A fetch is outstanding; ask again later.
    InFlight,
    /// The entry is cached; these are its bytes.
    Found(Vec<u8>),
    /// Never completed: not enqueued yet, or the last attempt failed.
    NotFound,
}

/// Coalescing fetch cache: at most one outstanding fetch per key, results
/// persisted write-once in the sharded store.
#[derive(Clone)]
pub struct FetchCache {
    store: ShardedStore,
    inflight: Arc<InFlightRegistry>,
    fetcher: Arc<dyn FetchPort>,
}

impl FetchCache {
    pub fn new(
        store: ShardedStore,
        inflight: Arc<InFlightRegistry>,
        fetcher: Arc<dyn FetchPort>,
    ) -> Self {
        Self {
            store,
            inflight,
            fetcher,
        }
    }

    /// Accepts a URI for caching and returns its key without waiting on any
    /// I/O. The background fetch starts only when the key has no other
    /// owner; repeat calls while one is outstanding change nothing.
    pub fn enqueue(&self, uri: &str) -> String {
        let key = key::derive(uri);
        // The marker must be in place before the async store probe starts,
        // and check-and-insert is a single atomic step in the registry.
        if !self.inflight.try_acquire(&key, uri) {
            return key;
        }
        let cache = self.clone();
        let task_uri = uri.to_string();
        let task_key = key.clone();
        tokio::spawn(async move {
            cache.fetch_and_store(&task_key, &task_uri).await;
            // Released on every path, or a failed fetch would wedge the key
            // until restart.
            cache.inflight.release(&task_key);
        });
        key
    }

    async fn fetch_and_store(&self, key: &str, uri: &str) {
        if self.store.exists(key).await {
            // Cached by an earlier run; nothing to fetch.
            return;
        }
        let page = match self.fetcher.fetch(uri).await {
            Ok(page) => page,
            Err(e) => {
                // No entry is written: the key stays absent and the next
                // enqueue of this URI starts a fresh attempt.
                warn!(%uri, error = %e, "fetch failed");
                return;
            }
        };
        let body = normalize(page);
        match self.store.write(key, body.as_bytes()).await {
            Ok(()) => info!(%uri, key, len = body.len(), "cached"),
            Err(e) => error!(%uri, key, error = %e, "store write failed"),
        }
    }

    /// Non-blocking status query. An in-flight marker wins over the store,
    /// so a key whose write is finalizing still reads as in-flight. Store
    /// read errors collapse to `NotFound`.
    pub async fn status(&self, key: &str) -> Status {
        if self.inflight.is_in_flight(key) {
            return Status::InFlight;
        }
        match self.store.read(key).await {
            Ok(Some(bytes)) => Status::Found(bytes),
            Ok(None) => Status::NotFound,
            Err(e) => {
                warn!(key, error = %e, "store read failed");
                Status::NotFound
            }
        }
    }
}

fn htmlize(message: &str) -> String {
    format!("<html><body>{message}</body></html>")
}

/// The cache stores HTML and nothing else. A response that does not declare
/// `text/html` (parameters ignored) is replaced by a stub document; an empty
/// body that nominally succeeded keeps the origin's status message.
fn normalize(page: FetchedPage) -> String {
    let base_type = page.content_type.split(';').next().unwrap_or("").trim();
    if base_type != "text/html" {
        return htmlize("Not HTML!");
    }
    if page.body.is_empty() {
        return htmlize(&page.status_message);
    }
    page.body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(content_type: &str, body: &str) -> FetchedPage {
        FetchedPage {
            status_message: "OK".to_string(),
            content_type: content_type.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn html_body_passes_through() {
        let body = "<html><head><title>t</title></head><body>x</body></html>";
        assert_eq!(normalize(page("text/html; charset=utf-8", body)), body);
        assert_eq!(normalize(page("text/html", body)), body);
    }

    #[test]
    fn non_html_is_replaced_by_stub() {
        assert_eq!(
            normalize(page("application/json", "{\"a\":1}")),
            "<html><body>Not HTML!</body></html>"
        );
        // A missing header arrives as the fetcher's octet-stream default.
        assert_eq!(
            normalize(page("application/octet-stream", "raw")),
            "<html><body>Not HTML!</body></html>"
        );
    }

    #[test]
    fn empty_html_body_keeps_status_message() {
        let mut p = page("text/html", "");
        p.status_message = "No Content".to_string();
        assert_eq!(normalize(p), "<html><body>No Content</body></html>");
    }
}
