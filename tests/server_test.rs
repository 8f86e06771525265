use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::{header, Request, StatusCode};
use hyper::Body;
use tempfile::tempdir;
use tower::ServiceExt;

use webstash::cache::FetchCache;
use webstash::fetch::{FetchPort, FetchedPage};
use webstash::inflight::InFlightRegistry;
use webstash::server::create_server;
use webstash::store::ShardedStore;

struct FixedFetcher {
    page: FetchedPage,
}

#[async_trait]
impl FetchPort for FixedFetcher {
    async fn fetch(&self, _uri: &str) -> webstash::error::Result<FetchedPage> {
        Ok(self.page.clone())
    }
}

fn test_router(root: &std::path::Path, page: FetchedPage) -> axum::Router {
    let cache = Arc::new(FetchCache::new(
        ShardedStore::new(root),
        Arc::new(InFlightRegistry::new()),
        Arc::new(FixedFetcher { page }),
    ));
    create_server(cache)
}

fn google_page() -> FetchedPage {
    FetchedPage {
        status_message: "OK".to_string(),
        content_type: "text/html; charset=ISO-8859-1".to_string(),
        body: "<html><head><title>Google</title></head><body></body></html>".to_string(),
    }
}

async fn get(router: &axum::Router, uri: &str) -> Result<axum::response::Response> {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty())?)
        .await?;
    Ok(response)
}

#[tokio::test]
async fn root_path_answers_usage() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    let response = get(&router, "/").await?;
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unknown_path_is_rejected_as_bad_request() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    // 400, not 404: a 404 would invite the client to try the path again.
    let response = get(&router, "/invalid-path").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn enqueue_answers_json_id() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    let response = get(&router, "/enqueue?uri=http%3A%2F%2Fwww.google.com").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .starts_with("application/json"));

    let body = hyper::body::to_bytes(response.into_body()).await?;
    let parsed: serde_json::Value = serde_json::from_slice(&body)?;
    let id = parsed["id"].as_str().unwrap_or("");
    assert_eq!(id.len(), 64);
    Ok(())
}

#[tokio::test]
async fn enqueue_without_uri_is_bad_request() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    let response = get(&router, "/enqueue").await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn status_of_bogus_id_is_not_found() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    let response = get(&router, "/status?id=bogus").await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn status_eventually_answers_the_cached_html() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    let response = get(&router, "/enqueue?uri=http%3A%2F%2Fwww.google.com").await?;
    let body = hyper::body::to_bytes(response.into_body()).await?;
    let parsed: serde_json::Value = serde_json::from_slice(&body)?;
    let id = parsed["id"].as_str().unwrap().to_string();

    // Poll like a client would: 503 means try again later.
    for _ in 0..500 {
        let response = get(&router, &format!("/status?id={id}")).await?;
        match response.status() {
            StatusCode::SERVICE_UNAVAILABLE => {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            StatusCode::OK => {
                assert_eq!(
                    response
                        .headers()
                        .get(header::CONTENT_TYPE)
                        .and_then(|v| v.to_str().ok()),
                    Some("text/html; charset=utf-8")
                );
                let body = hyper::body::to_bytes(response.into_body()).await?;
                assert_eq!(body.as_ref(), google_page().body.as_bytes());
                return Ok(());
            }
            other => panic!("unexpected status {other}"),
        }
    }
    panic!("entry never became ready");
}

#[tokio::test]
async fn health_reports_service_identity() -> Result<()> {
    let dir = tempdir()?;
    let router = test_router(dir.path(), google_page());

    let response = get(&router, "/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = hyper::body::to_bytes(response.into_body()).await?;
    let parsed: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(parsed["service"], "webstash");
    Ok(())
}
