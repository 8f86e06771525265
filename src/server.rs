use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Query,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use crate::cache::{FetchCache, Status};

/// Root path answers with a short API summary rather than an error.
async fn usage() -> impl IntoResponse {
    "get /enqueue?uri=encodedUri => {id: aString}\n\
     get /status?id=anIdString => content at encodedUri, OR 503 status\n"
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "webstash",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Deserialize)]
struct EnqueueParams {
    uri: String,
}

/// Always answers `{"id": key}` immediately, whatever the fetch later does.
async fn enqueue(
    Extension(cache): Extension<Arc<FetchCache>>,
    Query(params): Query<EnqueueParams>,
) -> impl IntoResponse {
    info!(uri = %params.uri, "enqueue");
    let id = cache.enqueue(&params.uri);
    Json(serde_json::json!({ "id": id }))
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    id: String,
}

async fn status(
    Extension(cache): Extension<Arc<FetchCache>>,
    Query(params): Query<StatusParams>,
) -> Response {
    debug!(id = %params.id, "status");
    match cache.status(&params.id).await {
        // "Try again later", not an error.
        Status::InFlight => (StatusCode::SERVICE_UNAVAILABLE, "Not ready.").into_response(),
        Status::Found(bytes) => (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            bytes,
        )
            .into_response(),
        Status::NotFound => (StatusCode::NOT_FOUND, "No such id.").into_response(),
    }
}

/// Unknown paths are a client mistake, not a missing resource: 400, so the
/// caller is not invited to retry the same path.
async fn bad_request() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "Bad request.")
}

/// Create the HTTP server with all routes
pub fn create_server(cache: Arc<FetchCache>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(usage))
        .route("/health", get(health))
        .route("/enqueue", get(enqueue))
        .route("/status", get(status))
        .fallback(bad_request)
        .layer(Extension(cache))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified host and port
pub async fn start_server(
    cache: Arc<FetchCache>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_server(cache);

    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    println!("🚀 webstash listening on http://{addr}");
    println!("💚 Health check: http://{addr}/health");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
