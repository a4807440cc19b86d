//! HTTP server with a streaming fetch endpoint.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/fetch` | Run the pipeline, streaming progress over SSE |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /fetch` takes a JSON body with `query`, `output` (the extraction
//! schema), and an optional `max_answers`. The response is a Server-Sent
//! Events stream of `log` events followed by exactly one `result` event; the
//! connection closes after the result. A client that disconnects early does
//! not abort the run, it just stops receiving events.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};

use crate::config::{Config, Credentials};
use crate::models::FetchRequest;
use crate::pipeline::Pipeline;

/// Shared application state passed to route handlers via Axum's `State`
/// extractor.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Starts the HTTP server.
///
/// Builds the production pipeline from `config` and `credentials`, binds to
/// the address configured in `[server].bind`, and serves until the process
/// is terminated.
pub async fn run_server(config: &Config, credentials: &Credentials) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config, credentials)?;
    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/fetch", post(handle_fetch))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    println!("websift server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"healthy"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handler for `POST /fetch`.
///
/// Spawns the pipeline run and streams its events back as SSE. The spawned
/// task owns the request data and runs to completion regardless of whether
/// the client is still listening.
async fn handle_fetch(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(64);
    let pipeline = state.pipeline.clone();

    tokio::spawn(async move {
        pipeline
            .run(&request.query, &request.output, request.max_answers, &tx)
            .await;
    });

    let stream = ReceiverStream::new(rx)
        .filter_map(|event| Event::default().json_data(&event).ok().map(Ok::<_, Infallible>));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
