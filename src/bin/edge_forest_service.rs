//! Edge Forest Service Binary
//!
//! Runs the edge forest as a REST API service:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `STORE_BACKEND`: "postgres" (default) or "memory"
//! - `DATABASE_URL`: PostgreSQL connection string (postgres backend)
//! - `EDGE_MAX_CYCLE_DEPTH`: Cycle check budget (default: 50)
//! - `EDGE_DEFAULT_TREE_DEPTH`: Default subtree budget (default: 99)
//! - `EDGE_MAX_TREE_DEPTH`: Largest subtree budget a caller may request (default: 500)
//! - `PORT`: Service port (default: 8080)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://... cargo run --bin edge_forest_service --features service
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use edge_forest::service::{create_router, ServiceState};
use edge_forest::store::{EdgeStore, InMemoryEdgeStore, PostgresEdgeStore};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "edge_forest=info,edge_forest_service=info,tower_http=info,sqlx=warn".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

/// Request logging middleware that adds correlation ID and timing
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let trace_id = request
        .headers()
        .get("X-Request-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "edge_forest_service::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

async fn serve<S: EdgeStore>(
    state: ServiceState<S>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = *state.editor.config();
    info!(
        backend = state.backend,
        max_cycle_depth = config.max_cycle_depth.get(),
        default_tree_depth = config.default_tree_depth.get(),
        max_tree_depth = config.max_tree_depth.get(),
        "Edit service configured"
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    info!(address = %addr, "Edge Forest Service listening");
    let listener = TcpListener::bind(addr).await?;

    info!("Ready to accept connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting Edge Forest Service"
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".to_string());
    match backend.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory store; edges are lost on shutdown");
            serve(ServiceState::from_env(InMemoryEdgeStore::new(), "memory"), addr).await?;
        }
        "postgres" => {
            info!("Connecting to PostgreSQL...");
            let connect_start = Instant::now();

            let store = match tokio::time::timeout(
                Duration::from_secs(30),
                PostgresEdgeStore::from_env(),
            ).await {
                Ok(Ok(store)) => store,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Failed to connect to PostgreSQL");
                    return Err(e.into());
                }
                Err(_) => {
                    tracing::error!("PostgreSQL connection timeout after 30s");
                    return Err("Database connection timeout".into());
                }
            };
            store.ensure_schema().await?;

            info!(
                latency_ms = connect_start.elapsed().as_millis() as u64,
                pool_size = store.pool_stats().size,
                "PostgreSQL connection established"
            );

            serve(ServiceState::from_env(store, "postgres"), addr).await?;
        }
        other => {
            tracing::error!(backend = other, "Unknown STORE_BACKEND");
            return Err(format!("unknown STORE_BACKEND: {other}").into());
        }
    }

    info!("Edge Forest Service shutdown complete");
    Ok(())
}
