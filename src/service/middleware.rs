//! Service middleware and metric events.
//!
//! ## Metrics Exposed
//!
//! - `request` - path, method, status and latency of every request
//! - `tree` - node count, depth and latency of every subtree fetch
//! - `mutation` - operation and outcome code of every create/delete
//!
//! All metrics are emitted as structured tracing events under the
//! `edge_forest::metrics` target and can be aggregated from logs.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "edge_forest::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Replaces numeric node ids with a `:id` placeholder.
fn normalize_path(path: &str) -> String {
    static NODE_ID: OnceLock<regex_lite::Regex> = OnceLock::new();
    let node_id = NODE_ID.get_or_init(|| {
        regex_lite::Regex::new(r"/-?[0-9]+(/|$)").expect("node id pattern is valid")
    });

    node_id.replace_all(path, "/:id$1").to_string()
}

/// Record subtree fetch metrics.
pub fn record_tree_metrics(count_nodes: usize, depth: usize, latency_ms: u64) {
    info!(
        target: "edge_forest::metrics",
        metric_type = "tree",
        count_nodes = count_nodes,
        depth = depth,
        latency_ms = latency_ms,
        "tree_metric"
    );
}

/// Record the outcome of a create or delete.
pub fn record_mutation(operation: &str, outcome: &str) {
    info!(
        target: "edge_forest::metrics",
        metric_type = "mutation",
        operation = operation,
        outcome = outcome,
        "mutation_metric"
    );
}
