//! Edge Forest REST Service
//!
//! Exposes the edit service as a REST API.
//!
//! ## Endpoints
//!
//! - `POST /api/edges` - Create an edge (`{"fromId": 1, "toId": 2}`)
//! - `DELETE /api/edges` - Delete an edge (same body)
//! - `GET /api/edges/:node_id?maxDepth=N` - Fetch the subtree below a node
//! - `GET /api-docs/openapi.json` - OpenAPI document for the routes above
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check

pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_mutation, record_tree_metrics};
pub use openapi::openapi_document;
pub use routes::{create_router, ApiError, EdgeRequest, ErrorResponse, TreeQuery};
pub use state::ServiceState;
