//! # edge-forest
//!
//! A store of directed parent -> child edges over integer node ids that is
//! kept a forest: every node has at most one parent and there are no cycles.
//!
//! ## Core Contract
//!
//! 1. `create_edge` refuses duplicates, second parents and cycles before
//!    anything is written
//! 2. The cycle check explores at most a fixed number of hops and says
//!    "undecidable" rather than guess when the budget runs out
//! 3. `get_tree` rebuilds the subtree below a node up to a hop budget,
//!    truncating silently at the limit
//!
//! ## Architecture
//!
//! ```text
//! GraphEditService ──► CycleChecker ─┐
//!        │                           ├─► LevelExpansion ──► EdgeStore (Postgres or Memory)
//!        └──────────► TreeBuilder ───┘
//! ```
//!
//! The store is the only source of truth. Mutations run their checks and
//! their write inside one store transaction; reads work on a snapshot.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod error;
pub mod config;
pub mod store;
pub mod traversal;
pub mod cycle;
pub mod tree;
pub mod edit;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    NodeId, Edge, EdgeNode, TreeView, DepthBudget,
    DEFAULT_CYCLE_DEPTH, DEFAULT_TREE_DEPTH, DEFAULT_MAX_TREE_DEPTH,
};
pub use error::{EdgeError, Result};
pub use config::EditConfig;
pub use store::{EdgeStore, EdgeReader, EdgeWriter, StoreError, StoreConflict, InMemoryEdgeStore};
#[cfg(feature = "postgres")]
pub use store::PostgresEdgeStore;
pub use traversal::{LevelExpansion, Level};
pub use cycle::{CycleChecker, CycleDecision};
pub use tree::TreeBuilder;
pub use edit::GraphEditService;

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};
