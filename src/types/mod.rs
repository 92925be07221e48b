//! Core types for the edge forest.

pub mod node;
pub mod edge;
pub mod tree;

pub use node::{NodeId, DepthBudget, DEFAULT_CYCLE_DEPTH, DEFAULT_TREE_DEPTH, DEFAULT_MAX_TREE_DEPTH};
pub use edge::Edge;
pub use tree::{EdgeNode, TreeView};
