//! Node identifiers and traversal budgets.

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;

use crate::error::EdgeError;

/// Identifier of a node in the forest.
///
/// Nodes have no stored record of their own: a node exists while some edge
/// names it. Identifiers are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    /// Create a node id, rejecting zero and negative values.
    pub fn new(raw: i64) -> Result<Self, EdgeError> {
        if raw <= 0 {
            return Err(EdgeError::Validation(format!(
                "node id must be positive, got [{raw}]"
            )));
        }
        Ok(Self(raw))
    }

    /// Get the raw integer value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Default hop budget for cycle checks during edge creation.
pub const DEFAULT_CYCLE_DEPTH: u32 = 50;

/// Default hop budget for subtree fetches.
pub const DEFAULT_TREE_DEPTH: u32 = 99;

/// Largest subtree budget a caller may request.
pub const DEFAULT_MAX_TREE_DEPTH: u32 = 500;

/// Maximum number of edge hops a bounded traversal may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DepthBudget(NonZeroU32);

impl DepthBudget {
    /// Create a budget, rejecting zero.
    pub fn new(hops: u32) -> Result<Self, EdgeError> {
        NonZeroU32::new(hops)
            .map(Self)
            .ok_or_else(|| EdgeError::Validation("maxDepth must be at least 1".to_string()))
    }

    /// Budget used by the cycle checker unless configured otherwise.
    pub fn cycle_default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_CYCLE_DEPTH - 1))
    }

    /// Budget used for subtree fetches unless the caller overrides it.
    pub fn tree_default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_TREE_DEPTH - 1))
    }

    /// Largest subtree budget accepted unless configured otherwise.
    pub fn tree_ceiling() -> Self {
        Self(NonZeroU32::MIN.saturating_add(DEFAULT_MAX_TREE_DEPTH - 1))
    }

    /// Number of hops.
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for DepthBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
