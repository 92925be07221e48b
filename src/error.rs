//! Error taxonomy for edge mutations and subtree fetches.

use crate::store::{StoreConflict, StoreError};
use crate::types::NodeId;

/// Result type alias using [`EdgeError`].
pub type Result<T> = std::result::Result<T, EdgeError>;

/// Every way an edge operation can fail.
///
/// All variants except [`EdgeError::Store`] and [`EdgeError::Unexpected`] are
/// expected outcomes of a well-formed request and are reported to the caller
/// as-is. The core never retries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EdgeError {
    /// Malformed input (non-positive id, self-loop, zero depth).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The exact edge is already stored.
    #[error("Edge from [{from}] to [{to}] already exists")]
    AlreadyExists {
        /// Parent node.
        from: NodeId,
        /// Child node.
        to: NodeId,
    },

    /// The target already has a parent.
    #[error("Edge node [{to}] has a parent! Cannot add edge from [{from}]")]
    NodeAlreadyHasParent {
        /// Rejected parent.
        from: NodeId,
        /// Node that already has a parent.
        to: NodeId,
    },

    /// Inserting the edge would close a cycle.
    #[error("Adding edge from [{from}] to [{to}] will create cycle")]
    CycleDetected {
        /// Parent node.
        from: NodeId,
        /// Child node.
        to: NodeId,
    },

    /// The cycle check ran out of depth budget before it could decide.
    #[error("Cannot determine if adding new edge [{from}] to [{to}] will create cycle due to exceeding maxDepth: [{max_depth}]")]
    CycleUndecidable {
        /// Parent node.
        from: NodeId,
        /// Child node.
        to: NodeId,
        /// Budget that was exhausted.
        max_depth: u32,
    },

    /// Delete of an edge that is not stored.
    #[error("Edge from [{from}] to [{to}] not found")]
    EdgeNotFound {
        /// Parent node.
        from: NodeId,
        /// Child node.
        to: NodeId,
    },

    /// The node takes part in no edge.
    #[error("EdgeNode with id [{0}] not found")]
    NodeNotFound(NodeId),

    /// Backing store failure.
    #[error("Store error: {0}")]
    Store(String),

    /// Anything else.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl EdgeError {
    /// Map a store error, translating definitive uniqueness conflicts back
    /// into the guard failure they stand for.
    pub fn from_store<E: StoreError>(err: E, from: NodeId, to: NodeId) -> Self {
        match err.conflict() {
            Some(StoreConflict::DuplicateEdge) => Self::AlreadyExists { from, to },
            Some(StoreConflict::ParentTaken) => Self::NodeAlreadyHasParent { from, to },
            None => Self::store(err),
        }
    }

    /// Wrap a store error as an opaque store failure.
    pub fn store<E: std::error::Error>(err: E) -> Self {
        Self::Store(err.to_string())
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::AlreadyExists { .. } => "ALREADY_EXISTS",
            Self::NodeAlreadyHasParent { .. } => "NODE_ALREADY_HAS_PARENT",
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::CycleUndecidable { .. } => "CYCLE_UNDECIDABLE",
            Self::EdgeNotFound { .. } => "EDGE_NOT_FOUND",
            Self::NodeNotFound(_) => "NODE_NOT_FOUND",
            Self::Store(_) => "STORE_FAILURE",
            Self::Unexpected(_) => "UNEXPECTED",
        }
    }

    /// True for failures the caller cannot act on (store and unexpected errors).
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Unexpected(_))
    }
}
