//! Edge type for the forest.

use serde::Serialize;
use std::fmt;

use super::node::NodeId;
use crate::error::EdgeError;

/// Directed parent -> child edge.
///
/// Self-loops cannot be constructed.
/// Implements `Ord` for deterministic ordering: (from, to).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Edge {
    /// Parent node (source).
    pub from: NodeId,
    /// Child node (target).
    pub to: NodeId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(from: NodeId, to: NodeId) -> Result<Self, EdgeError> {
        if from == to {
            return Err(EdgeError::Validation(format!(
                "fromId and toId must not be the same (self-loop is not allowed): [{from}]"
            )));
        }
        Ok(Self { from, to })
    }

    /// Create an edge from raw integers, validating both ids and the self-loop rule.
    pub fn try_from_raw(from: i64, to: i64) -> Result<Self, EdgeError> {
        Self::new(NodeId::new(from)?, NodeId::new(to)?)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] -> [{}]", self.from, self.to)
    }
}

// Canonical ordering: from, then to
impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.from
            .cmp(&other.from)
            .then_with(|| self.to.cmp(&other.to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: i64, to: i64) -> Edge {
        Edge::try_from_raw(from, to).unwrap()
    }

    #[test]
    fn test_edge_ordering() {
        let e1 = edge(1, 2);
        let e2 = edge(1, 3);
        let e3 = edge(2, 3);

        // Same parent, different child
        assert!(e1 < e2);
        // Different parent
        assert!(e1 < e3);
        assert!(e2 < e3);
    }

    #[test]
    fn test_self_loop_rejected() {
        let err = Edge::try_from_raw(5, 5).unwrap_err();
        assert!(matches!(err, EdgeError::Validation(_)));
        assert!(err.to_string().contains("self-loop"));
    }

    #[test]
    fn test_non_positive_endpoints_rejected() {
        assert!(Edge::try_from_raw(0, 1).is_err());
        assert!(Edge::try_from_raw(1, -1).is_err());
    }
}
