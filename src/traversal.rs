//! Bounded level-by-level expansion.
//!
//! Both the cycle checker and the tree builder walk the forest downwards
//! from one node, one store round-trip per level, and stop after a fixed
//! number of hops. The walk never recurses and never revisits a node, so it
//! terminates even on a store that has been corrupted into a cycle.

use std::collections::HashSet;

use crate::store::EdgeReader;
use crate::types::{DepthBudget, Edge, NodeId};

/// Edges discovered at one depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    /// Hops from the root to the children in this level (1 for direct children).
    pub depth: u32,
    /// `(parent, child)` pairs in store order. Every child is new to the walk.
    pub edges: Vec<Edge>,
}

impl Level {
    /// Children reached at this depth.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().map(|e| e.to)
    }
}

/// Breadth-first walk below a root, limited to a [`DepthBudget`].
#[derive(Debug, Clone)]
pub struct LevelExpansion {
    frontier: Vec<NodeId>,
    seen: HashSet<NodeId>,
    depth: u32,
    budget: DepthBudget,
}

impl LevelExpansion {
    /// Start a walk at `root`.
    pub fn new(root: NodeId, budget: DepthBudget) -> Self {
        Self {
            frontier: vec![root],
            seen: HashSet::from([root]),
            depth: 0,
            budget,
        }
    }

    /// Expand the current frontier by one hop.
    ///
    /// Returns `None` once the frontier is empty or the budget is spent.
    pub async fn next_level<R>(&mut self, reader: &mut R) -> Result<Option<Level>, R::Error>
    where
        R: EdgeReader + ?Sized,
    {
        if self.frontier.is_empty() || self.depth >= self.budget.get() {
            return Ok(None);
        }

        let found = reader.children_of(&self.frontier).await?;
        self.depth += 1;

        let edges: Vec<Edge> = found
            .into_iter()
            .filter(|edge| self.seen.insert(edge.to))
            .collect();
        self.frontier = edges.iter().map(|e| e.to).collect();

        tracing::trace!(
            depth = self.depth,
            discovered = edges.len(),
            "expanded traversal level"
        );

        Ok(Some(Level {
            depth: self.depth,
            edges,
        }))
    }

    /// Depth of the current frontier.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// True when nodes sit exactly at the budget and may have children the
    /// walk is not allowed to look at.
    pub fn exhausted_budget(&self) -> bool {
        !self.frontier.is_empty() && self.depth >= self.budget.get()
    }

    /// Number of distinct nodes reached so far, root included.
    pub fn visited(&self) -> usize {
        self.seen.len()
    }
}
