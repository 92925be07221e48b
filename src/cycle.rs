//! Depth-bounded cycle check for prospective edges.
//!
//! Inserting `from -> to` closes a cycle exactly when `from` is already a
//! descendant of `to`. The checker walks the descendants of `to` up to a hop
//! budget; if the budget runs out before the walk is complete and `from` has
//! not been seen, it refuses to guess and reports [`CycleDecision::Undecidable`].

use crate::store::EdgeReader;
use crate::traversal::LevelExpansion;
use crate::types::{DepthBudget, Edge};

/// Outcome of a cycle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDecision {
    /// Every descendant of `to` was seen and `from` is not among them.
    NoCycle,
    /// `from` is a descendant of `to`.
    Cycle,
    /// The budget ran out with nodes left unexplored.
    Undecidable,
}

/// Cycle checker with a fixed hop budget.
#[derive(Debug, Clone, Copy)]
pub struct CycleChecker {
    max_depth: DepthBudget,
}

impl CycleChecker {
    /// Create a checker that looks at most `max_depth` hops below `to`.
    pub fn new(max_depth: DepthBudget) -> Self {
        Self { max_depth }
    }

    /// Hop budget of this checker.
    pub fn max_depth(&self) -> DepthBudget {
        self.max_depth
    }

    /// Decide whether inserting `edge` would create a cycle.
    ///
    /// Stops expanding as soon as `edge.from` shows up. A frontier left
    /// exactly at the budget only matters when `from` was not found.
    pub async fn would_create_cycle<R>(
        &self,
        reader: &mut R,
        edge: &Edge,
    ) -> Result<CycleDecision, R::Error>
    where
        R: EdgeReader + ?Sized,
    {
        tracing::debug!(
            from = %edge.from,
            to = %edge.to,
            max_depth = self.max_depth.get(),
            "Checking for potential cycle"
        );

        let mut walk = LevelExpansion::new(edge.to, self.max_depth);
        while let Some(level) = walk.next_level(reader).await? {
            if level.nodes().any(|node| node == edge.from) {
                tracing::debug!(
                    from = %edge.from,
                    to = %edge.to,
                    depth = level.depth,
                    "Cycle found"
                );
                return Ok(CycleDecision::Cycle);
            }
        }

        if walk.exhausted_budget() {
            tracing::warn!(
                from = %edge.from,
                to = %edge.to,
                max_depth = self.max_depth.get(),
                "Max depth reached during cycle checking"
            );
            return Ok(CycleDecision::Undecidable);
        }

        tracing::debug!(
            from = %edge.from,
            to = %edge.to,
            descendants = walk.visited() - 1,
            "No cycle"
        );
        Ok(CycleDecision::NoCycle)
    }
}

impl Default for CycleChecker {
    fn default() -> Self {
        Self::new(DepthBudget::cycle_default())
    }
}
