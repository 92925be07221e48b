//! Subtree reconstruction.
//!
//! Runs the same bounded walk as the cycle checker, but remembers every
//! `(parent, child)` pair and assembles nested [`EdgeNode`]s bottom-up once
//! the walk is over. Nodes sitting at the depth limit are rendered as leaves
//! even if the store has more below them.

use std::collections::HashMap;

use crate::store::EdgeReader;
use crate::traversal::LevelExpansion;
use crate::types::{DepthBudget, EdgeNode, NodeId};

/// Builds [`EdgeNode`] trees from a reader.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder {
    max_depth: DepthBudget,
}

impl TreeBuilder {
    /// Create a builder that descends at most `max_depth` hops below the root.
    pub fn new(max_depth: DepthBudget) -> Self {
        Self { max_depth }
    }

    /// Reconstruct the subtree rooted at `root`.
    ///
    /// The caller is responsible for checking that `root` exists; an unknown
    /// root simply yields a leaf.
    pub async fn build<R>(&self, reader: &mut R, root: NodeId) -> Result<EdgeNode, R::Error>
    where
        R: EdgeReader + ?Sized,
    {
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut levels: Vec<Vec<NodeId>> = vec![vec![root]];

        let mut walk = LevelExpansion::new(root, self.max_depth);
        while let Some(level) = walk.next_level(reader).await? {
            if level.edges.is_empty() {
                break;
            }
            for edge in &level.edges {
                children.entry(edge.from).or_default().push(edge.to);
            }
            levels.push(level.nodes().collect());
        }

        if walk.exhausted_budget() {
            tracing::debug!(
                root = %root,
                max_depth = self.max_depth.get(),
                "Tree truncated at max depth"
            );
        }
        tracing::debug!(
            root = %root,
            nodes = walk.visited(),
            levels = levels.len(),
            "Edge map collected"
        );

        Ok(assemble(root, levels, children))
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new(DepthBudget::tree_default())
    }
}

/// Fold the collected levels into nested nodes, deepest level first.
fn assemble(
    root: NodeId,
    levels: Vec<Vec<NodeId>>,
    mut children: HashMap<NodeId, Vec<NodeId>>,
) -> EdgeNode {
    let mut built: HashMap<NodeId, EdgeNode> = HashMap::new();

    for level in levels.into_iter().rev() {
        for id in level {
            let kids = children
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|child| built.remove(&child).unwrap_or_else(|| EdgeNode::leaf(child)))
                .collect();
            built.insert(id, EdgeNode::with_children(id, kids));
        }
    }

    built.remove(&root).unwrap_or_else(|| EdgeNode::leaf(root))
}
