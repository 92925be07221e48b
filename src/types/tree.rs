//! Hierarchical projection of the forest.

use serde::Serialize;

use super::node::NodeId;

/// A node of a reconstructed subtree.
///
/// Built fresh for every query and never mutated afterwards. Children keep
/// the store's enumeration order for their parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeNode {
    /// Node identifier.
    pub id: NodeId,
    /// Direct children, in store order.
    pub children: Vec<EdgeNode>,
}

impl EdgeNode {
    /// Create a leaf.
    pub fn leaf(id: NodeId) -> Self {
        Self {
            id,
            children: Vec::new(),
        }
    }

    /// Create a node with the given children.
    pub fn with_children(id: NodeId, children: Vec<EdgeNode>) -> Self {
        Self { id, children }
    }

    /// Check if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this one.
    pub fn count_nodes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Length of the longest downward path, in edges. A leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            stack.extend(node.children.iter().map(|child| (child, depth + 1)));
        }
        max_depth
    }

    /// Ids of the direct children, in order.
    pub fn child_ids(&self) -> Vec<NodeId> {
        self.children.iter().map(|c| c.id).collect()
    }
}

impl Drop for EdgeNode {
    // Unlink descendants onto a heap stack so deep chains never recurse
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Result of a subtree fetch: the tree plus its derived metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeView {
    /// Root of the reconstructed subtree.
    pub tree: EdgeNode,
    /// Total node count.
    pub count_nodes: usize,
    /// Depth of the tree in edges.
    pub depth: usize,
}

impl From<EdgeNode> for TreeView {
    fn from(tree: EdgeNode) -> Self {
        Self {
            count_nodes: tree.count_nodes(),
            depth: tree.depth(),
            tree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: i64) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    #[test]
    fn test_leaf_metrics() {
        let leaf = EdgeNode::leaf(id(1));
        assert!(leaf.is_leaf());
        assert_eq!(leaf.count_nodes(), 1);
        assert_eq!(leaf.depth(), 0);
    }

    #[test]
    fn test_nested_metrics() {
        //     1
        //    / \
        //   2   3
        //   |
        //   4
        let tree = EdgeNode::with_children(
            id(1),
            vec![
                EdgeNode::with_children(id(2), vec![EdgeNode::leaf(id(4))]),
                EdgeNode::leaf(id(3)),
            ],
        );

        assert_eq!(tree.count_nodes(), 4);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.child_ids(), vec![id(2), id(3)]);
    }

    #[test]
    fn test_deep_chain_drops_without_recursion() {
        let mut node = EdgeNode::leaf(id(200_000));
        for raw in (1..200_000).rev() {
            node = EdgeNode::with_children(id(raw), vec![node]);
        }

        let view = TreeView::from(node);
        assert_eq!(view.count_nodes, 200_000);
        assert_eq!(view.depth, 199_999);
        drop(view);
    }

    #[test]
    fn test_tree_view_serializes_camel_case() {
        let view = TreeView::from(EdgeNode::with_children(id(1), vec![EdgeNode::leaf(id(2))]));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["countNodes"], 2);
        assert_eq!(json["depth"], 1);
        assert_eq!(json["tree"]["id"], 1);
        assert_eq!(json["tree"]["children"][0]["id"], 2);
        assert!(json["tree"]["children"][0]["children"].as_array().unwrap().is_empty());
    }
}
