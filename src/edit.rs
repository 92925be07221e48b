//! Validated edge mutations and subtree fetches.
//!
//! `create_edge` runs its guards and the insert inside one store transaction:
//!
//! ```text
//! exists(from,to)? ─yes─► AlreadyExists
//!        │no
//! has_incoming(to)? ─yes─► NodeAlreadyHasParent
//!        │no
//! cycle check ─Cycle─► CycleDetected
//!        │    └─Undecidable─► CycleUndecidable
//!        │NoCycle
//!     insert + commit
//! ```
//!
//! Any failure drops the transaction, so the store is left exactly as it was.

use std::sync::Arc;

use crate::config::EditConfig;
use crate::cycle::{CycleChecker, CycleDecision};
use crate::error::{EdgeError, Result};
use crate::store::{EdgeReader, EdgeStore, EdgeWriter};
use crate::tree::TreeBuilder;
use crate::types::{DepthBudget, Edge, NodeId, TreeView};

/// Public operations over an [`EdgeStore`].
pub struct GraphEditService<S: EdgeStore> {
    store: Arc<S>,
    config: EditConfig,
}

impl<S: EdgeStore> GraphEditService<S> {
    /// Create a service with the given budgets.
    pub fn new(store: Arc<S>, config: EditConfig) -> Self {
        Self { store, config }
    }

    /// Create a service with default budgets.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, EditConfig::default())
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Active budgets.
    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    /// Add the edge `from -> to`.
    pub async fn create_edge(&self, from: NodeId, to: NodeId) -> Result<()> {
        tracing::info!(%from, %to, "Creating edge");
        let edge = Edge::new(from, to)?;

        let mut tx = self.store.begin().await.map_err(EdgeError::store)?;

        if tx.exists(&edge).await.map_err(EdgeError::store)? {
            tracing::warn!(%from, %to, "Edge already exists");
            return Err(EdgeError::AlreadyExists { from, to });
        }

        if tx.has_incoming(to).await.map_err(EdgeError::store)? {
            tracing::warn!(%from, %to, "Node already has a parent");
            return Err(EdgeError::NodeAlreadyHasParent { from, to });
        }

        let checker = CycleChecker::new(self.config.max_cycle_depth);
        match checker
            .would_create_cycle(&mut tx, &edge)
            .await
            .map_err(EdgeError::store)?
        {
            CycleDecision::NoCycle => {}
            CycleDecision::Cycle => {
                tracing::warn!(%from, %to, "Adding edge will create cycle, create skipped");
                return Err(EdgeError::CycleDetected { from, to });
            }
            CycleDecision::Undecidable => {
                return Err(EdgeError::CycleUndecidable {
                    from,
                    to,
                    max_depth: checker.max_depth().get(),
                });
            }
        }

        tx.insert(&edge)
            .await
            .map_err(|e| EdgeError::from_store(e, from, to))?;
        tx.commit()
            .await
            .map_err(|e| EdgeError::from_store(e, from, to))?;

        tracing::info!(%from, %to, "Edge successfully created");
        Ok(())
    }

    /// Remove the edge `from -> to`.
    pub async fn delete_edge(&self, from: NodeId, to: NodeId) -> Result<()> {
        tracing::info!(%from, %to, "Deleting edge");
        let edge = Edge { from, to };

        let mut tx = self.store.begin().await.map_err(EdgeError::store)?;
        if !tx.delete(&edge).await.map_err(EdgeError::store)? {
            tracing::warn!(%from, %to, "Edge not found for deletion");
            return Err(EdgeError::EdgeNotFound { from, to });
        }
        tx.commit().await.map_err(EdgeError::store)?;

        tracing::info!(%from, %to, "Edge successfully deleted");
        Ok(())
    }

    /// Fetch the subtree rooted at `node`, descending at most `max_depth`
    /// hops (the configured default when `None`). Budgets above the
    /// configured ceiling fail validation.
    pub async fn get_tree(&self, node: NodeId, max_depth: Option<DepthBudget>) -> Result<TreeView> {
        let max_depth = self.config.tree_depth(max_depth)?;
        tracing::info!(%node, max_depth = max_depth.get(), "Fetching edge tree");

        let mut reader = self.store.reader().await.map_err(EdgeError::store)?;
        if !reader.participates(node).await.map_err(EdgeError::store)? {
            tracing::warn!(%node, "Node not found");
            return Err(EdgeError::NodeNotFound(node));
        }

        let tree = TreeBuilder::new(max_depth)
            .build(&mut reader, node)
            .await
            .map_err(EdgeError::store)?;
        let view = TreeView::from(tree);

        tracing::info!(
            %node,
            count_nodes = view.count_nodes,
            depth = view.depth,
            "Edge tree fetched"
        );
        Ok(view)
    }
}

impl<S: EdgeStore> Clone for GraphEditService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryEdgeStore;

    fn id(raw: i64) -> NodeId {
        NodeId::new(raw).unwrap()
    }

    fn service(max_cycle_depth: u32) -> GraphEditService<InMemoryEdgeStore> {
        let config = EditConfig::default()
            .with_max_cycle_depth(DepthBudget::new(max_cycle_depth).unwrap());
        GraphEditService::new(Arc::new(InMemoryEdgeStore::new()), config)
    }

    async fn link(svc: &GraphEditService<InMemoryEdgeStore>, from: i64, to: i64) {
        svc.create_edge(id(from), id(to)).await.unwrap();
    }

    #[tokio::test]
    async fn test_self_loop_rejected_before_store() {
        let svc = service(50);
        let err = svc.create_edge(id(4), id(4)).await.unwrap_err();
        assert!(matches!(err, EdgeError::Validation(_)));
        assert_eq!(svc.store().num_edges(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_edge() {
        let svc = service(50);
        link(&svc, 1, 2).await;

        let err = svc.create_edge(id(1), id(2)).await.unwrap_err();
        assert_eq!(err, EdgeError::AlreadyExists { from: id(1), to: id(2) });
        assert_eq!(svc.store().num_edges(), 1);
    }

    #[tokio::test]
    async fn test_second_parent_rejected() {
        let svc = service(50);
        link(&svc, 1, 2).await;

        let err = svc.create_edge(id(3), id(2)).await.unwrap_err();
        assert_eq!(err, EdgeError::NodeAlreadyHasParent { from: id(3), to: id(2) });
        assert_eq!(svc.store().edges().len(), 1);
    }

    #[tokio::test]
    async fn test_cycle_detected() {
        let svc = service(2);
        link(&svc, 1, 2).await;
        link(&svc, 2, 3).await;

        let err = svc.create_edge(id(3), id(1)).await.unwrap_err();
        assert_eq!(err, EdgeError::CycleDetected { from: id(3), to: id(1) });
        assert_eq!(svc.store().num_edges(), 2);
    }

    #[tokio::test]
    async fn test_cycle_undecidable() {
        let svc = service(1);
        link(&svc, 1, 2).await;
        link(&svc, 2, 3).await;

        let err = svc.create_edge(id(3), id(1)).await.unwrap_err();
        assert_eq!(
            err,
            EdgeError::CycleUndecidable { from: id(3), to: id(1), max_depth: 1 }
        );
        assert_eq!(svc.store().num_edges(), 2);
    }

    #[tokio::test]
    async fn test_delete_edge() {
        let svc = service(50);
        link(&svc, 1, 2).await;
        link(&svc, 1, 3).await;

        let err = svc.delete_edge(id(2), id(1)).await.unwrap_err();
        assert_eq!(err, EdgeError::EdgeNotFound { from: id(2), to: id(1) });

        svc.delete_edge(id(1), id(2)).await.unwrap();
        let remaining = svc.store().edges();
        assert_eq!(remaining.len(), 1);
        assert_eq!((remaining[0].from, remaining[0].to), (id(1), id(3)));
    }

    #[tokio::test]
    async fn test_get_tree() {
        let svc = service(50);
        link(&svc, 1, 2).await;
        link(&svc, 1, 3).await;
        link(&svc, 2, 4).await;

        let full = svc.get_tree(id(1), None).await.unwrap();
        assert_eq!(full.count_nodes, 4);
        assert_eq!(full.depth, 2);

        let shallow = svc.get_tree(id(1), Some(DepthBudget::new(1).unwrap())).await.unwrap();
        assert_eq!(shallow.count_nodes, 3);
        assert_eq!(shallow.depth, 1);
        assert_eq!(shallow.tree.child_ids(), vec![id(2), id(3)]);
    }

    #[tokio::test]
    async fn test_get_tree_unknown_node() {
        let svc = service(50);
        link(&svc, 1, 2).await;

        let err = svc.get_tree(id(9), None).await.unwrap_err();
        assert_eq!(err, EdgeError::NodeNotFound(id(9)));
    }

    #[tokio::test]
    async fn test_deleted_edge_can_be_recreated() {
        let svc = service(50);
        link(&svc, 1, 2).await;
        svc.delete_edge(id(1), id(2)).await.unwrap();

        // 2 is parentless again, so 2 -> 1 is now legal
        link(&svc, 2, 1).await;
        assert!(svc.get_tree(id(2), None).await.unwrap().tree.child_ids() == vec![id(1)]);
    }

    #[tokio::test]
    async fn test_tree_budget_above_ceiling_rejected() {
        let svc = service(50);
        link(&svc, 1, 2).await;

        let err = svc
            .get_tree(id(1), Some(DepthBudget::new(1_000_000).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::Validation(_)));

        let view = svc.get_tree(id(1), Some(DepthBudget::tree_ceiling())).await.unwrap();
        assert_eq!(view.count_nodes, 2);
    }
}
