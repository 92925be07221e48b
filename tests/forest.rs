//! Behavioural tests for the edit service.
//!
//! These run the public operations end to end against the in-memory store.

use std::sync::Arc;

use edge_forest::{
    DepthBudget, Edge, EdgeError, EdgeNode, EditConfig, GraphEditService, InMemoryEdgeStore,
    NodeId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn id(raw: i64) -> NodeId {
    NodeId::new(raw).unwrap()
}

fn edge(from: i64, to: i64) -> Edge {
    Edge::try_from_raw(from, to).unwrap()
}

fn service_with_cycle_depth(max_cycle_depth: u32) -> GraphEditService<InMemoryEdgeStore> {
    let budget = DepthBudget::new(max_cycle_depth).unwrap();
    let config = EditConfig::default().with_max_cycle_depth(budget);
    GraphEditService::new(Arc::new(InMemoryEdgeStore::new()), config)
}

async fn build(svc: &GraphEditService<InMemoryEdgeStore>, edges: &[(i64, i64)]) {
    for &(from, to) in edges {
        svc.create_edge(id(from), id(to)).await.unwrap();
    }
}

fn ids_of(nodes: &[EdgeNode]) -> Vec<i64> {
    nodes.iter().map(|n| n.id.get()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// CREATE
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_self_loops_never_reach_the_store() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2)]).await;

    for raw in [1, 2, 3, 1_000] {
        let err = svc.create_edge(id(raw), id(raw)).await.unwrap_err();
        assert!(matches!(err, EdgeError::Validation(_)), "{raw}: {err:?}");
    }

    assert_eq!(svc.store().edges(), vec![edge(1, 2)]);
}

#[tokio::test]
async fn test_create_twice_yields_already_exists() {
    let svc = service_with_cycle_depth(50);

    svc.create_edge(id(10), id(20)).await.unwrap();
    let err = svc.create_edge(id(10), id(20)).await.unwrap_err();

    assert_eq!(err, EdgeError::AlreadyExists { from: id(10), to: id(20) });
    assert_eq!(svc.store().edges(), vec![edge(10, 20)]);
}

#[tokio::test]
async fn test_any_second_parent_is_rejected() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2), (2, 3)]).await;
    let before = svc.store().edges();

    for parent in [1, 4, 5, 99] {
        let err = svc.create_edge(id(parent), id(3)).await.unwrap_err();
        assert_eq!(err, EdgeError::NodeAlreadyHasParent { from: id(parent), to: id(3) });
    }

    assert_eq!(svc.store().edges(), before);
}

#[tokio::test]
async fn test_cycle_detected_with_enough_budget() {
    for budget in [2, 3, 50] {
        let svc = service_with_cycle_depth(budget);
        build(&svc, &[(1, 2), (2, 3)]).await;

        let err = svc.create_edge(id(3), id(1)).await.unwrap_err();
        assert_eq!(err, EdgeError::CycleDetected { from: id(3), to: id(1) });
        assert!(!svc.store().edges().contains(&edge(3, 1)));
    }
}

#[tokio::test]
async fn test_cycle_undecidable_with_budget_one() {
    let svc = service_with_cycle_depth(1);
    build(&svc, &[(1, 2), (2, 3)]).await;

    let err = svc.create_edge(id(3), id(1)).await.unwrap_err();
    assert_eq!(err, EdgeError::CycleUndecidable { from: id(3), to: id(1), max_depth: 1 });
    assert_eq!(svc.store().num_edges(), 2);
}

#[tokio::test]
async fn test_undecidable_on_deep_tree_without_cycle() {
    // Joining two trees is legal, but the target tree is deeper than the budget
    let svc = service_with_cycle_depth(3);
    build(&svc, &[(1, 2), (2, 3), (3, 4), (4, 5)]).await;

    let err = svc.create_edge(id(100), id(1)).await.unwrap_err();
    assert!(matches!(err, EdgeError::CycleUndecidable { max_depth: 3, .. }));

    // A shallow enough tree can be attached
    build(&svc, &[(50, 51)]).await;
    svc.create_edge(id(100), id(50)).await.unwrap();
}

#[tokio::test]
async fn test_joining_trees_keeps_a_forest() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2), (3, 4), (4, 5)]).await;

    // Attach the root of one tree under a leaf of the other
    svc.create_edge(id(2), id(3)).await.unwrap();

    let view = svc.get_tree(id(1), None).await.unwrap();
    assert_eq!(view.count_nodes, 5);
    assert_eq!(view.depth, 4);

    // ...and closing the loop is now a cycle
    let err = svc.create_edge(id(5), id(1)).await.unwrap_err();
    assert!(matches!(err, EdgeError::CycleDetected { .. }));
}

// ─────────────────────────────────────────────────────────────────────────────
// DELETE
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_missing_edge() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2)]).await;

    let err = svc.delete_edge(id(1), id(3)).await.unwrap_err();
    assert_eq!(err, EdgeError::EdgeNotFound { from: id(1), to: id(3) });

    // Direction matters
    let err = svc.delete_edge(id(2), id(1)).await.unwrap_err();
    assert_eq!(err, EdgeError::EdgeNotFound { from: id(2), to: id(1) });

    assert_eq!(svc.store().num_edges(), 1);
}

#[tokio::test]
async fn test_delete_removes_exactly_one_pair() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2), (1, 3), (2, 4), (7, 8)]).await;

    svc.delete_edge(id(1), id(2)).await.unwrap();

    assert_eq!(svc.store().edges(), vec![edge(1, 3), edge(2, 4), edge(7, 8)]);
}

// ─────────────────────────────────────────────────────────────────────────────
// GET TREE
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_tree_of_unknown_node() {
    let svc = service_with_cycle_depth(50);
    let err = svc.get_tree(id(1), None).await.unwrap_err();
    assert_eq!(err, EdgeError::NodeNotFound(id(1)));

    build(&svc, &[(1, 2)]).await;
    svc.delete_edge(id(1), id(2)).await.unwrap();

    // Nodes disappear with their last edge
    let err = svc.get_tree(id(2), None).await.unwrap_err();
    assert_eq!(err, EdgeError::NodeNotFound(id(2)));
}

#[tokio::test]
async fn test_get_tree_full_and_truncated() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2), (1, 3), (2, 4)]).await;

    let full = svc.get_tree(id(1), Some(DepthBudget::new(99).unwrap())).await.unwrap();
    assert_eq!(full.count_nodes, 4);
    assert_eq!(full.depth, 2);
    assert_eq!(ids_of(&full.tree.children), vec![2, 3]);
    assert_eq!(ids_of(&full.tree.children[0].children), vec![4]);

    let truncated = svc.get_tree(id(1), Some(DepthBudget::new(1).unwrap())).await.unwrap();
    assert_eq!(truncated.count_nodes, 3);
    assert_eq!(truncated.depth, 1);
    assert_eq!(ids_of(&truncated.tree.children), vec![2, 3]);
    assert!(truncated.tree.children.iter().all(EdgeNode::is_leaf));
}

#[tokio::test]
async fn test_get_tree_of_a_leaf() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2)]).await;

    let view = svc.get_tree(id(2), None).await.unwrap();
    assert!(view.tree.is_leaf());
    assert_eq!(view.count_nodes, 1);
    assert_eq!(view.depth, 0);
}

#[tokio::test]
async fn test_get_tree_uses_configured_default_depth() {
    let config = EditConfig::default().with_default_tree_depth(DepthBudget::new(2).unwrap());
    let svc = GraphEditService::new(Arc::new(InMemoryEdgeStore::new()), config);
    build(&svc, &[(1, 2), (2, 3), (3, 4)]).await;

    let view = svc.get_tree(id(1), None).await.unwrap();
    assert_eq!(view.depth, 2);
    assert_eq!(view.count_nodes, 3);
}

#[tokio::test]
async fn test_get_tree_rejects_budget_above_ceiling() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 2), (2, 3)]).await;

    let err = svc
        .get_tree(id(1), Some(DepthBudget::new(1_000_000).unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, EdgeError::Validation(_)));
}

#[tokio::test]
async fn test_deep_chain_fetch_and_drop() {
    let ceiling = DepthBudget::new(1_000_000).unwrap();
    let config = EditConfig::default().with_max_tree_depth(ceiling);
    let svc = GraphEditService::new(Arc::new(InMemoryEdgeStore::new()), config);
    svc.store().seed((1..200_000).map(|i| edge(i, i + 1)));

    let view = svc.get_tree(id(1), Some(ceiling)).await.unwrap();
    assert_eq!(view.count_nodes, 200_000);
    assert_eq!(view.depth, 199_999);
    drop(view);

    // The service keeps answering afterwards
    let view = svc.get_tree(id(199_999), None).await.unwrap();
    assert_eq!(view.count_nodes, 2);
}

#[tokio::test]
async fn test_repeated_get_tree_is_identical() {
    let svc = service_with_cycle_depth(50);
    build(&svc, &[(1, 5), (1, 3), (1, 9), (3, 4), (9, 2), (2, 6)]).await;

    let first = svc.get_tree(id(1), None).await.unwrap();
    for _ in 0..25 {
        assert_eq!(svc.get_tree(id(1), None).await.unwrap(), first);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CONCURRENCY
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_parents_for_same_child() {
    let svc = Arc::new(service_with_cycle_depth(50));

    let handles: Vec<_> = (1..=32)
        .map(|parent| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.create_edge(id(parent), id(1_000)).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => successes += 1,
            Err(err) => assert!(matches!(err, EdgeError::NodeAlreadyHasParent { .. })),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(svc.store().num_edges(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicates() {
    let svc = Arc::new(service_with_cycle_depth(50));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.create_edge(id(1), id(2)).await })
        })
        .collect();

    let results: Vec<_> = futures_join(handles).await;
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, EdgeError::AlreadyExists { .. })));
    assert_eq!(svc.store().edges(), vec![edge(1, 2)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_opposite_edges_cannot_both_land() {
    // 1 -> 2 and 2 -> 1 race; accepting both would create a two-node cycle
    for _ in 0..20 {
        let svc = Arc::new(service_with_cycle_depth(50));

        let a = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.create_edge(id(1), id(2)).await })
        };
        let b = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.create_edge(id(2), id(1)).await })
        };

        let outcomes = [a.await.unwrap(), b.await.unwrap()];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(svc.store().num_edges(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_run_alongside_writes() {
    let svc = Arc::new(service_with_cycle_depth(1_000));
    build(&svc, &[(1, 2)]).await;

    let writer = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            for i in 2..200 {
                svc.create_edge(id(i), id(i + 1)).await.unwrap();
            }
        })
    };

    let reader = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move {
            let mut last = 0;
            for _ in 0..50 {
                let view = svc.get_tree(id(1), None).await.unwrap();
                // Snapshots only ever grow, and every one is a chain
                assert!(view.count_nodes >= last);
                assert_eq!(view.depth + 1, view.count_nodes);
                last = view.count_nodes;
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();
    assert_eq!(svc.store().num_edges(), 199);
}

async fn futures_join<T>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
    let mut out = Vec::with_capacity(handles.len());
    for handle in handles {
        out.push(handle.await.unwrap());
    }
    out
}
