//! In-memory edge store for tests and single-process deployments.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::{Edge, NodeId};
use super::{EdgeReader, EdgeStore, EdgeWriter, StoreConflict, StoreError};

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// The `(from, to)` pair is already stored.
    #[error("Duplicate edge: {0}")]
    DuplicateEdge(Edge),
    /// The target already has a parent.
    #[error("Node [{0}] already has a parent")]
    ParentTaken(NodeId),
}

impl StoreError for InMemoryError {
    fn conflict(&self) -> Option<StoreConflict> {
        match self {
            Self::DuplicateEdge(_) => Some(StoreConflict::DuplicateEdge),
            Self::ParentTaken(_) => Some(StoreConflict::ParentTaken),
        }
    }
}

/// Adjacency index over the stored edges.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order.
#[derive(Debug, Clone, Default)]
struct EdgeTable {
    /// Parent -> children mapping.
    children: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Child -> parents mapping. More than one parent only via [`InMemoryEdgeStore::seed`].
    parents: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl EdgeTable {
    fn contains(&self, edge: &Edge) -> bool {
        self.children
            .get(&edge.from)
            .is_some_and(|set| set.contains(&edge.to))
    }

    fn has_incoming(&self, to: NodeId) -> bool {
        self.parents.contains_key(&to)
    }

    fn participates(&self, node: NodeId) -> bool {
        self.children.contains_key(&node) || self.parents.contains_key(&node)
    }

    fn parents_of(&self, to: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.parents.get(&to).into_iter().flatten().copied()
    }

    fn kids_of(&self, from: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children.get(&from).into_iter().flatten().copied()
    }

    fn children_of(&self, frontier: &[NodeId]) -> Vec<Edge> {
        let parents: BTreeSet<NodeId> = frontier.iter().copied().collect();
        parents
            .into_iter()
            .filter_map(|from| self.children.get(&from).map(|set| (from, set)))
            .flat_map(|(from, set)| set.iter().map(move |&to| Edge { from, to }))
            .collect()
    }

    fn link(&mut self, edge: Edge) {
        self.children.entry(edge.from).or_default().insert(edge.to);
        self.parents.entry(edge.to).or_default().insert(edge.from);
    }

    fn delete(&mut self, edge: &Edge) -> bool {
        let removed = match self.children.get_mut(&edge.from) {
            Some(set) => {
                let removed = set.remove(&edge.to);
                if set.is_empty() {
                    self.children.remove(&edge.from);
                }
                removed
            }
            None => false,
        };

        if removed {
            if let Some(set) = self.parents.get_mut(&edge.to) {
                set.remove(&edge.from);
                if set.is_empty() {
                    self.parents.remove(&edge.to);
                }
            }
        }
        removed
    }

    fn edges(&self) -> Vec<Edge> {
        self.children
            .iter()
            .flat_map(|(&from, set)| set.iter().map(move |&to| Edge { from, to }))
            .collect()
    }
}

/// In-memory edge store.
///
/// Readers work on an immutable snapshot and never wait for writers.
/// Transactions are serialized by a single writer lock, so a check-then-write
/// sequence always sees the state it ends up modifying.
///
/// A commit applies its staged edits to the committed table in place,
/// O(k log E) for k edits. If a reader still holds the previous snapshot the
/// table is copied once first, O(E).
#[derive(Debug, Clone, Default)]
pub struct InMemoryEdgeStore {
    /// Last committed table.
    committed: Arc<RwLock<Arc<EdgeTable>>>,
    /// Held by the single open transaction.
    writer: Arc<Mutex<()>>,
}

impl InMemoryEdgeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load edges without any validation.
    ///
    /// Intended for fixtures, including deliberately corrupt ones. Seeded
    /// edges are not visible to an already open transaction, but its commit
    /// keeps them.
    pub fn seed(&self, edges: impl IntoIterator<Item = Edge>) {
        let mut guard = self.committed.write();
        let table = Arc::make_mut(&mut *guard);
        for edge in edges {
            table.link(edge);
        }
    }

    /// All stored edges in canonical order.
    pub fn edges(&self) -> Vec<Edge> {
        self.snapshot().edges()
    }

    /// Number of stored edges.
    pub fn num_edges(&self) -> usize {
        self.snapshot().children.values().map(BTreeSet::len).sum()
    }

    fn snapshot(&self) -> Arc<EdgeTable> {
        Arc::clone(&*self.committed.read())
    }
}

/// Read-only view over one committed snapshot.
#[derive(Debug, Clone)]
pub struct InMemoryReader {
    table: Arc<EdgeTable>,
}

#[async_trait]
impl EdgeReader for InMemoryReader {
    type Error = InMemoryError;

    async fn exists(&mut self, edge: &Edge) -> Result<bool, Self::Error> {
        Ok(self.table.contains(edge))
    }

    async fn has_incoming(&mut self, to: NodeId) -> Result<bool, Self::Error> {
        Ok(self.table.has_incoming(to))
    }

    async fn children_of(&mut self, frontier: &[NodeId]) -> Result<Vec<Edge>, Self::Error> {
        Ok(self.table.children_of(frontier))
    }

    async fn participates(&mut self, node: NodeId) -> Result<bool, Self::Error> {
        Ok(self.table.participates(node))
    }
}

/// Writes staged by an open transaction.
#[derive(Debug, Default)]
struct Pending {
    inserted: BTreeSet<Edge>,
    deleted: BTreeSet<Edge>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.deleted.is_empty()
    }
}

/// Exclusive read-write unit.
///
/// Reads see the snapshot taken at `begin` overlaid with this unit's own
/// staged writes. Nothing is copied until commit.
#[derive(Debug)]
pub struct InMemoryTransaction {
    base: Arc<EdgeTable>,
    pending: Pending,
    committed: Arc<RwLock<Arc<EdgeTable>>>,
    _guard: OwnedMutexGuard<()>,
}

impl InMemoryTransaction {
    fn contains(&self, edge: &Edge) -> bool {
        self.pending.inserted.contains(edge)
            || (self.base.contains(edge) && !self.pending.deleted.contains(edge))
    }

    fn incoming(&self, to: NodeId) -> bool {
        self.pending.inserted.iter().any(|e| e.to == to)
            || self
                .base
                .parents_of(to)
                .any(|from| !self.pending.deleted.contains(&Edge { from, to }))
    }

    fn outgoing(&self, from: NodeId) -> bool {
        self.pending.inserted.iter().any(|e| e.from == from)
            || self
                .base
                .kids_of(from)
                .any(|to| !self.pending.deleted.contains(&Edge { from, to }))
    }

    fn children(&self, frontier: &[NodeId]) -> Vec<Edge> {
        let mut found: Vec<Edge> = self
            .base
            .children_of(frontier)
            .into_iter()
            .filter(|e| !self.pending.deleted.contains(e))
            .collect();

        if !self.pending.inserted.is_empty() {
            let parents: BTreeSet<NodeId> = frontier.iter().copied().collect();
            found.extend(
                self.pending
                    .inserted
                    .iter()
                    .filter(|e| parents.contains(&e.from))
                    .copied(),
            );
            found.sort_unstable();
        }
        found
    }
}

#[async_trait]
impl EdgeReader for InMemoryTransaction {
    type Error = InMemoryError;

    async fn exists(&mut self, edge: &Edge) -> Result<bool, Self::Error> {
        Ok(self.contains(edge))
    }

    async fn has_incoming(&mut self, to: NodeId) -> Result<bool, Self::Error> {
        Ok(self.incoming(to))
    }

    async fn children_of(&mut self, frontier: &[NodeId]) -> Result<Vec<Edge>, Self::Error> {
        Ok(self.children(frontier))
    }

    async fn participates(&mut self, node: NodeId) -> Result<bool, Self::Error> {
        Ok(self.incoming(node) || self.outgoing(node))
    }
}

#[async_trait]
impl EdgeWriter for InMemoryTransaction {
    async fn insert(&mut self, edge: &Edge) -> Result<(), Self::Error> {
        if self.contains(edge) {
            return Err(InMemoryError::DuplicateEdge(*edge));
        }
        if self.incoming(edge.to) {
            return Err(InMemoryError::ParentTaken(edge.to));
        }
        if !self.pending.deleted.remove(edge) {
            self.pending.inserted.insert(*edge);
        }
        Ok(())
    }

    async fn delete(&mut self, edge: &Edge) -> Result<bool, Self::Error> {
        if self.pending.inserted.remove(edge) {
            return Ok(true);
        }
        Ok(self.base.contains(edge) && self.pending.deleted.insert(*edge))
    }

    async fn commit(self) -> Result<(), Self::Error> {
        let Self {
            base,
            pending,
            committed,
            _guard,
        } = self;
        if pending.is_empty() {
            return Ok(());
        }

        // With our snapshot released the table is only copied if a reader
        // still holds it
        drop(base);
        let mut current = committed.write();
        let table = Arc::make_mut(&mut *current);
        for edge in &pending.deleted {
            table.delete(edge);
        }
        for edge in pending.inserted {
            table.link(edge);
        }
        Ok(())
    }
}

#[async_trait]
impl EdgeStore for InMemoryEdgeStore {
    type Error = InMemoryError;
    type Reader = InMemoryReader;
    type Transaction = InMemoryTransaction;

    async fn reader(&self) -> Result<Self::Reader, Self::Error> {
        Ok(InMemoryReader {
            table: self.snapshot(),
        })
    }

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        // Snapshot after acquiring the lock so the previous writer's commit is visible
        Ok(InMemoryTransaction {
            base: self.snapshot(),
            pending: Pending::default(),
            committed: Arc::clone(&self.committed),
            _guard: guard,
        })
    }

    async fn ping(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}
