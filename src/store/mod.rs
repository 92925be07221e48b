//! Edge storage backends.
//!
//! The core only talks to storage through the traits in this module, so a
//! relational table, an in-memory index or a remote service are
//! interchangeable.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use crate::types::{Edge, NodeId};

/// Uniqueness constraint a write tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreConflict {
    /// The `(from, to)` pair is already stored.
    DuplicateEdge,
    /// The target already has an incoming edge.
    ParentTaken,
}

/// Error type for store operations.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
    /// Definitive uniqueness conflict behind this error, if any.
    fn conflict(&self) -> Option<StoreConflict> {
        None
    }
}

/// Read-only queries over the edge set.
///
/// Methods take `&mut self` so a backend can run them on a single
/// connection or transaction.
#[async_trait]
pub trait EdgeReader: Send {
    /// Error type for store operations.
    type Error: StoreError;

    /// Check whether the exact edge is stored.
    async fn exists(&mut self, edge: &Edge) -> Result<bool, Self::Error>;

    /// Check whether some edge targets `to`.
    async fn has_incoming(&mut self, to: NodeId) -> Result<bool, Self::Error>;

    /// One expansion step: every stored edge whose parent is in `frontier`.
    ///
    /// Results are ordered by (parent, child) so repeated reads of an
    /// unchanged store enumerate children identically.
    async fn children_of(&mut self, frontier: &[NodeId]) -> Result<Vec<Edge>, Self::Error>;

    /// Check whether `node` appears as either endpoint of any edge.
    async fn participates(&mut self, node: NodeId) -> Result<bool, Self::Error>;
}

/// A unit of work that can read and write atomically.
///
/// Reads observe a consistent snapshot including this unit's own writes.
/// Dropping a writer without calling [`EdgeWriter::commit`] discards its writes.
#[async_trait]
pub trait EdgeWriter: EdgeReader {
    /// Insert an edge. Fails if the pair exists or the target has a parent.
    async fn insert(&mut self, edge: &Edge) -> Result<(), Self::Error>;

    /// Delete an edge, returning whether a row was removed.
    async fn delete(&mut self, edge: &Edge) -> Result<bool, Self::Error>;

    /// Make the writes visible to everyone else.
    async fn commit(self) -> Result<(), Self::Error>;
}

/// Trait for edge storage backends.
#[async_trait]
pub trait EdgeStore: Send + Sync + 'static {
    /// Error type for store operations.
    type Error: StoreError;
    /// Snapshot reader type.
    type Reader: EdgeReader<Error = Self::Error>;
    /// Serializable read-write unit type.
    type Transaction: EdgeWriter<Error = Self::Error>;

    /// Open a read-only view. Must not wait on in-flight writers.
    async fn reader(&self) -> Result<Self::Reader, Self::Error>;

    /// Start a unit in which check-then-write sequences are atomic with
    /// respect to every other unit.
    async fn begin(&self) -> Result<Self::Transaction, Self::Error>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), Self::Error>;
}

pub use memory::InMemoryEdgeStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresEdgeStore;
