mod memory;
mod postgres;

pub use memory::MemoryEdgeStore;
pub use postgres::PgEdgeStore;

use async_trait::async_trait;

use lineage_common::types::{LineageEdge, RelationshipType};
use lineage_common::{AssetId, EdgeKey, LineageError};

/// Durable keyed storage for lineage edges.
///
/// The store owns pair uniqueness: `insert` must fail with
/// [`StoreError::Conflict`] when the (source, target) pair already exists,
/// whatever the caller checked beforehand.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Look up the edge for an exact ordered pair, active or not.
    async fn find(&self, key: EdgeKey) -> Result<Option<LineageEdge>, StoreError>;

    /// Persist a new edge.
    async fn insert(&self, edge: &LineageEdge) -> Result<(), StoreError>;

    /// Overwrite the mutable fields of an existing edge.
    async fn update(&self, edge: &LineageEdge) -> Result<(), StoreError>;

    /// Active edges whose source is `source`, ordered by target.
    async fn outgoing(&self, source: AssetId) -> Result<Vec<LineageEdge>, StoreError>;

    /// Active edges whose target is `target`, ordered by source.
    async fn incoming(&self, target: AssetId) -> Result<Vec<LineageEdge>, StoreError>;

    /// Flip the soft-delete flag and return the stored edge.
    async fn set_active(
        &self,
        key: EdgeKey,
        active: bool,
        actor: &str,
    ) -> Result<LineageEdge, StoreError>;

    /// Number of active edges per relationship type.
    async fn count_by_relationship_type(&self) -> Result<Vec<(RelationshipType, i64)>, StoreError>;

    /// Verify the backend is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Edge store connection error: {0}")]
    Connection(String),

    #[error("Edge store query error: {0}")]
    Query(String),

    #[error("Edge store migration error: {0}")]
    Migration(String),

    #[error("Edge already exists: {0}")]
    Conflict(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<StoreError> for LineageError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => LineageError::NotFound(msg),
            StoreError::Conflict(msg) => LineageError::Conflict(msg),
            StoreError::Constraint(msg) => LineageError::Validation(msg),
            other => LineageError::Postgres(other.to_string()),
        }
    }
}
