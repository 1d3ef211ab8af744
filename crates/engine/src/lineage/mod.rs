mod traversal;
mod upsert;

pub use traversal::{LineageReport, Subgraph, TraversalEngine};
pub use upsert::{UpsertOutcome, UpsertService};

use std::sync::Arc;

use lineage_common::config::SystemConfig;
use lineage_common::types::{Direction, EdgeDeclaration, LineageEdge, RelationshipType};
use lineage_common::{AssetId, LineageError, Result};

use crate::catalog::AssetCatalog;
use crate::store::EdgeStore;

/// Boundary of the lineage engine: record relationships, answer
/// upstream/downstream questions. Holds no per-request state.
pub struct LineageService {
    store: Arc<dyn EdgeStore>,
    catalog: Arc<dyn AssetCatalog>,
    upserts: UpsertService,
    traversal: TraversalEngine,
    default_depth: u32,
    max_depth: u32,
}

impl LineageService {
    pub fn new(
        store: Arc<dyn EdgeStore>,
        catalog: Arc<dyn AssetCatalog>,
        config: &SystemConfig,
    ) -> Self {
        Self {
            upserts: UpsertService::new(Arc::clone(&store), config.upsert.max_conflict_retries),
            traversal: TraversalEngine::new(
                Arc::clone(&store),
                Arc::clone(&catalog),
                config.traversal.clone(),
            ),
            store,
            catalog,
            default_depth: config.traversal.default_depth,
            max_depth: config.traversal.max_depth,
        }
    }

    /// Create or update the edge `declaration.source -> declaration.target`.
    pub async fn upsert(&self, declaration: EdgeDeclaration) -> Result<UpsertOutcome> {
        self.upserts.upsert(declaration).await
    }

    /// Soft-delete the edge `source -> target`.
    pub async fn deactivate(
        &self,
        source: AssetId,
        target: AssetId,
        actor: &str,
    ) -> Result<LineageEdge> {
        self.upserts.deactivate(source, target, actor).await
    }

    /// Lineage of `asset`. Defaults to both directions, depth from config;
    /// depths above the configured maximum are clamped. `truncated` is set
    /// when the edge cap cut the walk short.
    pub async fn lineage(
        &self,
        asset: AssetId,
        direction: Option<Direction>,
        depth: Option<u32>,
    ) -> Result<LineageReport> {
        if !self.catalog.exists(asset).await? {
            return Err(LineageError::NotFound(format!("Asset {}", asset)));
        }

        let direction = direction.unwrap_or_default();
        let requested = depth.unwrap_or(self.default_depth);
        let depth = requested.min(self.max_depth);
        if depth < requested {
            tracing::debug!(
                asset = %asset,
                requested = requested,
                applied = depth,
                "Clamped lineage depth"
            );
        }

        self.traversal.traverse(asset, direction, depth).await
    }

    /// Active edge counts per relationship type, every type listed.
    pub async fn stats(&self) -> Result<Vec<(RelationshipType, i64)>> {
        let counted = self.store.count_by_relationship_type().await?;
        Ok(RelationshipType::ALL
            .into_iter()
            .map(|kind| {
                let count = counted
                    .iter()
                    .find(|(k, _)| *k == kind)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (kind, count)
            })
            .collect())
    }

    /// Whether the edge store answers.
    pub async fn health_check(&self) -> Result<()> {
        self.store.health_check().await.map_err(LineageError::from)
    }
}
