use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use lineage_common::types::{EdgeMetadata, LineageEdge, RelationshipType};
use lineage_common::{AssetId, EdgeKey};

use super::{EdgeStore, StoreError};

const EDGE_COLUMNS: &str = "source_id, target_id, relationship_type, strength, metadata, \
                            is_active, created_by, created_at, updated_at";

/// PostgreSQL-backed edge store.
///
/// Pair uniqueness is the table's primary key; the two single-column
/// indexes serve the downstream and upstream walks.
pub struct PgEdgeStore {
    pool: PgPool,
}

impl PgEdgeStore {
    /// Connect to PostgreSQL and return a store with a connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.health_check().await?;
        tracing::info!("PostgreSQL connection established");

        Ok(store)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        tracing::info!("Running PostgreSQL migrations");

        sqlx::migrate!("src/store/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("PostgreSQL migrations complete");
        Ok(())
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn neighbors(
        &self,
        column: &str,
        order_by: &str,
        id: AssetId,
    ) -> Result<Vec<LineageEdge>, StoreError> {
        let start = std::time::Instant::now();

        let sql = format!(
            "SELECT {} FROM lineage_edges WHERE {} = $1 AND is_active ORDER BY {}",
            EDGE_COLUMNS, column, order_by
        );
        let rows = sqlx::query_as::<_, EdgeRow>(&sql)
            .bind(id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        metrics::histogram!("lineage.store.query.latency", "query" => "neighbors")
            .record(start.elapsed().as_secs_f64());

        rows.into_iter().map(LineageEdge::try_from).collect()
    }
}

#[async_trait]
impl EdgeStore for PgEdgeStore {
    async fn find(&self, key: EdgeKey) -> Result<Option<LineageEdge>, StoreError> {
        let sql = format!(
            "SELECT {} FROM lineage_edges WHERE source_id = $1 AND target_id = $2",
            EDGE_COLUMNS
        );
        let row = sqlx::query_as::<_, EdgeRow>(&sql)
            .bind(key.source.0)
            .bind(key.target.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(LineageEdge::try_from).transpose()
    }

    async fn insert(&self, edge: &LineageEdge) -> Result<(), StoreError> {
        let metadata = serde_json::to_value(&edge.metadata)
            .map_err(|e| StoreError::Query(format!("Unserializable metadata: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO lineage_edges (source_id, target_id, relationship_type, strength,
                                       metadata, is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(edge.source.0)
        .bind(edge.target.0)
        .bind(edge.relationship_type.as_db_str())
        .bind(edge.strength)
        .bind(&metadata)
        .bind(edge.is_active)
        .bind(&edge.created_by)
        .bind(edge.created_at)
        .bind(edge.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, edge: &LineageEdge) -> Result<(), StoreError> {
        let metadata = serde_json::to_value(&edge.metadata)
            .map_err(|e| StoreError::Query(format!("Unserializable metadata: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE lineage_edges
            SET relationship_type = $3, strength = $4, metadata = $5,
                is_active = $6, created_by = $7, updated_at = $8
            WHERE source_id = $1 AND target_id = $2
            "#,
        )
        .bind(edge.source.0)
        .bind(edge.target.0)
        .bind(edge.relationship_type.as_db_str())
        .bind(edge.strength)
        .bind(&metadata)
        .bind(edge.is_active)
        .bind(&edge.created_by)
        .bind(edge.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Edge {}", edge.key())));
        }
        Ok(())
    }

    async fn outgoing(&self, source: AssetId) -> Result<Vec<LineageEdge>, StoreError> {
        self.neighbors("source_id", "target_id", source).await
    }

    async fn incoming(&self, target: AssetId) -> Result<Vec<LineageEdge>, StoreError> {
        self.neighbors("target_id", "source_id", target).await
    }

    async fn set_active(
        &self,
        key: EdgeKey,
        active: bool,
        actor: &str,
    ) -> Result<LineageEdge, StoreError> {
        let sql = format!(
            "UPDATE lineage_edges SET is_active = $3, created_by = $4, updated_at = now() \
             WHERE source_id = $1 AND target_id = $2 RETURNING {}",
            EDGE_COLUMNS
        );
        let row = sqlx::query_as::<_, EdgeRow>(&sql)
            .bind(key.source.0)
            .bind(key.target.0)
            .bind(active)
            .bind(actor)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| StoreError::NotFound(format!("Edge {}", key)))?;

        row.try_into()
    }

    async fn count_by_relationship_type(&self) -> Result<Vec<(RelationshipType, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT relationship_type, COUNT(*) AS count
            FROM lineage_edges
            WHERE is_active
            GROUP BY relationship_type
            ORDER BY relationship_type
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|(kind, count)| Ok((parse_relationship_type(&kind)?, count)))
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }
}

/// Classify driver errors: lost insert races become conflicts, broken
/// connections stay distinguishable from bad queries.
fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_check_violation() => {
            StoreError::Constraint(db.message().to_string())
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Connection(e.to_string()),
        _ => StoreError::Query(e.to_string()),
    }
}

fn parse_relationship_type(s: &str) -> Result<RelationshipType, StoreError> {
    s.parse()
        .map_err(|e: lineage_common::LineageError| StoreError::Query(e.to_string()))
}

/// Internal row type for sqlx deserialization.
#[derive(sqlx::FromRow)]
struct EdgeRow {
    source_id: Uuid,
    target_id: Uuid,
    relationship_type: String,
    strength: f64,
    metadata: serde_json::Value,
    is_active: bool,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EdgeRow> for LineageEdge {
    type Error = StoreError;

    fn try_from(row: EdgeRow) -> Result<Self, Self::Error> {
        // Fail rather than default: upserts merge into what this returns.
        let metadata: EdgeMetadata = serde_json::from_value(row.metadata).map_err(|e| {
            tracing::error!(
                source_id = %row.source_id,
                target_id = %row.target_id,
                error = %e,
                "Unreadable edge metadata"
            );
            StoreError::Query(format!(
                "Unreadable metadata on edge {}-{}: {}",
                row.source_id, row.target_id, e
            ))
        })?;

        Ok(Self {
            source: AssetId::from_uuid(row.source_id),
            target: AssetId::from_uuid(row.target_id),
            relationship_type: parse_relationship_type(&row.relationship_type)?,
            strength: row.strength,
            metadata,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
