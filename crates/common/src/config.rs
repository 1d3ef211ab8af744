use serde::{Deserialize, Serialize};

/// Top-level system configuration, deserialized from system.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SystemConfig {
    pub traversal: TraversalLimits,
    pub upsert: UpsertConfig,
    pub store: StoreConfig,
    pub catalog: CatalogConfig,
}

/// Bounds applied to every lineage traversal.
///
/// `max_depth` alone does not bound breadth, hence the edge and time caps.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraversalLimits {
    /// Depth used when the caller does not pass one.
    pub default_depth: u32,
    /// Requested depths above this are clamped.
    pub max_depth: u32,
    /// Stop collecting once this many distinct edges were found.
    pub max_edges: usize,
    /// Wall-clock budget for one traversal in milliseconds.
    pub timeout_ms: u64,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            default_depth: 3,
            max_depth: 10,
            max_edges: 10_000,
            timeout_ms: 5_000,
        }
    }
}

/// Upsert protocol tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpsertConfig {
    /// Times a lost insert race is retried as an update before giving up.
    pub max_conflict_retries: u32,
}

impl Default for UpsertConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
        }
    }
}

/// Which edge store backs the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Process-local, non-durable. Development only.
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// PostgreSQL pool size.
    pub max_connections: u32,
}

/// How asset existence and display stubs are resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Call the external catalog service over HTTP.
    #[default]
    Http,
    /// Treat every asset as existing with an id-only stub.
    Static,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub mode: CatalogMode,
    /// Per-request timeout against the catalog service.
    pub request_timeout_ms: u64,
}
