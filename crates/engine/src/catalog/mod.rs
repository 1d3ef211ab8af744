mod http;
mod static_catalog;

pub use http::HttpCatalog;
pub use static_catalog::StaticCatalog;

use std::collections::HashMap;

use async_trait::async_trait;

use lineage_common::types::AssetStub;
use lineage_common::{AssetId, Result};

/// The external asset catalog, seen only through identifiers.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Whether the catalog knows `id`.
    async fn exists(&self, id: AssetId) -> Result<bool>;

    /// Batched display lookup. Unknown ids are absent from the map.
    async fn resolve(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, AssetStub>>;
}
