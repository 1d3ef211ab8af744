use std::collections::HashMap;

use async_trait::async_trait;

use lineage_common::types::AssetStub;
use lineage_common::{AssetId, Result};

use super::AssetCatalog;

/// Catalog backed by a fixed in-process map.
///
/// An open catalog accepts every id and answers with bare stubs for
/// unknown ones; a closed catalog only knows what it was given.
#[derive(Default)]
pub struct StaticCatalog {
    assets: HashMap<AssetId, AssetStub>,
    open: bool,
}

impl StaticCatalog {
    /// Every asset exists.
    pub fn open() -> Self {
        Self {
            assets: HashMap::new(),
            open: true,
        }
    }

    /// Only the listed assets exist.
    pub fn with_assets(assets: impl IntoIterator<Item = AssetStub>) -> Self {
        Self {
            assets: assets.into_iter().map(|a| (a.id, a)).collect(),
            open: false,
        }
    }
}

#[async_trait]
impl AssetCatalog for StaticCatalog {
    async fn exists(&self, id: AssetId) -> Result<bool> {
        Ok(self.open || self.assets.contains_key(&id))
    }

    async fn resolve(&self, ids: &[AssetId]) -> Result<HashMap<AssetId, AssetStub>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.assets.get(id).map(|stub| (*id, stub.clone())))
            .collect())
    }
}
