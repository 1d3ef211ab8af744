use serde::{Deserialize, Serialize};

use crate::ids::AssetId;

/// Display projection of a catalog asset.
///
/// The lineage engine never owns assets; stubs are resolved from the
/// external catalog after a traversal has finished.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetStub {
    pub id: AssetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Loose label from the catalog ("table", "report", "api", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
}

impl AssetStub {
    /// Stub for an asset the catalog could not describe.
    pub fn bare(id: AssetId) -> Self {
        Self {
            id,
            name: None,
            asset_type: None,
        }
    }
}
