use serde::{Deserialize, Serialize};

use crate::ids::AssetId;
use crate::types::AssetStub;

/// POST /assets/resolve request to the external catalog.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResolveAssetsRequest {
    pub ids: Vec<AssetId>,
}

/// POST /assets/resolve response. Unknown ids are simply absent.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResolveAssetsResponse {
    #[serde(default)]
    pub assets: Vec<AssetStub>,
}
