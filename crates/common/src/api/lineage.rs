use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LineageError;
use crate::ids::AssetId;
use crate::types::{validate_strength, EdgeDeclaration, EdgeMetadata, RelationshipType};

/// POST /lineage request.
///
/// Identifiers and the relationship type arrive as strings so that bad
/// values become validation errors rather than body-shape rejections.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLineageRequest {
    pub source_asset_id: String,
    pub target_asset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EdgeMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    pub created_by: String,
}

impl TryFrom<UpsertLineageRequest> for EdgeDeclaration {
    type Error = LineageError;

    fn try_from(request: UpsertLineageRequest) -> Result<Self, Self::Error> {
        let source: AssetId = request.source_asset_id.parse()?;
        let target: AssetId = request.target_asset_id.parse()?;
        let relationship_type = request
            .relationship_type
            .as_deref()
            .map(str::parse::<RelationshipType>)
            .transpose()?
            .unwrap_or_default();
        if let Some(strength) = request.strength {
            validate_strength(strength)?;
        }

        let declaration = EdgeDeclaration {
            source,
            target,
            relationship_type,
            metadata: request.metadata.unwrap_or_default(),
            strength: request.strength,
            created_by: request.created_by,
        };
        declaration.validate()?;
        Ok(declaration)
    }
}

/// Query string of GET /assets/{assetId}/lineage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageQueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
}

/// Query string of DELETE /lineage/{source}/{target}.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeactivateParams {
    pub actor: String,
}

/// GET /lineage/stats response: active edge counts per relationship type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineageStatsResponse {
    pub counts: BTreeMap<String, i64>,
    pub total: i64,
}

/// Error body returned by every non-2xx lineage response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(relationship_type: Option<&str>, strength: Option<f64>) -> UpsertLineageRequest {
        UpsertLineageRequest {
            source_asset_id: AssetId::new().to_string(),
            target_asset_id: AssetId::new().to_string(),
            relationship_type: relationship_type.map(String::from),
            metadata: None,
            strength,
            created_by: "etl-bot".into(),
        }
    }

    #[test]
    fn test_request_defaults_to_feeds_into() {
        let declaration = EdgeDeclaration::try_from(request(None, None)).unwrap();
        assert_eq!(declaration.relationship_type, RelationshipType::FeedsInto);
        assert_eq!(declaration.strength, None);
    }

    #[test]
    fn test_request_rejects_unknown_type() {
        let err = EdgeDeclaration::try_from(request(Some("feeds"), None)).unwrap_err();
        assert!(matches!(err, LineageError::Validation(_)));
    }

    #[test]
    fn test_request_rejects_bad_strength() {
        let err = EdgeDeclaration::try_from(request(None, Some(1.5))).unwrap_err();
        assert!(matches!(err, LineageError::Validation(_)));
    }

    #[test]
    fn test_request_rejects_malformed_id() {
        let mut req = request(None, None);
        req.source_asset_id = "asset-42".into();
        assert!(EdgeDeclaration::try_from(req).is_err());
    }

    #[test]
    fn test_request_wire_names() {
        let req: UpsertLineageRequest = serde_json::from_value(json!({
            "sourceAssetId": AssetId::new().to_string(),
            "targetAssetId": AssetId::new().to_string(),
            "relationshipType": "copies_to",
            "metadata": {"frequency": "weekly"},
            "createdBy": "bob"
        }))
        .unwrap();
        let declaration = EdgeDeclaration::try_from(req).unwrap();
        assert_eq!(declaration.relationship_type, RelationshipType::CopiesTo);
        assert_eq!(declaration.created_by, "bob");
    }
}
