use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LineageError;
use crate::ids::{AssetId, EdgeKey};

/// Default confidence assigned to a newly declared relationship.
pub const DEFAULT_STRENGTH: f64 = 0.8;

/// Closed set of relationship kinds between two assets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    FeedsInto,
    DerivedFrom,
    TransformsTo,
    AggregatesTo,
    CopiesTo,
    References,
    DependsOn,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 7] = [
        Self::FeedsInto,
        Self::DerivedFrom,
        Self::TransformsTo,
        Self::AggregatesTo,
        Self::CopiesTo,
        Self::References,
        Self::DependsOn,
    ];

    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::FeedsInto => "feeds_into",
            Self::DerivedFrom => "derived_from",
            Self::TransformsTo => "transforms_to",
            Self::AggregatesTo => "aggregates_to",
            Self::CopiesTo => "copies_to",
            Self::References => "references",
            Self::DependsOn => "depends_on",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for RelationshipType {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_db_str() == s)
            .ok_or_else(|| {
                LineageError::Validation(format!(
                    "Unknown relationship type '{}'. Expected one of: {}",
                    s,
                    Self::ALL
                        .iter()
                        .map(|t| t.as_db_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// How often data moves along an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    RealTime,
    Batch,
    Daily,
    Weekly,
    Monthly,
    OnDemand,
}

/// Descriptive bag attached to an edge.
///
/// Recognized fields are typed; anything else lands in `extra` and
/// round-trips untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_rules: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical_notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EdgeMetadata {
    /// Shallow merge: every field present in `incoming` replaces ours,
    /// absent fields are kept. Lists are replaced whole, not concatenated.
    pub fn merge(&mut self, incoming: EdgeMetadata) {
        if incoming.transformation_type.is_some() {
            self.transformation_type = incoming.transformation_type;
        }
        if incoming.frequency.is_some() {
            self.frequency = incoming.frequency;
        }
        if incoming.last_updated.is_some() {
            self.last_updated = incoming.last_updated;
        }
        if incoming.data_volume.is_some() {
            self.data_volume = incoming.data_volume;
        }
        if incoming.quality_score.is_some() {
            self.quality_score = incoming.quality_score;
        }
        if incoming.business_rules.is_some() {
            self.business_rules = incoming.business_rules;
        }
        if incoming.technical_notes.is_some() {
            self.technical_notes = incoming.technical_notes;
        }
        self.extra.extend(incoming.extra);
    }
}

/// A directed, typed relationship: data flows from `source` to `target`.
///
/// At most one edge exists per ordered (source, target) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageEdge {
    pub source: AssetId,
    pub target: AssetId,
    #[serde(default)]
    pub relationship_type: RelationshipType,
    /// Confidence in [0, 1]. Not used by traversal yet.
    pub strength: f64,
    #[serde(default)]
    pub metadata: EdgeMetadata,
    /// Soft-delete flag. Inactive edges are invisible to traversal.
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LineageEdge {
    pub fn new(
        source: AssetId,
        target: AssetId,
        relationship_type: RelationshipType,
        metadata: EdgeMetadata,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            source,
            target,
            relationship_type,
            strength: DEFAULT_STRENGTH,
            metadata,
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target)
    }

    /// Check the field invariants the store also enforces.
    pub fn validate(&self) -> Result<(), LineageError> {
        validate_strength(self.strength)?;
        if self.created_by.trim().is_empty() {
            return Err(LineageError::Validation("createdBy must not be empty".into()));
        }
        Ok(())
    }
}

/// A caller's statement that `source` relates to `target`.
///
/// Input to the upsert protocol; `strength: None` keeps the stored value
/// (or the default for a new edge).
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeDeclaration {
    pub source: AssetId,
    pub target: AssetId,
    pub relationship_type: RelationshipType,
    pub metadata: EdgeMetadata,
    pub strength: Option<f64>,
    pub created_by: String,
}

impl EdgeDeclaration {
    pub fn new(source: AssetId, target: AssetId, created_by: impl Into<String>) -> Self {
        Self {
            source,
            target,
            relationship_type: RelationshipType::default(),
            metadata: EdgeMetadata::default(),
            strength: None,
            created_by: created_by.into(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.source, self.target)
    }

    pub fn validate(&self) -> Result<(), LineageError> {
        if let Some(strength) = self.strength {
            validate_strength(strength)?;
        }
        if self.created_by.trim().is_empty() {
            return Err(LineageError::Validation("createdBy must not be empty".into()));
        }
        Ok(())
    }
}

pub fn validate_strength(strength: f64) -> Result<(), LineageError> {
    if strength.is_finite() && (0.0..=1.0).contains(&strength) {
        Ok(())
    } else {
        Err(LineageError::Validation(format!(
            "strength must be between 0.0 and 1.0, got {}",
            strength
        )))
    }
}
