use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LineageError;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = LineageError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    LineageError::Validation(format!(
                        "Invalid {} '{}': {}",
                        stringify!($name),
                        s,
                        e
                    ))
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    AssetId,
    "Opaque identifier of an asset registered in the external catalog."
);

/// Identity of a lineage edge: the ordered (source, target) pair.
///
/// `(A, B)` and `(B, A)` are different keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: AssetId,
    pub target: AssetId,
}

impl EdgeKey {
    pub fn new(source: AssetId, target: AssetId) -> Self {
        Self { source, target }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.source, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_id_parse() {
        let id = AssetId::new();
        let parsed: AssetId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_asset_id_rejects_malformed() {
        let err = "not-a-uuid".parse::<AssetId>().unwrap_err();
        assert!(matches!(err, LineageError::Validation(_)));
    }

    #[test]
    fn test_edge_key_is_ordered() {
        let a = AssetId::new();
        let b = AssetId::new();
        assert_ne!(EdgeKey::new(a, b), EdgeKey::new(b, a));
        assert_eq!(EdgeKey::new(a, b).to_string(), format!("{}-{}", a, b));
        assert!(EdgeKey::new(a, a).is_self_loop());
    }
}
