use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LineageError;
use crate::types::{AssetStub, LineageEdge};

/// Which way to walk edges from the starting asset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges backwards (`target == node`): who feeds this asset.
    Upstream,
    /// Follow edges forwards (`source == node`): what this asset feeds.
    Downstream,
    #[default]
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upstream" => Ok(Self::Upstream),
            "downstream" => Ok(Self::Downstream),
            "both" => Ok(Self::Both),
            other => Err(LineageError::Validation(format!(
                "Invalid direction: '{}'. Use 'upstream', 'downstream', or 'both'.",
                other
            ))),
        }
    }
}

/// One edge of a lineage answer, with display stubs for both endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub source: AssetStub,
    pub target: AssetStub,
    pub relationship: LineageEdge,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse() {
        assert_eq!("upstream".parse::<Direction>().unwrap(), Direction::Upstream);
        assert_eq!(
            "downstream".parse::<Direction>().unwrap(),
            Direction::Downstream
        );
        assert_eq!("both".parse::<Direction>().unwrap(), Direction::Both);
        assert!("sideways".parse::<Direction>().is_err());
        assert_eq!(Direction::default(), Direction::Both);
    }
}
