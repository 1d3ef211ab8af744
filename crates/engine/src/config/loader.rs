use std::path::{Path, PathBuf};

use lineage_common::config::SystemConfig;
use lineage_common::LineageError;

use super::validation;

/// Complete engine configuration loaded from the config directory.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Parsed system.toml.
    pub system: SystemConfig,
}

/// Load all configuration from the given config directory.
///
/// Fails loudly with clear error messages if anything is misconfigured.
/// The engine refuses to start on validation failure.
pub fn load_config(config_dir: &Path) -> Result<EngineConfig, ConfigError> {
    tracing::info!(config_dir = %config_dir.display(), "Loading configuration");

    let system_path = config_dir.join("system.toml");
    let system = load_system_config(&system_path)?;

    let config = EngineConfig { system };

    validation::validate(&config.system)?;

    tracing::info!(
        default_depth = config.system.traversal.default_depth,
        max_depth = config.system.traversal.max_depth,
        store_backend = ?config.system.store.backend,
        catalog_mode = ?config.system.catalog.mode,
        "Configuration loaded successfully"
    );

    Ok(config)
}

fn load_system_config(path: &Path) -> Result<SystemConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_system_config(&content).map_err(|detail| ConfigError::Parse {
        path: path.to_path_buf(),
        detail,
    })
}

pub(crate) fn parse_system_config(content: &str) -> Result<SystemConfig, String> {
    toml::from_str(content).map_err(|e| e.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl From<ConfigError> for LineageError {
    fn from(e: ConfigError) -> Self {
        LineageError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_shipped_config() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
        let config = load_config(&dir).unwrap();
        assert_eq!(config.system.traversal.default_depth, 3);
    }

    #[test]
    fn test_missing_directory() {
        let err = load_config(Path::new("/nonexistent/lineage-config")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_parse_error_names_detail() {
        let err = parse_system_config("[traversal]\ndefault_depth = \"three\"").unwrap_err();
        assert!(!err.is_empty());
    }
}
