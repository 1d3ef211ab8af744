use lineage_common::config::SystemConfig;

use super::loader::ConfigError;

/// Validate the system configuration.
///
/// Collects every problem instead of stopping at the first, so one failed
/// start shows the whole list.
pub fn validate(config: &SystemConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_traversal(config, &mut errors);
    validate_upsert(config, &mut errors);
    validate_store(config, &mut errors);
    validate_catalog(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.join("; ")))
    }
}

fn validate_traversal(config: &SystemConfig, errors: &mut Vec<String>) {
    let t = &config.traversal;

    if t.default_depth == 0 {
        errors.push("traversal.default_depth must be > 0".into());
    }
    if t.max_depth == 0 {
        errors.push("traversal.max_depth must be > 0".into());
    }
    if t.default_depth > t.max_depth {
        errors.push("traversal.default_depth must be <= traversal.max_depth".into());
    }
    if t.max_edges == 0 {
        errors.push("traversal.max_edges must be > 0".into());
    }
    if t.timeout_ms == 0 {
        errors.push("traversal.timeout_ms must be > 0".into());
    }
}

fn validate_upsert(config: &SystemConfig, errors: &mut Vec<String>) {
    if config.upsert.max_conflict_retries > 10 {
        errors.push("upsert.max_conflict_retries must be <= 10".into());
    }
}

fn validate_store(config: &SystemConfig, errors: &mut Vec<String>) {
    if config.store.max_connections == 0 {
        errors.push("store.max_connections must be > 0".into());
    }
}

fn validate_catalog(config: &SystemConfig, errors: &mut Vec<String>) {
    if config.catalog.request_timeout_ms == 0 {
        errors.push("catalog.request_timeout_ms must be > 0".into());
    }
}
