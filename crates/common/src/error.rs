use thiserror::Error;

/// Top-level error type for lineage operations.
#[derive(Debug, Error)]
pub enum LineageError {
    // --- Dependency errors (request cannot be served) ---
    #[error("PostgreSQL error: {0}")]
    Postgres(String),

    #[error("Asset catalog error: {0}")]
    Catalog(String),

    // --- Operational errors ---
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("{0}")]
    Internal(String),
}

impl LineageError {
    /// Whether a backing dependency is unreachable (surfaced as service-unavailable).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Postgres(_) | Self::Catalog(_))
    }
}

/// Result type alias for lineage operations.
pub type Result<T> = std::result::Result<T, LineageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_covers_backing_services_only() {
        assert!(LineageError::Postgres("pool closed".into()).is_unavailable());
        assert!(LineageError::Catalog("connection refused".into()).is_unavailable());
        assert!(!LineageError::Timeout("5000ms".into()).is_unavailable());
        assert!(!LineageError::Validation("bad id".into()).is_unavailable());
    }
}
