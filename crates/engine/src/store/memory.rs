use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use lineage_common::types::{validate_strength, LineageEdge, RelationshipType};
use lineage_common::{AssetId, EdgeKey};

use super::{EdgeStore, StoreError};

/// Process-local edge store with the same contract as [`super::PgEdgeStore`].
///
/// Nothing survives a restart; meant for tests and local development.
#[derive(Default)]
pub struct MemoryEdgeStore {
    edges: RwLock<HashMap<EdgeKey, LineageEdge>>,
}

impl MemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored edges, inactive included.
    pub async fn len(&self) -> usize {
        self.edges.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.edges.read().await.is_empty()
    }
}

/// Mirrors the CHECK constraints of the SQL schema.
fn check_constraints(edge: &LineageEdge) -> Result<(), StoreError> {
    validate_strength(edge.strength).map_err(|e| StoreError::Constraint(e.to_string()))
}

#[async_trait]
impl EdgeStore for MemoryEdgeStore {
    async fn find(&self, key: EdgeKey) -> Result<Option<LineageEdge>, StoreError> {
        Ok(self.edges.read().await.get(&key).cloned())
    }

    async fn insert(&self, edge: &LineageEdge) -> Result<(), StoreError> {
        check_constraints(edge)?;
        let mut edges = self.edges.write().await;
        let key = edge.key();
        if edges.contains_key(&key) {
            return Err(StoreError::Conflict(key.to_string()));
        }
        edges.insert(key, edge.clone());
        Ok(())
    }

    async fn update(&self, edge: &LineageEdge) -> Result<(), StoreError> {
        check_constraints(edge)?;
        let mut edges = self.edges.write().await;
        let key = edge.key();
        let stored = edges
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("Edge {}", key)))?;
        let created_at = stored.created_at;
        *stored = edge.clone();
        stored.created_at = created_at;
        Ok(())
    }

    async fn outgoing(&self, source: AssetId) -> Result<Vec<LineageEdge>, StoreError> {
        let edges = self.edges.read().await;
        let mut found: Vec<LineageEdge> = edges
            .values()
            .filter(|e| e.is_active && e.source == source)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.target);
        Ok(found)
    }

    async fn incoming(&self, target: AssetId) -> Result<Vec<LineageEdge>, StoreError> {
        let edges = self.edges.read().await;
        let mut found: Vec<LineageEdge> = edges
            .values()
            .filter(|e| e.is_active && e.target == target)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.source);
        Ok(found)
    }

    async fn set_active(
        &self,
        key: EdgeKey,
        active: bool,
        actor: &str,
    ) -> Result<LineageEdge, StoreError> {
        let mut edges = self.edges.write().await;
        let edge = edges
            .get_mut(&key)
            .ok_or_else(|| StoreError::NotFound(format!("Edge {}", key)))?;
        edge.is_active = active;
        edge.created_by = actor.to_string();
        edge.updated_at = Utc::now();
        Ok(edge.clone())
    }

    async fn count_by_relationship_type(&self) -> Result<Vec<(RelationshipType, i64)>, StoreError> {
        let edges = self.edges.read().await;
        let mut counts: BTreeMap<RelationshipType, i64> = BTreeMap::new();
        for edge in edges.values().filter(|e| e.is_active) {
            *counts.entry(edge.relationship_type).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_common::types::EdgeMetadata;

    fn edge(source: AssetId, target: AssetId) -> LineageEdge {
        LineageEdge::new(
            source,
            target,
            RelationshipType::FeedsInto,
            EdgeMetadata::default(),
            "tester".into(),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_pair() {
        let store = MemoryEdgeStore::new();
        let (a, b) = (AssetId::new(), AssetId::new());

        store.insert(&edge(a, b)).await.unwrap();
        let err = store.insert(&edge(a, b)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // The reverse pair is a different edge.
        store.insert(&edge(b, a)).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_insert_enforces_strength_constraint() {
        let store = MemoryEdgeStore::new();
        let mut e = edge(AssetId::new(), AssetId::new());
        e.strength = 2.0;
        let err = store.insert(&e).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_missing_pair() {
        let store = MemoryEdgeStore::new();
        let err = store
            .update(&edge(AssetId::new(), AssetId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inactive_edges_hidden_from_neighbors() {
        let store = MemoryEdgeStore::new();
        let (a, b, c) = (AssetId::new(), AssetId::new(), AssetId::new());
        store.insert(&edge(a, b)).await.unwrap();
        store.insert(&edge(a, c)).await.unwrap();

        let deactivated = store
            .set_active(EdgeKey::new(a, b), false, "janitor")
            .await
            .unwrap();
        assert!(!deactivated.is_active);
        assert_eq!(deactivated.created_by, "janitor");

        let out = store.outgoing(a).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, c);
        assert!(store.incoming(b).await.unwrap().is_empty());

        // Still findable by key.
        assert!(store.find(EdgeKey::new(a, b)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_count_by_relationship_type() {
        let store = MemoryEdgeStore::new();
        let (a, b, c) = (AssetId::new(), AssetId::new(), AssetId::new());
        store.insert(&edge(a, b)).await.unwrap();
        let mut copy = edge(b, c);
        copy.relationship_type = RelationshipType::CopiesTo;
        store.insert(&copy).await.unwrap();
        let mut inactive = edge(a, c);
        inactive.is_active = false;
        store.insert(&inactive).await.unwrap();

        let counts = store.count_by_relationship_type().await.unwrap();
        assert_eq!(
            counts,
            vec![
                (RelationshipType::FeedsInto, 1),
                (RelationshipType::CopiesTo, 1)
            ]
        );
    }
}
