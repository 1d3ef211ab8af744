use std::sync::Arc;

use chrono::Utc;

use lineage_common::types::{EdgeDeclaration, LineageEdge};
use lineage_common::{AssetId, EdgeKey, LineageError, Result};

use crate::store::{EdgeStore, StoreError};

/// Result of an upsert: the stored edge and whether it was new.
#[derive(Clone, Debug, PartialEq)]
pub struct UpsertOutcome {
    pub edge: LineageEdge,
    pub created: bool,
}

/// Creates or updates the single edge of an ordered asset pair.
///
/// The protocol is read-then-write without a transaction. When two callers
/// race to create the same pair, the store rejects the loser's insert and
/// the loser retries as an update.
pub struct UpsertService {
    store: Arc<dyn EdgeStore>,
    max_conflict_retries: u32,
}

impl UpsertService {
    pub fn new(store: Arc<dyn EdgeStore>, max_conflict_retries: u32) -> Self {
        Self {
            store,
            max_conflict_retries,
        }
    }

    pub async fn upsert(&self, declaration: EdgeDeclaration) -> Result<UpsertOutcome> {
        declaration.validate()?;
        let key = declaration.key();
        let start = std::time::Instant::now();

        if key.is_self_loop() {
            tracing::debug!(asset = %key.source, "Declaring self-loop lineage edge");
        }

        let mut conflicts = 0;
        let outcome = loop {
            match self.store.find(key).await? {
                Some(existing) => {
                    let edge = apply_declaration(existing, &declaration);
                    self.store.update(&edge).await?;
                    break UpsertOutcome {
                        edge,
                        created: false,
                    };
                }
                None => {
                    let edge = new_edge(&declaration);
                    match self.store.insert(&edge).await {
                        Ok(()) => break UpsertOutcome {
                            edge,
                            created: true,
                        },
                        Err(StoreError::Conflict(detail))
                            if conflicts < self.max_conflict_retries =>
                        {
                            conflicts += 1;
                            tracing::warn!(
                                edge = %key,
                                attempt = conflicts,
                                detail = %detail,
                                "Lost edge creation race, retrying as update"
                            );
                            metrics::counter!("lineage.upsert.conflict_retries").increment(1);
                        }
                        Err(StoreError::Conflict(detail)) => {
                            return Err(LineageError::Conflict(format!(
                                "Edge {} still conflicting after {} retries: {}",
                                key, conflicts, detail
                            )));
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        };

        tracing::info!(
            edge = %key,
            relationship_type = %outcome.edge.relationship_type,
            created = outcome.created,
            actor = %outcome.edge.created_by,
            "Lineage edge upserted"
        );
        metrics::histogram!("lineage.upsert.latency").record(start.elapsed().as_secs_f64());

        Ok(outcome)
    }

    /// Soft-delete the edge of a pair. The row stays; traversal stops seeing it.
    pub async fn deactivate(
        &self,
        source: AssetId,
        target: AssetId,
        actor: &str,
    ) -> Result<LineageEdge> {
        if actor.trim().is_empty() {
            return Err(LineageError::Validation("actor must not be empty".into()));
        }

        let key = EdgeKey::new(source, target);
        let edge = self.store.set_active(key, false, actor).await?;

        tracing::info!(edge = %key, actor = actor, "Lineage edge deactivated");
        Ok(edge)
    }
}

fn new_edge(declaration: &EdgeDeclaration) -> LineageEdge {
    let mut edge = LineageEdge::new(
        declaration.source,
        declaration.target,
        declaration.relationship_type,
        declaration.metadata.clone(),
        declaration.created_by.clone(),
    );
    if let Some(strength) = declaration.strength {
        edge.strength = strength;
    }
    edge
}

/// Later declarations win: the type is replaced, metadata shallow-merged,
/// and a re-declared inactive edge comes back to life.
fn apply_declaration(mut edge: LineageEdge, declaration: &EdgeDeclaration) -> LineageEdge {
    edge.relationship_type = declaration.relationship_type;
    edge.metadata.merge(declaration.metadata.clone());
    if let Some(strength) = declaration.strength {
        edge.strength = strength;
    }
    edge.created_by = declaration.created_by.clone();
    edge.is_active = true;
    edge.updated_at = Utc::now();
    edge
}
