use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::try_join_all;
use tracing::Instrument;

use lineage_common::config::TraversalLimits;
use lineage_common::types::{AssetStub, Direction, LineageEdge, LineageEntry};
use lineage_common::{AssetId, EdgeKey, LineageError, Result};

use crate::catalog::AssetCatalog;
use crate::store::{EdgeStore, StoreError};

/// One directional walk. `Both` runs one of each.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Downstream,
    Upstream,
}

impl Pass {
    async fn neighbors(
        self,
        store: &dyn EdgeStore,
        node: AssetId,
    ) -> std::result::Result<Vec<LineageEdge>, StoreError> {
        match self {
            Self::Downstream => store.outgoing(node).await,
            Self::Upstream => store.incoming(node).await,
        }
    }

    /// The endpoint the walk moves to when following `edge`.
    fn far_end(self, edge: &LineageEdge) -> AssetId {
        match self {
            Self::Downstream => edge.target,
            Self::Upstream => edge.source,
        }
    }
}

/// Distinct edges found so far, in discovery order, with an optional cap.
struct EdgeSet {
    edges: Vec<LineageEdge>,
    keys: HashSet<EdgeKey>,
    cap: usize,
    truncated: bool,
}

impl EdgeSet {
    fn new(cap: usize) -> Self {
        Self {
            edges: Vec::new(),
            keys: HashSet::new(),
            cap,
            truncated: false,
        }
    }

    /// Record `edge` unless its key is known. Refuses new edges once full.
    fn insert(&mut self, edge: LineageEdge) {
        if self.keys.contains(&edge.key()) {
            return;
        }
        if self.edges.len() >= self.cap {
            self.truncated = true;
            return;
        }
        self.keys.insert(edge.key());
        self.edges.push(edge);
    }
}

/// Edges reachable from one asset, before display resolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subgraph {
    pub edges: Vec<LineageEdge>,
    /// The edge cap stopped the walk early.
    pub truncated: bool,
}

/// Edges reachable from one asset, annotated with endpoint stubs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineageReport {
    pub entries: Vec<LineageEntry>,
    pub truncated: bool,
}

/// Bounded, cycle-safe walk over the edge graph.
///
/// Each call owns its own visited set and result, so concurrent calls never
/// interfere. Reads are not snapshot-consistent: an upsert landing mid-walk
/// may or may not show up in the answer.
pub struct TraversalEngine {
    store: Arc<dyn EdgeStore>,
    catalog: Arc<dyn AssetCatalog>,
    limits: TraversalLimits,
}

impl TraversalEngine {
    pub fn new(
        store: Arc<dyn EdgeStore>,
        catalog: Arc<dyn AssetCatalog>,
        limits: TraversalLimits,
    ) -> Self {
        Self {
            store,
            catalog,
            limits,
        }
    }

    /// Walk from `start` and return every distinct edge within `max_depth`
    /// hops, each with display stubs for both endpoints.
    ///
    /// A node `d` hops away is expanded only while `d < max_depth`, so a
    /// depth of 0 yields nothing. Unknown starting assets yield an empty
    /// report.
    pub async fn traverse(
        &self,
        start: AssetId,
        direction: Direction,
        max_depth: u32,
    ) -> Result<LineageReport> {
        let subgraph = self.walk(start, direction, max_depth).await?;
        let entries = self.annotate(subgraph.edges).await?;

        Ok(LineageReport {
            entries,
            truncated: subgraph.truncated,
        })
    }

    /// Graph expansion only, bounded by the configured wall-clock budget.
    pub async fn walk(
        &self,
        start: AssetId,
        direction: Direction,
        max_depth: u32,
    ) -> Result<Subgraph> {
        let timer = std::time::Instant::now();
        let budget = Duration::from_millis(self.limits.timeout_ms);

        let span = tracing::info_span!("traversal", asset = %start, direction = %direction);
        let expansion = self.expand(start, direction, max_depth).instrument(span);

        let subgraph = tokio::time::timeout(budget, expansion)
            .await
            .map_err(|_| {
                metrics::counter!("lineage.traverse.timeouts").increment(1);
                LineageError::Timeout(format!(
                    "Lineage traversal from {} exceeded {}ms",
                    start, self.limits.timeout_ms
                ))
            })??;

        if subgraph.truncated {
            tracing::warn!(
                asset = %start,
                direction = %direction,
                max_edges = self.limits.max_edges,
                "Lineage traversal hit the edge cap, result truncated"
            );
            metrics::counter!("lineage.traverse.truncated").increment(1);
        }

        tracing::debug!(
            asset = %start,
            direction = %direction,
            depth = max_depth,
            edges = subgraph.edges.len(),
            "Lineage traversal complete"
        );
        metrics::histogram!("lineage.traverse.latency", "direction" => direction.as_str())
            .record(timer.elapsed().as_secs_f64());
        metrics::histogram!("lineage.traverse.edges").record(subgraph.edges.len() as f64);

        Ok(subgraph)
    }

    async fn expand(
        &self,
        start: AssetId,
        direction: Direction,
        max_depth: u32,
    ) -> Result<Subgraph> {
        let mut found = EdgeSet::new(self.limits.max_edges);

        let passes: &[Pass] = match direction {
            Direction::Downstream => &[Pass::Downstream],
            Direction::Upstream => &[Pass::Upstream],
            Direction::Both => &[Pass::Downstream, Pass::Upstream],
        };

        // Passes do not share visited state: reaching a node downstream must
        // not hide it from the upstream walk.
        for &pass in passes {
            self.run_pass(start, pass, max_depth, &mut found).await?;
            if found.truncated {
                break;
            }
        }

        Ok(Subgraph {
            edges: found.edges,
            truncated: found.truncated,
        })
    }

    /// Level-by-level breadth-first walk in one direction.
    ///
    /// Fetches for all nodes of a level run concurrently; `visited` and the
    /// edge set are only touched between levels, in frontier order.
    async fn run_pass(
        &self,
        start: AssetId,
        pass: Pass,
        max_depth: u32,
        found: &mut EdgeSet,
    ) -> Result<()> {
        let mut visited: HashSet<AssetId> = HashSet::from([start]);
        let mut frontier = vec![start];
        let mut depth = 0;

        while !frontier.is_empty() && depth < max_depth {
            let store = self.store.as_ref();
            let levels = try_join_all(frontier.iter().map(|&node| pass.neighbors(store, node)))
                .await?;

            let mut next = Vec::new();
            for edge in levels.into_iter().flatten() {
                let far = pass.far_end(&edge);
                found.insert(edge);
                if found.truncated {
                    return Ok(());
                }
                if visited.insert(far) {
                    next.push(far);
                }
            }

            frontier = next;
            depth += 1;
        }

        Ok(())
    }

    /// Resolve stubs for every endpoint in one catalog call.
    async fn annotate(&self, edges: Vec<LineageEdge>) -> Result<Vec<LineageEntry>> {
        if edges.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids: Vec<AssetId> = edges
            .iter()
            .flat_map(|e| [e.source, e.target])
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort();

        let stubs: HashMap<AssetId, AssetStub> = self.catalog.resolve(&ids).await?;
        let stub_for = |id: AssetId| {
            stubs
                .get(&id)
                .cloned()
                .unwrap_or_else(|| AssetStub::bare(id))
        };

        Ok(edges
            .into_iter()
            .map(|edge| LineageEntry {
                source: stub_for(edge.source),
                target: stub_for(edge.target),
                relationship: edge,
            })
            .collect())
    }
}
