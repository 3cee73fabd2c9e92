//! Per-session access to a synchronization graph
//!
//! One writer builds the graph inside [`Session::build`]; afterwards any
//! number of threads may convert times concurrently. Each session owns its
//! own graph.

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::info;

use chronograph_core::{ChronoResult, NodeFilter, NodeIndex};

use crate::{ConversionPath, GraphConfig, SyncGraph};

/// Analysis session owning one synchronization graph
#[derive(Debug)]
pub struct Session {
    id: String,
    graph: RwLock<SyncGraph>,
}

impl Session {
    /// Empty session with the default graph configuration
    pub fn new(id: impl Into<String>) -> Self {
        Session {
            id: id.into(),
            graph: RwLock::new(SyncGraph::new()),
        }
    }

    /// Empty session, rejecting an inconsistent cost policy
    pub fn with_config(id: impl Into<String>, config: GraphConfig) -> ChronoResult<Self> {
        Ok(Session {
            id: id.into(),
            graph: RwLock::new(SyncGraph::with_config(config)?),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run a construction step with exclusive access to the graph
    pub fn build<R>(&self, f: impl FnOnce(&mut SyncGraph) -> ChronoResult<R>) -> ChronoResult<R> {
        let mut graph = self.graph.write();
        let result = f(&mut graph)?;
        info!(
            session = %self.id,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "session graph updated"
        );
        Ok(result)
    }

    /// Shared read access for queries not covered below
    pub fn read(&self) -> RwLockReadGuard<'_, SyncGraph> {
        self.graph.read()
    }

    pub fn time_convert(&self, from: NodeIndex, to: NodeIndex, t: f64) -> ChronoResult<f64> {
        self.graph.read().time_convert(from, to, t)
    }

    pub fn conversion_path(&self, from: NodeIndex, to: NodeIndex) -> ChronoResult<ConversionPath> {
        self.graph.read().conversion_path(from, to)
    }

    pub fn find_node_index(&self, filter: &NodeFilter) -> Vec<NodeIndex> {
        self.graph.read().find_node_index(filter)
    }
}
