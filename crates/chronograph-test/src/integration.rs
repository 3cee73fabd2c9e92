//! End-to-end Integration Test Suite
//!
//! Tests that verify the complete synchronization flow:
//! - Record-based conversion and its inverse
//! - Shared-file identity against the automatic fallback
//! - Sync files read from disk during graph construction
//! - Multi-hop composition and symmetry
//! - Node replacement across rebuilds

use std::collections::BTreeMap;

use chronograph_core::{ChronoResult, ClockType, EpochNode, NodeIndex, TimeMapping};
use chronograph_sync::{
    FileFind, FileMatch, InternalEdge, MappingRecord, MappingRecordSet, SyncGraph,
};

// ============================================================================
// FIXTURES
// ============================================================================

/// A built graph with its nodes addressable by label
pub struct Fixture {
    pub graph: SyncGraph,
    nodes: BTreeMap<&'static str, NodeIndex>,
}

impl Fixture {
    fn new(graph: SyncGraph) -> Self {
        Fixture {
            graph,
            nodes: BTreeMap::new(),
        }
    }

    fn add(&mut self, label: &'static str, node: EpochNode) -> ChronoResult<NodeIndex> {
        let index = self.graph.add_epoch(node)?;
        self.nodes.insert(label, index);
        Ok(index)
    }

    /// Node added under `label`
    pub fn node(&self, label: &str) -> Option<NodeIndex> {
        self.nodes.get(label).copied()
    }
}

/// device1/A and device2/B on local clocks related by an explicit record
/// (scale 1, shift 5); device3/C on absolute time with no relationship.
pub fn three_device_scenario() -> ChronoResult<Fixture> {
    let mut records = MappingRecordSet::new();
    records.insert(
        MappingRecord::new("device1", "device2", TimeMapping::new(1.0, 5.0)?)
            .with_files(["/rec/device1/a.rhd", "/rec/device2/b.smr"]),
    )?;

    let mut graph = SyncGraph::new();
    graph.add_rule(
        FileFind::new("device1", "device2")
            .with_records(records)
            .with_sync_file_name(None),
    )?;

    let mut fixture = Fixture::new(graph);
    fixture.add(
        "A",
        EpochNode::new("device1", "epoch-A", ClockType::DevLocalTime)
            .with_files(["/rec/device1/a.rhd"]),
    )?;
    fixture.add(
        "B",
        EpochNode::new("device2", "epoch-B", ClockType::DevLocalTime)
            .with_files(["/rec/device2/b.smr"]),
    )?;
    fixture.add("C", EpochNode::new("device3", "epoch-C", ClockType::Utc))?;
    Ok(fixture)
}

/// device1/X and device2/Y share three files; only the shared-file rule
/// relates them.
pub fn shared_files_scenario() -> ChronoResult<Fixture> {
    let shared = ["/rec/s1/trial.ns5", "/rec/s1/trial.nev", "/rec/s1/trial.ccf"];

    let mut graph = SyncGraph::new();
    graph.add_rule(FileMatch::default())?;

    let mut fixture = Fixture::new(graph);
    fixture.add(
        "X",
        EpochNode::new("device1", "epoch-X", ClockType::DevLocalTime)
            .with_files(shared)
            .with_files(["/rec/s1/device1.log"]),
    )?;
    fixture.add(
        "Y",
        EpochNode::new("device2", "epoch-Y", ClockType::DevLocalTime).with_files(shared),
    )?;
    Ok(fixture)
}

/// Chain of epochs on one device linked by internal edges, one per mapping
pub fn mapping_chain(mappings: &[TimeMapping]) -> ChronoResult<(SyncGraph, Vec<NodeIndex>)> {
    let mut graph = SyncGraph::new();
    let nodes = (0..=mappings.len())
        .map(|i| EpochNode::new("rig", format!("segment{i}"), ClockType::DevLocalTime))
        .collect();
    let edges = mappings
        .iter()
        .enumerate()
        .map(|(i, m)| InternalEdge::new(i, i + 1, 1.0, *m))
        .collect();
    let added = graph.manual_add_nodes(nodes, edges)?;
    Ok((graph, added))
}
