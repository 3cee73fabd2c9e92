//! Synchronization graph - epoch nodes and weighted time-mapping edges
//!
//! Nodes live in an append-only arena. Edges are stored in both directions,
//! the reverse carrying the inverted mapping. Each batch of epochs goes
//! through three passes:
//! 1. Insert nodes and the batch's own internal edges
//! 2. Automatic pass: identity edges between comparable clock types
//! 3. Rule pass: every registered rule on every eligible new pair
//!
//! The cheapest evidence always wins an edge; on equal cost the edge that
//! was stored first is kept.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use chronograph_core::{
    ChronoError, ChronoResult, EpochNode, NodeFilter, NodeIndex, NodeKey, TimeMapping,
};

use crate::{GraphConfig, SyncRule};

/// Evidence an edge was derived from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeOrigin {
    /// Declared by the device itself for its own epochs
    Internal,
    /// Identity between comparable clock types
    Automatic,
    /// Produced by the rule at this registration position
    Rule(usize),
}

/// Directed edge: converts times on the row node's clock to the column
/// node's clock
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub cost: f64,
    pub mapping: TimeMapping,
    pub origin: EdgeOrigin,
}

/// Edge declared by an epoch source between two of its own epochs,
/// addressed by position within the source's node list
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InternalEdge {
    pub from: usize,
    pub to: usize,
    pub cost: f64,
    pub mapping: TimeMapping,
}

impl InternalEdge {
    pub fn new(from: usize, to: usize, cost: f64, mapping: TimeMapping) -> Self {
        InternalEdge {
            from,
            to,
            cost,
            mapping,
        }
    }
}

/// Something that declares a batch of epochs: a device, an element, or a
/// test fixture
pub trait EpochSource {
    fn epoch_nodes(&self) -> Vec<EpochNode>;

    /// Mappings the source knows between its own epochs
    fn epoch_graph(&self) -> Vec<InternalEdge> {
        Vec::new()
    }
}

/// Plain batch of epochs with optional internal edges
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochBatch {
    pub nodes: Vec<EpochNode>,
    #[serde(default)]
    pub edges: Vec<InternalEdge>,
}

impl EpochBatch {
    /// Batch without internal edges
    pub fn new(nodes: Vec<EpochNode>) -> Self {
        EpochBatch {
            nodes,
            edges: Vec::new(),
        }
    }

    pub fn with_edges(mut self, edges: Vec<InternalEdge>) -> Self {
        self.edges = edges;
        self
    }
}

impl EpochSource for EpochBatch {
    fn epoch_nodes(&self) -> Vec<EpochNode> {
        self.nodes.clone()
    }

    fn epoch_graph(&self) -> Vec<InternalEdge> {
        self.edges.clone()
    }
}

/// Synchronization graph for one session
#[derive(Debug)]
pub struct SyncGraph {
    config: GraphConfig,
    rules: Vec<SyncRule>,
    /// Node arena, never shrinks between rebuilds
    nodes: Vec<EpochNode>,
    /// `superseded[i]` is the node that replaced node `i`
    superseded: Vec<Option<NodeIndex>>,
    /// Current node for each logical key
    index: HashMap<NodeKey, NodeIndex>,
    /// Sparse adjacency, one ordered row per node
    edges: Vec<BTreeMap<NodeIndex, Edge>>,
    /// Every batch added since the last rebuild, replayed by `rebuild`
    batches: Vec<EpochBatch>,
}

impl SyncGraph {
    /// Create an empty graph with default configuration
    pub fn new() -> Self {
        SyncGraph {
            config: GraphConfig::default(),
            rules: Vec::new(),
            nodes: Vec::new(),
            superseded: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            batches: Vec::new(),
        }
    }

    /// Create an empty graph, rejecting an inconsistent cost policy
    pub fn with_config(config: GraphConfig) -> ChronoResult<Self> {
        config.validate()?;
        Ok(SyncGraph {
            config,
            ..Self::new()
        })
    }

    /// Configuration the graph was built with
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Registered rules, in evaluation order
    pub fn rules(&self) -> &[SyncRule] {
        &self.rules
    }

    /// Register a rule. Invalid parameters are rejected here, an exact
    /// duplicate is ignored (`Ok(false)`). A new rule rebuilds the graph.
    ///
    /// If the rebuild fails the rule is not registered and the graph is
    /// left as it was.
    pub fn add_rule(&mut self, rule: impl Into<SyncRule>) -> ChronoResult<bool> {
        let rule = rule.into();
        rule.validate()?;
        if self.rules.contains(&rule) {
            debug!(rule = rule.name(), "duplicate sync rule ignored");
            return Ok(false);
        }
        if let SyncRule::CommonTriggers(_) = rule {
            warn!(
                "commontriggers is a placeholder: it matches shared files only, \
                 trigger alignment is not implemented"
            );
        }

        let name = rule.name();
        let position = self.rules.len();
        let mut rules = self.rules.clone();
        rules.push(rule);
        match self.replayed(rules) {
            Ok(graph) => {
                *self = graph;
                info!(rule = name, position, "sync rule registered");
                Ok(true)
            }
            Err(e) => {
                warn!(rule = name, error = %e, "sync rule rejected during rebuild");
                Err(e)
            }
        }
    }

    /// Remove the rule at `position`, returning it. Rebuilds the graph.
    ///
    /// If the rebuild fails the rule stays registered and the graph is
    /// left as it was.
    pub fn remove_rule(&mut self, position: usize) -> ChronoResult<Option<SyncRule>> {
        if position >= self.rules.len() {
            return Ok(None);
        }
        let mut rules = self.rules.clone();
        let rule = rules.remove(position);
        *self = self.replayed(rules)?;
        info!(rule = rule.name(), position, "sync rule removed");
        Ok(Some(rule))
    }

    /// Add a single epoch node
    pub fn add_epoch(&mut self, node: EpochNode) -> ChronoResult<NodeIndex> {
        let added = self.add_batch(EpochBatch::new(vec![node]))?;
        Ok(added[0])
    }

    /// Add every epoch a source declares, with its internal edges
    pub fn add_epoch_source(&mut self, source: &dyn EpochSource) -> ChronoResult<Vec<NodeIndex>> {
        self.add_batch(EpochBatch {
            nodes: source.epoch_nodes(),
            edges: source.epoch_graph(),
        })
    }

    /// Inject nodes and edges directly, without an ingestion pipeline
    pub fn manual_add_nodes(
        &mut self,
        nodes: Vec<EpochNode>,
        edges: Vec<InternalEdge>,
    ) -> ChronoResult<Vec<NodeIndex>> {
        self.add_batch(EpochBatch { nodes, edges })
    }

    /// Discard all nodes and edges and replay every batch against the
    /// current rule set. Superseded nodes are dropped, so handles issued
    /// before a rebuild must be looked up again.
    ///
    /// On error the graph is left untouched.
    pub fn rebuild(&mut self) -> ChronoResult<()> {
        *self = self.replayed(self.rules.clone())?;
        Ok(())
    }

    /// Fresh graph holding every recorded batch, linked under `rules`
    fn replayed(&self, rules: Vec<SyncRule>) -> ChronoResult<SyncGraph> {
        let mut graph = SyncGraph {
            config: self.config.clone(),
            rules,
            ..Self::new()
        };
        graph.replay(&self.batches)?;
        info!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            rules = graph.rules.len(),
            "sync graph rebuilt"
        );
        Ok(graph)
    }

    fn replay(&mut self, batches: &[EpochBatch]) -> ChronoResult<()> {
        // Last declaration of each key wins
        let mut last: HashMap<NodeKey, (usize, usize)> = HashMap::new();
        for (b, batch) in batches.iter().enumerate() {
            for (n, node) in batch.nodes.iter().enumerate() {
                last.insert(node.key(), (b, n));
            }
        }

        for (b, batch) in batches.iter().enumerate() {
            let keep: Vec<bool> = batch
                .nodes
                .iter()
                .enumerate()
                .map(|(n, node)| last.get(&node.key()) == Some(&(b, n)))
                .collect();
            if !keep.iter().any(|k| *k) {
                continue;
            }

            let mut position = vec![None; batch.nodes.len()];
            let mut nodes = Vec::new();
            for (n, node) in batch.nodes.iter().enumerate() {
                if keep[n] {
                    position[n] = Some(nodes.len());
                    nodes.push(node.clone());
                }
            }
            let edges = batch
                .edges
                .iter()
                .filter_map(|e| match (position[e.from], position[e.to]) {
                    (Some(from), Some(to)) => Some(InternalEdge { from, to, ..*e }),
                    _ => None,
                })
                .collect();
            self.add_batch(EpochBatch { nodes, edges })?;
        }
        Ok(())
    }

    fn add_batch(&mut self, batch: EpochBatch) -> ChronoResult<Vec<NodeIndex>> {
        let count = batch.nodes.len();
        if self.nodes.len() + count > self.config.max_nodes {
            return Err(ChronoError::GraphCapacity {
                max: self.config.max_nodes,
            });
        }
        for edge in &batch.edges {
            validate_internal_edge(edge, count)?;
        }

        let start = self.nodes.len();
        match self.link_batch(&batch) {
            Ok(added) => {
                self.batches.push(batch);
                debug!(added = count, total = self.nodes.len(), "epochs added to sync graph");
                Ok(added)
            }
            Err(e) => {
                warn!(error = %e, "epoch batch rejected, rolling back");
                self.truncate(start);
                Err(e)
            }
        }
    }

    fn link_batch(&mut self, batch: &EpochBatch) -> ChronoResult<Vec<NodeIndex>> {
        let count = batch.nodes.len();

        // Pass 1: nodes and internal edges
        let mut added = Vec::with_capacity(count);
        for node in &batch.nodes {
            added.push(self.insert_node(node.clone()));
        }
        for edge in &batch.edges {
            let (from, to) = (added[edge.from], added[edge.to]);
            self.offer_edge(from, to, edge.cost, edge.mapping, EdgeOrigin::Internal)?;
        }

        // Pass 2: automatic same-clock edges
        let automatic_cost = self.config.costs.automatic;
        for (k, &new) in added.iter().enumerate() {
            if self.is_superseded(new) {
                continue;
            }
            let candidates: Vec<NodeIndex> = self
                .live_indices()
                .filter(|&other| other != new && !added[k..].contains(&other))
                .collect();
            for other in candidates {
                if self.nodes[other.0].links_automatically_with(&self.nodes[new.0]) {
                    self.offer_edge(
                        other,
                        new,
                        automatic_cost,
                        TimeMapping::identity(),
                        EdgeOrigin::Automatic,
                    )?;
                }
            }
        }

        // Pass 3: sync rules, in registration order
        for position in 0..self.rules.len() {
            let (eligible, _) = self.rules[position].get_eligible_epochs(self.live_nodes());
            for (k, &new) in added.iter().enumerate() {
                if !eligible.contains(&new) {
                    continue;
                }
                for &other in &eligible {
                    if other == new || added[k..].contains(&other) {
                        continue;
                    }
                    let found = self.rules[position].apply(
                        &self.nodes[other.0],
                        &self.nodes[new.0],
                        &self.config.costs,
                    )?;
                    if let Some(found) = found {
                        self.offer_edge(
                            other,
                            new,
                            found.cost,
                            found.mapping,
                            EdgeOrigin::Rule(position),
                        )?;
                    }
                }
            }
        }

        Ok(added)
    }

    /// Drop every node from `start` on, with their edges, and reinstate
    /// the nodes they superseded
    fn truncate(&mut self, start: usize) {
        let kept = start.min(self.edges.len());
        for row in &mut self.edges[..kept] {
            row.retain(|to, _| to.0 < start);
        }
        self.nodes.truncate(start);
        self.edges.truncate(start);
        self.superseded.truncate(start);
        self.index.retain(|_, i| i.0 < start);
        for (i, replaced_by) in self.superseded.iter_mut().enumerate() {
            if matches!(replaced_by, Some(n) if n.0 >= start) {
                *replaced_by = None;
                self.index.insert(self.nodes[i].key(), NodeIndex(i));
            }
        }
    }

    fn insert_node(&mut self, node: EpochNode) -> NodeIndex {
        let index = NodeIndex(self.nodes.len());
        let key = node.key();
        if let Some(old) = self.index.insert(key, index) {
            self.superseded[old.0] = Some(index);
            debug!(old = %old, new = %index, node = %node, "epoch node superseded");
        }
        trace!(index = %index, node = %node, "epoch node inserted");
        self.nodes.push(node);
        self.superseded.push(None);
        self.edges.push(BTreeMap::new());
        index
    }

    /// Store `from -> to` and its inverse unless a cheaper or equally
    /// cheap edge is already present
    fn offer_edge(
        &mut self,
        from: NodeIndex,
        to: NodeIndex,
        cost: f64,
        mapping: TimeMapping,
        origin: EdgeOrigin,
    ) -> ChronoResult<()> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(ChronoError::InvalidEdge {
                from,
                to,
                reason: format!("cost must be finite and >= 0, got {cost}"),
            });
        }
        if let Some(existing) = self.edges[from.0].get(&to) {
            if existing.cost <= cost {
                return Ok(());
            }
            debug!(
                from = %from,
                to = %to,
                old_cost = existing.cost,
                new_cost = cost,
                origin = ?origin,
                "cheaper edge replaces existing one"
            );
        } else {
            trace!(from = %from, to = %to, cost, origin = ?origin, "edge added");
        }

        self.edges[from.0].insert(to, Edge { cost, mapping, origin });
        self.edges[to.0].insert(
            from,
            Edge {
                cost,
                mapping: mapping.invert(),
                origin,
            },
        );
        Ok(())
    }

    /// Indices of all nodes that have not been superseded
    fn live_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.superseded
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| NodeIndex(i))
    }

    fn live_nodes(&self) -> impl Iterator<Item = (NodeIndex, &EpochNode)> + '_ {
        self.live_indices().map(|i| (i, &self.nodes[i.0]))
    }

    /// Node stored at `index`, superseded or not
    pub fn node(&self, index: NodeIndex) -> Option<&EpochNode> {
        self.nodes.get(index.0)
    }

    /// Number of nodes in the arena, superseded ones included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Has a later declaration of the same key replaced this node?
    pub fn is_superseded(&self, index: NodeIndex) -> bool {
        matches!(self.superseded.get(index.0), Some(Some(_)))
    }

    /// Current node for a handle, following replacements
    pub fn resolve(&self, index: NodeIndex) -> ChronoResult<NodeIndex> {
        let mut current = index;
        loop {
            match self.superseded.get(current.0) {
                None => return Err(ChronoError::InvalidNodeIndex(index)),
                Some(None) => return Ok(current),
                Some(Some(next)) => current = *next,
            }
        }
    }

    /// Current node for a logical key
    pub fn index_of(&self, key: &NodeKey) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Stored edge from `from` to `to`
    pub fn edge(&self, from: NodeIndex, to: NodeIndex) -> Option<&Edge> {
        self.edges.get(from.0)?.get(&to)
    }

    /// Outgoing edges of a node, in index order
    pub(crate) fn neighbors(
        &self,
        from: NodeIndex,
    ) -> impl Iterator<Item = (NodeIndex, &Edge)> + '_ {
        self.edges[from.0]
            .iter()
            .filter(|(to, _)| !self.is_superseded(**to))
            .map(|(to, edge)| (*to, edge))
    }

    /// All current nodes matching every key the filter sets
    pub fn find_node_index(&self, filter: &NodeFilter) -> Vec<NodeIndex> {
        self.live_nodes()
            .filter(|(_, node)| filter.matches(node))
            .map(|(index, _)| index)
            .collect()
    }

    /// Serialize the rule set as a JSON array of tagged rule objects
    pub fn rule_documents(&self) -> ChronoResult<String> {
        Ok(serde_json::to_string_pretty(&self.rules)?)
    }

    /// Empty graph with the rules from [`rule_documents`](Self::rule_documents)
    pub fn from_rule_documents(config: GraphConfig, json: &str) -> ChronoResult<Self> {
        let rules: Vec<SyncRule> = serde_json::from_str(json)?;
        let mut graph = Self::with_config(config)?;
        for rule in rules {
            graph.add_rule(rule)?;
        }
        Ok(graph)
    }
}

impl Default for SyncGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_internal_edge(edge: &InternalEdge, count: usize) -> ChronoResult<()> {
    let invalid = |reason: String| ChronoError::InvalidEdge {
        from: NodeIndex(edge.from),
        to: NodeIndex(edge.to),
        reason,
    };
    if edge.from >= count || edge.to >= count {
        return Err(invalid(format!("batch has only {count} node(s)")));
    }
    if edge.from == edge.to {
        return Err(invalid("self edge".into()));
    }
    if !edge.cost.is_finite() || edge.cost < 0.0 {
        return Err(invalid(format!("cost must be finite and >= 0, got {}", edge.cost)));
    }
    Ok(())
}
