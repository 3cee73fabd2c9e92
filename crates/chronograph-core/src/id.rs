//! Identity types for the synchronization graph
//!
//! Epoch nodes live in an append-only arena; a `NodeIndex` is a stable
//! handle into that arena. A `NodeKey` is the logical identity of a node,
//! used to find the current arena entry for an epoch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ClockType;

/// Handle of an epoch node in a graph's arena
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl NodeIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        NodeIndex(index)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for NodeIndex {
    fn from(index: usize) -> Self {
        NodeIndex(index)
    }
}

/// Logical identity of an epoch node: owner, epoch and clock type.
///
/// Two nodes are the same vertex only if all three match exactly.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub owner: String,
    pub epoch_id: String,
    pub clock_type: ClockType,
}

impl NodeKey {
    pub fn new(
        owner: impl Into<String>,
        epoch_id: impl Into<String>,
        clock_type: ClockType,
    ) -> Self {
        NodeKey {
            owner: owner.into(),
            epoch_id: epoch_id.into(),
            clock_type,
        }
    }

    /// Same recording epoch on the same device, any clock type
    #[inline]
    pub fn same_epoch(&self, other: &NodeKey) -> bool {
        self.owner == other.owner && self.epoch_id == other.epoch_id
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.epoch_id, self.clock_type)
    }
}
