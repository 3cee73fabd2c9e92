//! Epoch nodes - the vertices of the synchronization graph
//!
//! An epoch node is one recording epoch, viewed on one clock type, owned by
//! one device or object. Nodes are immutable once declared; a changed epoch
//! is declared again as a new node.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ClockType, LinkScope, NodeKey};

/// Kind of object that owns an epoch
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectClass {
    /// Acquisition system reading hardware files
    #[default]
    DaqSystem,
    Probe,
    Element,
    /// Generic epoch set without device semantics
    EpochSet,
    /// File navigator, only groups files into epochs
    FileNavigator,
    Other(String),
}

impl ObjectClass {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectClass::DaqSystem => "daq_system",
            ObjectClass::Probe => "probe",
            ObjectClass::Element => "element",
            ObjectClass::EpochSet => "epoch_set",
            ObjectClass::FileNavigator => "file_navigator",
            ObjectClass::Other(name) => name,
        }
    }
}

impl fmt::Display for ObjectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (epoch, clock type) pair of one device
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochNode {
    /// Recording epoch identifier, unique per owner
    pub epoch_id: String,
    /// Owning device or object name
    pub owner: String,
    #[serde(default)]
    pub owner_class: ObjectClass,
    pub clock_type: ClockType,
    /// Files the epoch was read from
    #[serde(default)]
    pub candidate_files: BTreeSet<PathBuf>,
}

impl EpochNode {
    /// Create an epoch with no files and the default owner class
    pub fn new(
        owner: impl Into<String>,
        epoch_id: impl Into<String>,
        clock_type: ClockType,
    ) -> Self {
        EpochNode {
            epoch_id: epoch_id.into(),
            owner: owner.into(),
            owner_class: ObjectClass::default(),
            clock_type,
            candidate_files: BTreeSet::new(),
        }
    }

    /// Add candidate files; duplicates collapse
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.candidate_files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Set the object class of the owning device
    pub fn with_class(mut self, owner_class: ObjectClass) -> Self {
        self.owner_class = owner_class;
        self
    }

    /// Logical identity of this node
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.owner.clone(), self.epoch_id.clone(), self.clock_type.clone())
    }

    /// Number of candidate files shared with another node
    pub fn shared_file_count(&self, other: &EpochNode) -> usize {
        self.candidate_files
            .intersection(&other.candidate_files)
            .count()
    }

    /// Number of this node's candidate files that appear in `files`
    pub fn files_listed_in<'a, I>(&self, files: I) -> usize
    where
        I: IntoIterator<Item = &'a PathBuf>,
    {
        files
            .into_iter()
            .filter(|f| self.candidate_files.contains(*f))
            .count()
    }

    /// First candidate file whose file name equals `name`
    pub fn find_file_named(&self, name: &str) -> Option<&Path> {
        self.candidate_files
            .iter()
            .find(|p| p.file_name().map_or(false, |n| n == name))
            .map(PathBuf::as_path)
    }

    /// May the graph link these nodes with an identity mapping, without any
    /// sync rule? True when the clock types share an axis and the pair is
    /// within that axis's link scope.
    pub fn links_automatically_with(&self, other: &EpochNode) -> bool {
        if !self.clock_type.is_comparable(&other.clock_type) {
            return false;
        }
        let Some(axis) = self.clock_type.axis() else {
            return false;
        };
        match axis.link_scope() {
            LinkScope::Any => true,
            LinkScope::SameOwner => self.owner == other.owner,
            LinkScope::SameEpoch => self.owner == other.owner && self.epoch_id == other.epoch_id,
        }
    }
}

impl fmt::Display for EpochNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.epoch_id, self.clock_type)
    }
}

/// Property filter for locating nodes without holding a handle.
///
/// Every field that is set must match; an empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub epoch_id: Option<String>,
    pub owner: Option<String>,
    pub owner_class: Option<ObjectClass>,
    pub clock_type: Option<ClockType>,
}

impl NodeFilter {
    /// Filter that matches every node
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch_id(mut self, epoch_id: impl Into<String>) -> Self {
        self.epoch_id = Some(epoch_id.into());
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn owner_class(mut self, owner_class: ObjectClass) -> Self {
        self.owner_class = Some(owner_class);
        self
    }

    pub fn clock_type(mut self, clock_type: ClockType) -> Self {
        self.clock_type = Some(clock_type);
        self
    }

    pub fn matches(&self, node: &EpochNode) -> bool {
        self.epoch_id.as_ref().map_or(true, |e| *e == node.epoch_id)
            && self.owner.as_ref().map_or(true, |o| *o == node.owner)
            && self
                .owner_class
                .as_ref()
                .map_or(true, |c| *c == node.owner_class)
            && self
                .clock_type
                .as_ref()
                .map_or(true, |c| *c == node.clock_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_file_count() {
        let a = EpochNode::new("dev1", "e1", ClockType::DevLocalTime)
            .with_files(["/data/a.rhd", "/data/b.rhd", "/data/c.rhd"]);
        let b = EpochNode::new("dev2", "e1", ClockType::DevLocalTime)
            .with_files(["/data/b.rhd", "/data/c.rhd", "/data/d.smr"]);
        assert_eq!(a.shared_file_count(&b), 2);
        assert_eq!(b.shared_file_count(&a), 2);
    }

    #[test]
    fn test_find_file_named() {
        let node = EpochNode::new("dev1", "e1", ClockType::DevLocalTime)
            .with_files(["/data/t1/syncfile.txt", "/data/t1/raw.bin"]);
        assert_eq!(
            node.find_file_named("syncfile.txt"),
            Some(Path::new("/data/t1/syncfile.txt"))
        );
        assert!(node.find_file_named("missing.txt").is_none());
    }

    #[test]
    fn test_auto_link_global_clock_any_owner() {
        let a = EpochNode::new("dev1", "e1", ClockType::Utc);
        let b = EpochNode::new("dev2", "e7", ClockType::ApproxUtc);
        assert!(a.links_automatically_with(&b));
    }

    #[test]
    fn test_auto_link_dev_global_same_owner_only() {
        let a = EpochNode::new("dev1", "e1", ClockType::DevGlobalTime);
        let b = EpochNode::new("dev1", "e2", ClockType::DevGlobalTime);
        let c = EpochNode::new("dev2", "e1", ClockType::DevGlobalTime);
        assert!(a.links_automatically_with(&b));
        assert!(!a.links_automatically_with(&c));
    }

    #[test]
    fn test_auto_link_local_same_epoch_only() {
        let a = EpochNode::new("dev1", "e1", ClockType::DevLocalTime);
        let b = EpochNode::new("dev1", "e2", ClockType::DevLocalTime);
        let c = EpochNode::new("dev2", "e1", ClockType::DevLocalTime);
        assert!(!a.links_automatically_with(&b));
        assert!(!a.links_automatically_with(&c));
    }

    #[test]
    fn test_filter_matches_all_set_fields() {
        let node = EpochNode::new("intan", "t00001", ClockType::DevLocalTime);

        assert!(NodeFilter::new().matches(&node));
        assert!(NodeFilter::new().owner("intan").matches(&node));
        assert!(NodeFilter::new()
            .owner("intan")
            .epoch_id("t00001")
            .clock_type(ClockType::DevLocalTime)
            .matches(&node));
        assert!(!NodeFilter::new()
            .owner("intan")
            .clock_type(ClockType::Utc)
            .matches(&node));
        assert!(!NodeFilter::new()
            .owner_class(ObjectClass::Probe)
            .matches(&node));
    }

    #[test]
    fn test_node_json_defaults() {
        let json = r#"{"epoch_id":"e1","owner":"dev1","clock_type":"utc"}"#;
        let node: EpochNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.owner_class, ObjectClass::DaqSystem);
        assert!(node.candidate_files.is_empty());
        assert_eq!(node.clock_type, ClockType::Utc);
    }
}
