//! Sync rules - policies that relate two epoch nodes
//!
//! The rule set is closed: every kind of rule is a variant of [`SyncRule`],
//! so the cost each kind may claim is decided in one place
//! ([`CostPolicy`]). Adding a rule kind means adding a variant here.

mod commontriggers;
mod filefind;
mod filematch;

pub use commontriggers::*;
pub use filefind::*;
pub use filematch::*;

use serde::{Deserialize, Serialize};

use chronograph_core::{
    ChronoError, ChronoResult, EpochNode, NodeIndex, ObjectClass, TimeMapping,
};

use crate::CostPolicy;

/// Outcome of a rule relating node A to node B
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyncMatch {
    pub cost: f64,
    /// Maps times on A's clock to times on B's clock
    pub mapping: TimeMapping,
}

/// A registered synchronization rule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SyncRule {
    /// Explicit mapping from an external record
    FileFind(FileFind),
    /// Identity when epochs share files
    FileMatch(FileMatch),
    /// Trigger alignment placeholder
    CommonTriggers(CommonTriggers),
}

impl SyncRule {
    pub fn name(&self) -> &'static str {
        match self {
            SyncRule::FileFind(_) => FileFind::NAME,
            SyncRule::FileMatch(_) => FileMatch::NAME,
            SyncRule::CommonTriggers(_) => CommonTriggers::NAME,
        }
    }

    /// Check the rule's configuration, with the reason on failure
    pub fn validate(&self) -> ChronoResult<()> {
        let result = match self {
            SyncRule::FileFind(rule) => rule.params.validate(),
            SyncRule::FileMatch(rule) => rule.params.validate(),
            SyncRule::CommonTriggers(rule) => rule.params.validate(),
        };
        result.map_err(|reason| ChronoError::InvalidRuleParameters {
            rule: self.name(),
            reason,
        })
    }

    pub fn is_valid_parameters(&self) -> bool {
        self.validate().is_ok()
    }

    /// Is this node one the rule is willing to look at?
    pub fn is_eligible(&self, node: &EpochNode) -> bool {
        if !node.clock_type.has_time() || !eligible_class(&node.owner_class) {
            return false;
        }
        match self {
            SyncRule::FileFind(rule) => rule.involves(&node.owner),
            SyncRule::FileMatch(_) | SyncRule::CommonTriggers(_) => true,
        }
    }

    /// Partition candidate nodes into (eligible, ineligible) before the
    /// pairwise evaluation
    pub fn get_eligible_epochs<'a, I>(&self, nodes: I) -> (Vec<NodeIndex>, Vec<NodeIndex>)
    where
        I: IntoIterator<Item = (NodeIndex, &'a EpochNode)>,
    {
        let mut eligible = Vec::new();
        let mut ineligible = Vec::new();
        for (index, node) in nodes {
            if self.is_eligible(node) {
                eligible.push(index);
            } else {
                ineligible.push(index);
            }
        }
        (eligible, ineligible)
    }

    /// Relate node `a` to node `b`.
    ///
    /// `Ok(None)` means the rule has nothing to say about the pair. Errors
    /// are reserved for unreadable or malformed mapping records.
    pub fn apply(
        &self,
        a: &EpochNode,
        b: &EpochNode,
        costs: &CostPolicy,
    ) -> ChronoResult<Option<SyncMatch>> {
        if !self.is_eligible(a) || !self.is_eligible(b) {
            return Ok(None);
        }
        let found = match self {
            SyncRule::FileFind(rule) => rule
                .find_mapping(a, b)?
                .map(|mapping| SyncMatch {
                    cost: costs.file_find,
                    mapping,
                }),
            SyncRule::FileMatch(rule) => rule.matches(a, b).then(|| SyncMatch {
                cost: costs.file_match,
                mapping: TimeMapping::identity(),
            }),
            SyncRule::CommonTriggers(rule) => rule.matches(a, b).then(|| SyncMatch {
                cost: costs.common_triggers,
                mapping: TimeMapping::identity(),
            }),
        };
        Ok(found)
    }
}

impl From<FileFind> for SyncRule {
    fn from(rule: FileFind) -> Self {
        SyncRule::FileFind(rule)
    }
}

impl From<FileMatch> for SyncRule {
    fn from(rule: FileMatch) -> Self {
        SyncRule::FileMatch(rule)
    }
}

impl From<CommonTriggers> for SyncRule {
    fn from(rule: CommonTriggers) -> Self {
        SyncRule::CommonTriggers(rule)
    }
}

/// Only acquisition systems carry device clocks the rules can reason about;
/// generic epoch sets and file navigators are excluded.
fn eligible_class(class: &ObjectClass) -> bool {
    match class {
        ObjectClass::DaqSystem => true,
        ObjectClass::EpochSet | ObjectClass::FileNavigator => false,
        ObjectClass::Probe | ObjectClass::Element | ObjectClass::Other(_) => false,
    }
}

fn validate_match_count(count: usize) -> Result<(), String> {
    if count < 1 {
        return Err("number_fullpath_matches must be >= 1".into());
    }
    Ok(())
}

fn validate_name(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    Ok(())
}
