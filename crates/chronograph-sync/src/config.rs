//! Graph configuration and edge cost policy

use serde::{Deserialize, Serialize};

use chronograph_core::{ChronoError, ChronoResult};

/// Fixed edge costs per kind of evidence.
///
/// Lower cost means more trusted. The ordering
/// `file_find < file_match, common_triggers < automatic` must hold so that an
/// explicit mapping always beats a shared-file identity, which always beats
/// the automatic same-clock guess.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostPolicy {
    /// Explicit mapping read from a record
    pub file_find: f64,
    /// Identity declared from shared files
    pub file_match: f64,
    /// Trigger alignment (currently shared-file identity)
    pub common_triggers: f64,
    /// Identity between comparable clock types, no rule involved
    pub automatic: f64,
}

impl Default for CostPolicy {
    fn default() -> Self {
        CostPolicy {
            file_find: 1.0,
            file_match: 2.0,
            common_triggers: 2.0,
            automatic: 100.0,
        }
    }
}

impl CostPolicy {
    pub fn validate(&self) -> ChronoResult<()> {
        let costs = [
            ("file_find", self.file_find),
            ("file_match", self.file_match),
            ("common_triggers", self.common_triggers),
            ("automatic", self.automatic),
        ];
        for (name, cost) in costs {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ChronoError::InvalidCostPolicy(format!(
                    "{name} cost must be finite and >= 0, got {cost}"
                )));
            }
        }

        if self.file_find >= self.file_match || self.file_find >= self.common_triggers {
            return Err(ChronoError::InvalidCostPolicy(format!(
                "file_find ({}) must be cheaper than file_match ({}) and common_triggers ({})",
                self.file_find, self.file_match, self.common_triggers
            )));
        }

        let strongest_identity = self.file_match.max(self.common_triggers);
        if strongest_identity >= self.automatic {
            return Err(ChronoError::InvalidCostPolicy(format!(
                "automatic ({}) must cost more than every rule-derived edge ({})",
                self.automatic, strongest_identity
            )));
        }

        Ok(())
    }
}

/// Synchronization graph configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    pub costs: CostPolicy,
    /// Upper bound on epoch nodes, bounds path search time
    pub max_nodes: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            costs: CostPolicy::default(),
            max_nodes: 4096,
        }
    }
}

impl GraphConfig {
    /// Configuration for a single interactive session
    pub fn small_session() -> Self {
        GraphConfig {
            max_nodes: 256,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ChronoResult<()> {
        if self.max_nodes == 0 {
            return Err(ChronoError::InvalidCostPolicy(
                "max_nodes must be at least 1".into(),
            ));
        }
        self.costs.validate()
    }
}
