//! Trigger alignment rule
//!
//! Meant to align two devices from trigger pulses both of them recorded.
//! Until trigger detection exists, it relates epochs exactly like the
//! shared-file identity rule.

use serde::{Deserialize, Serialize};

use chronograph_core::EpochNode;

use super::{validate_match_count, validate_name};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonTriggersParams {
    pub daq_system1: String,
    pub channel_daq1: String,
    pub daq_system2: String,
    pub channel_daq2: String,
    pub number_fullpath_matches: usize,
}

impl Default for CommonTriggersParams {
    fn default() -> Self {
        CommonTriggersParams {
            daq_system1: "daq1".into(),
            channel_daq1: "trigger".into(),
            daq_system2: "daq2".into(),
            channel_daq2: "trigger".into(),
            number_fullpath_matches: 2,
        }
    }
}

impl CommonTriggersParams {
    pub fn validate(&self) -> Result<(), String> {
        validate_name("daq_system1", &self.daq_system1)?;
        validate_name("channel_daq1", &self.channel_daq1)?;
        validate_name("daq_system2", &self.daq_system2)?;
        validate_name("channel_daq2", &self.channel_daq2)?;
        validate_match_count(self.number_fullpath_matches)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonTriggers {
    #[serde(flatten)]
    pub params: CommonTriggersParams,
}

impl CommonTriggers {
    pub const NAME: &'static str = "commontriggers";

    /// Rule with the given channel parameters
    pub fn new(params: CommonTriggersParams) -> Self {
        CommonTriggers { params }
    }

    // TODO: detect pulses on channel_daq1/channel_daq2 and fit scale/shift
    // from the aligned pulse times instead of requiring shared files.
    pub fn matches(&self, a: &EpochNode, b: &EpochNode) -> bool {
        a.shared_file_count(b) >= self.params.number_fullpath_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileMatch;
    use chronograph_core::ClockType;

    #[test]
    fn test_behaves_like_filematch() {
        let triggers = CommonTriggers::default();
        let files = FileMatch::new(triggers.params.number_fullpath_matches);

        let a = EpochNode::new("daq1", "e1", ClockType::DevLocalTime)
            .with_files(["/s/a", "/s/b", "/s/c"]);
        let b = EpochNode::new("daq2", "e1", ClockType::DevLocalTime)
            .with_files(["/s/a", "/s/b"]);
        let c = EpochNode::new("daq2", "e2", ClockType::DevLocalTime).with_files(["/s/a"]);

        assert_eq!(triggers.matches(&a, &b), files.matches(&a, &b));
        assert_eq!(triggers.matches(&a, &c), files.matches(&a, &c));
        assert!(triggers.matches(&a, &b));
        assert!(!triggers.matches(&a, &c));
    }

    #[test]
    fn test_params_validation() {
        assert!(CommonTriggersParams::default().validate().is_ok());

        let params = CommonTriggersParams {
            channel_daq2: " ".into(),
            ..CommonTriggersParams::default()
        };
        assert!(params.validate().is_err());
    }
}
