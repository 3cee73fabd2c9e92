//! Shared-file identity rule
//!
//! Two epochs read from enough of the same files were recorded on the same
//! clock, so their times are identical.

use serde::{Deserialize, Serialize};

use chronograph_core::EpochNode;

use super::validate_match_count;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMatchParams {
    /// Shared file paths required to declare the clocks identical
    pub number_fullpath_matches: usize,
}

impl Default for FileMatchParams {
    fn default() -> Self {
        FileMatchParams {
            number_fullpath_matches: 2,
        }
    }
}

impl FileMatchParams {
    pub fn validate(&self) -> Result<(), String> {
        validate_match_count(self.number_fullpath_matches)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    #[serde(flatten)]
    pub params: FileMatchParams,
}

impl FileMatch {
    pub const NAME: &'static str = "filematch";

    /// Identity rule requiring `number_fullpath_matches` shared files
    pub fn new(number_fullpath_matches: usize) -> Self {
        FileMatch {
            params: FileMatchParams {
                number_fullpath_matches,
            },
        }
    }

    pub fn matches(&self, a: &EpochNode, b: &EpochNode) -> bool {
        a.shared_file_count(b) >= self.params.number_fullpath_matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronograph_core::ClockType;

    #[test]
    fn test_threshold() {
        let rule = FileMatch::new(2);
        let a = EpochNode::new("dev1", "e1", ClockType::DevLocalTime)
            .with_files(["/p/file1.dat", "/p/file2.dat"]);
        let b = EpochNode::new("dev2", "e2", ClockType::DevLocalTime)
            .with_files(["/p/file1.dat", "/p/file3.dat"]);
        let c = EpochNode::new("dev3", "e3", ClockType::DevLocalTime)
            .with_files(["/p/file1.dat", "/p/file2.dat", "/p/file9.dat"]);

        assert!(!rule.matches(&a, &b));
        assert!(rule.matches(&a, &c));
        assert!(rule.matches(&c, &a));
    }

    #[test]
    fn test_empty_files_never_match() {
        let rule = FileMatch::new(1);
        let a = EpochNode::new("dev1", "e1", ClockType::DevLocalTime);
        let b = EpochNode::new("dev2", "e2", ClockType::DevLocalTime);
        assert!(!rule.matches(&a, &b));
    }

    #[test]
    fn test_params_validation() {
        assert!(FileMatchParams::default().validate().is_ok());
        assert!(FileMatchParams {
            number_fullpath_matches: 0
        }
        .validate()
        .is_err());
    }
}
