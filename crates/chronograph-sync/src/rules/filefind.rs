//! Explicit mapping rule
//!
//! Relates two named devices through a declared mapping record. The record
//! is looked up in the rule's record set first; failing that, in a sync file
//! stored among the declared source device's epoch files.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use chronograph_core::{ChronoResult, EpochNode, TimeMapping};

use super::{validate_match_count, validate_name};
use crate::{MappingRecord, MappingRecordSet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFindParams {
    /// File paths both epochs must have in common with the record
    pub number_fullpath_matches: usize,
    /// File name of the per-epoch sync file, `None` disables the search
    pub sync_file_name: Option<String>,
    /// Declared source device of the mapping
    pub daq_system1: String,
    /// Declared target device of the mapping
    pub daq_system2: String,
}

impl Default for FileFindParams {
    fn default() -> Self {
        FileFindParams {
            number_fullpath_matches: 1,
            sync_file_name: Some("syncfile.txt".into()),
            daq_system1: "mydaq1".into(),
            daq_system2: "mydaq2".into(),
        }
    }
}

impl FileFindParams {
    pub fn validate(&self) -> Result<(), String> {
        validate_match_count(self.number_fullpath_matches)?;
        if let Some(name) = &self.sync_file_name {
            validate_name("sync_file_name", name)?;
        }
        validate_name("daq_system1", &self.daq_system1)?;
        validate_name("daq_system2", &self.daq_system2)?;
        if self.daq_system1 == self.daq_system2 {
            return Err("daq_system1 and daq_system2 must differ".into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFind {
    #[serde(flatten)]
    pub params: FileFindParams,
    #[serde(default, skip_serializing_if = "MappingRecordSet::is_empty")]
    pub records: MappingRecordSet,
}

impl FileFind {
    pub const NAME: &'static str = "filefind";

    /// Rule for one device pair, reading sync files only
    pub fn new(daq_system1: impl Into<String>, daq_system2: impl Into<String>) -> Self {
        FileFind {
            params: FileFindParams {
                daq_system1: daq_system1.into(),
                daq_system2: daq_system2.into(),
                ..FileFindParams::default()
            },
            records: MappingRecordSet::new(),
        }
    }

    /// Rule with explicit parameters and no in-memory records
    pub fn with_params(params: FileFindParams) -> Self {
        FileFind {
            params,
            records: MappingRecordSet::new(),
        }
    }

    pub fn with_records(mut self, records: MappingRecordSet) -> Self {
        self.records = records;
        self
    }

    pub fn with_min_matches(mut self, count: usize) -> Self {
        self.params.number_fullpath_matches = count;
        self
    }

    pub fn with_sync_file_name(mut self, name: Option<String>) -> Self {
        self.params.sync_file_name = name;
        self
    }

    /// Is `owner` one of the two devices this rule relates?
    pub fn involves(&self, owner: &str) -> bool {
        owner == self.params.daq_system1 || owner == self.params.daq_system2
    }

    /// Mapping from `a`'s clock to `b`'s clock, if the declared record
    /// applies to this pair of epochs
    pub fn find_mapping(&self, a: &EpochNode, b: &EpochNode) -> ChronoResult<Option<TimeMapping>> {
        let p = &self.params;
        let forward = a.owner == p.daq_system1 && b.owner == p.daq_system2;
        let backward = a.owner == p.daq_system2 && b.owner == p.daq_system1;
        if !forward && !backward {
            return Ok(None);
        }

        if let Some(record) = self.records.lookup(&a.owner, &b.owner) {
            let min = record
                .number_fullpath_matches
                .unwrap_or(p.number_fullpath_matches);
            if !record.covers(a, min) || !record.covers(b, min) {
                trace!(a = %a, b = %b, min, "mapping record does not cover both epochs");
                return Ok(None);
            }
            return record.mapping_from(&a.owner);
        }

        let Some(name) = &p.sync_file_name else {
            return Ok(None);
        };
        if a.shared_file_count(b) < p.number_fullpath_matches {
            return Ok(None);
        }
        let source = if forward { a } else { b };
        match source.find_file_named(name) {
            Some(path) => {
                debug!(path = %path.display(), epoch = %source, "reading sync file");
                let record = MappingRecord::from_sync_file(path, &p.daq_system1, &p.daq_system2)?;
                record.mapping_from(&a.owner)
            }
            None => {
                debug!(epoch = %source, file = %name, "sync file absent");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronograph_core::ClockType;

    fn epoch(owner: &str, id: &str, files: &[&str]) -> EpochNode {
        EpochNode::new(owner, id, ClockType::DevLocalTime).with_files(files.iter().copied())
    }

    fn record_rule() -> FileFind {
        let mut records = MappingRecordSet::new();
        records
            .insert(
                MappingRecord::new("device1", "device2", TimeMapping::offset(5.0).unwrap())
                    .with_files(["/s/a.rhd", "/s/b.smr"]),
            )
            .unwrap();
        FileFind::new("device1", "device2")
            .with_records(records)
            .with_sync_file_name(None)
    }

    #[test]
    fn test_forward_and_inverted() {
        let rule = record_rule();
        let a = epoch("device1", "A", &["/s/a.rhd"]);
        let b = epoch("device2", "B", &["/s/b.smr"]);

        let ab = rule.find_mapping(&a, &b).unwrap().unwrap();
        assert_eq!(ab.apply(10.0), 15.0);

        let ba = rule.find_mapping(&b, &a).unwrap().unwrap();
        assert_eq!(ba.apply(15.0), 10.0);
    }

    #[test]
    fn test_unrelated_devices() {
        let rule = record_rule();
        let a = epoch("device1", "A", &["/s/a.rhd"]);
        let c = epoch("device3", "C", &["/s/a.rhd"]);
        assert!(rule.find_mapping(&a, &c).unwrap().is_none());
    }

    #[test]
    fn test_overlap_threshold() {
        let rule = record_rule().with_min_matches(2);
        let a = epoch("device1", "A", &["/s/a.rhd"]);
        let b = epoch("device2", "B", &["/s/a.rhd", "/s/b.smr"]);
        assert!(rule.find_mapping(&a, &b).unwrap().is_none());
    }

    #[test]
    fn test_record_overrides_min() {
        let mut records = MappingRecordSet::new();
        records
            .insert(
                MappingRecord::new("device1", "device2", TimeMapping::identity())
                    .with_files(["/s/a.rhd"])
                    .with_min_matches(1),
            )
            .unwrap();
        let rule = FileFind::new("device1", "device2")
            .with_records(records)
            .with_min_matches(5);
        let a = epoch("device1", "A", &["/s/a.rhd"]);
        let b = epoch("device2", "B", &["/s/a.rhd"]);
        assert!(rule.find_mapping(&a, &b).unwrap().is_some());
    }

    #[test]
    fn test_no_record_no_sync_file() {
        let rule = FileFind::new("device1", "device2");
        let a = epoch("device1", "A", &["/s/a.rhd"]);
        let b = epoch("device2", "B", &["/s/a.rhd"]);
        assert!(rule.find_mapping(&a, &b).unwrap().is_none());
    }

    #[test]
    fn test_params_validation() {
        assert!(FileFindParams::default().validate().is_ok());

        let same = FileFindParams {
            daq_system2: "mydaq1".into(),
            ..FileFindParams::default()
        };
        assert!(same.validate().is_err());

        let empty_name = FileFindParams {
            sync_file_name: Some(String::new()),
            ..FileFindParams::default()
        };
        assert!(empty_name.validate().is_err());
    }
}
