//! External mapping records
//!
//! A mapping record declares how the clock of one device maps onto the clock
//! of another, and which recording files it was measured on. Records come
//! either from a JSON record set or from a small sync file stored next to an
//! epoch's data files.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use chronograph_core::{ChronoError, ChronoResult, EpochNode, LinearParams, TimeMapping};

/// Declared mapping `t_target = scale * t_source + shift`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingRecord {
    /// Device whose clock is the input of the mapping
    pub source: String,
    /// Device whose clock is the output of the mapping
    pub target: String,
    pub scale: f64,
    pub shift: f64,
    /// Files the mapping was measured on
    #[serde(default)]
    pub files: BTreeSet<PathBuf>,
    /// Overrides the rule's minimum file overlap when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_fullpath_matches: Option<usize>,
}

impl MappingRecord {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        mapping: TimeMapping,
    ) -> Self {
        MappingRecord {
            source: source.into(),
            target: target.into(),
            scale: mapping.scale(),
            shift: mapping.shift(),
            files: BTreeSet::new(),
            number_fullpath_matches: None,
        }
    }

    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_min_matches(mut self, count: usize) -> Self {
        self.number_fullpath_matches = Some(count);
        self
    }

    /// Validated forward mapping
    pub fn to_mapping(&self) -> ChronoResult<TimeMapping> {
        TimeMapping::new(self.scale, self.shift).map_err(|_| ChronoError::MalformedMappingRecord {
            source_name: self.describe(),
            reason: format!("degenerate mapping scale {} shift {}", self.scale, self.shift),
        })
    }

    /// Does the record relate exactly these two devices, in either order?
    pub fn relates(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// Mapping from `from_device`'s clock to the other device's clock:
    /// forward when `from_device` is the declared source, inverted otherwise
    pub fn mapping_from(&self, from_device: &str) -> ChronoResult<Option<TimeMapping>> {
        if from_device == self.source {
            Ok(Some(self.to_mapping()?))
        } else if from_device == self.target {
            Ok(Some(self.to_mapping()?.invert()))
        } else {
            Ok(None)
        }
    }

    /// Does `node` list at least `min_matches` of the record's files?
    pub fn covers(&self, node: &EpochNode, min_matches: usize) -> bool {
        node.files_listed_in(&self.files) >= min_matches
    }

    /// Read a sync file. Its content is either two numbers, shift then
    /// scale, or a JSON object with `shift` and `scale` fields.
    pub fn from_sync_file(
        path: &Path,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> ChronoResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ChronoError::MappingRecordIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mapping = parse_sync_text(&path.display().to_string(), &text)?;
        Ok(MappingRecord::new(source, target, mapping))
    }

    fn describe(&self) -> String {
        format!("{} -> {}", self.source, self.target)
    }
}

/// Parse sync-file text into a validated mapping
pub fn parse_sync_text(source_name: &str, text: &str) -> ChronoResult<TimeMapping> {
    let malformed = |reason: String| ChronoError::MalformedMappingRecord {
        source_name: source_name.to_string(),
        reason,
    };

    let trimmed = text.trim();
    let params = if trimmed.starts_with('{') {
        serde_json::from_str::<LinearParams>(trimmed).map_err(|e| malformed(e.to_string()))?
    } else {
        let numbers = trimmed
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("not a number: {token:?}")))
            })
            .collect::<ChronoResult<Vec<f64>>>()?;
        if numbers.len() < 2 {
            return Err(malformed(format!(
                "expected shift and scale, found {} value(s)",
                numbers.len()
            )));
        }
        LinearParams {
            shift: numbers[0],
            scale: numbers[1],
        }
    };

    TimeMapping::new(params.scale, params.shift).map_err(|_| {
        malformed(format!(
            "degenerate mapping scale {} shift {}",
            params.scale, params.shift
        ))
    })
}

/// Mapping records keyed by unordered device pair
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MappingRecord>", into = "Vec<MappingRecord>")]
pub struct MappingRecordSet {
    records: BTreeMap<(String, String), MappingRecord>,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

impl MappingRecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record for the same device pair.
    /// Degenerate mappings are rejected here, not at lookup.
    pub fn insert(&mut self, record: MappingRecord) -> ChronoResult<()> {
        record.to_mapping()?;
        if record.source == record.target {
            return Err(ChronoError::MalformedMappingRecord {
                source_name: record.describe(),
                reason: "source and target must be different devices".into(),
            });
        }
        let key = pair_key(&record.source, &record.target);
        self.records.insert(key, record);
        Ok(())
    }

    /// Record relating `a` and `b`, in either declared direction
    pub fn lookup(&self, a: &str, b: &str) -> Option<&MappingRecord> {
        self.records.get(&pair_key(a, b))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingRecord> {
        self.records.values()
    }

    /// Load a JSON array of records
    pub fn load_json(path: &Path) -> ChronoResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| ChronoError::MappingRecordIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        let set: MappingRecordSet =
            serde_json::from_str(&text).map_err(|e| ChronoError::MalformedMappingRecord {
                source_name: path.display().to_string(),
                reason: e.to_string(),
            })?;
        debug!(path = %path.display(), records = set.len(), "loaded mapping records");
        Ok(set)
    }
}

impl TryFrom<Vec<MappingRecord>> for MappingRecordSet {
    type Error = ChronoError;

    fn try_from(records: Vec<MappingRecord>) -> Result<Self, Self::Error> {
        let mut set = MappingRecordSet::new();
        for record in records {
            set.insert(record)?;
        }
        Ok(set)
    }
}

impl From<MappingRecordSet> for Vec<MappingRecord> {
    fn from(set: MappingRecordSet) -> Self {
        set.records.into_values().collect()
    }
}
