//! Error types for the synchronization engine

use std::path::PathBuf;

use thiserror::Error;

use crate::NodeIndex;

/// Core chronograph errors
#[derive(Error, Debug)]
pub enum ChronoError {
    // Numeric errors
    #[error("Invalid time mapping: scale {scale}, shift {shift}")]
    InvalidMapping { scale: f64, shift: f64 },

    // Configuration errors
    #[error("Invalid parameters for sync rule {rule}: {reason}")]
    InvalidRuleParameters { rule: &'static str, reason: String },

    #[error("Malformed mapping record {source_name}: {reason}")]
    MalformedMappingRecord { source_name: String, reason: String },

    #[error("Cannot read mapping record {path:?}: {source}")]
    MappingRecordIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cost policy: {0}")]
    InvalidCostPolicy(String),

    #[error("Invalid rule document: {0}")]
    InvalidRuleDocument(#[from] serde_json::Error),

    // Connectivity errors
    #[error("No synchronization path from {from} to {to}")]
    NoPath { from: String, to: String },

    // Graph errors
    #[error("Graph capacity exceeded: at most {max} epoch nodes")]
    GraphCapacity { max: usize },

    #[error("Invalid node index: {0}")]
    InvalidNodeIndex(NodeIndex),

    #[error("Invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: NodeIndex,
        to: NodeIndex,
        reason: String,
    },
}

impl ChronoError {
    /// Is this the expected "not known to be synchronized" outcome?
    ///
    /// Callers probing synchronizability branch on this instead of treating
    /// the error as fatal.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ChronoError::NoPath { .. })
    }

    /// Configuration errors are fatal at construction or registration time.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ChronoError::InvalidRuleParameters { .. }
                | ChronoError::MalformedMappingRecord { .. }
                | ChronoError::MappingRecordIo { .. }
                | ChronoError::InvalidCostPolicy(_)
                | ChronoError::InvalidRuleDocument(_)
        )
    }
}

/// Result type for chronograph operations
pub type ChronoResult<T> = Result<T, ChronoError>;
