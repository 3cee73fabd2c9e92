//! Chronograph Sync - Clock synchronization graph and time conversion
//!
//! This crate implements the synchronization engine:
//! - Sync rules that relate epochs of different devices
//! - External mapping records read by the file-based rule
//! - The synchronization graph: epoch nodes, weighted edges, rebuilds
//! - Time conversion by cheapest path and mapping composition
//! - Per-session single-writer / many-reader access

pub mod config;
pub mod convert;
pub mod graph;
pub mod logging;
pub mod record;
pub mod rules;
pub mod session;

pub use config::*;
pub use convert::*;
pub use graph::*;
pub use record::*;
pub use rules::*;
pub use session::*;
