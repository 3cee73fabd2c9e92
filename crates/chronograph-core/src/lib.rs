//! Chronograph Core - Fundamental types and primitives
//!
//! This crate defines the value types shared by the synchronization engine:
//! - Clock types and the semantic axes they belong to
//! - Affine time mappings between clock domains
//! - Epoch nodes (one epoch on one clock of one device) and their handles
//! - The error taxonomy

pub mod clock;
pub mod error;
pub mod id;
pub mod mapping;
pub mod node;

pub use clock::*;
pub use error::*;
pub use id::*;
pub use mapping::*;
pub use node::*;
