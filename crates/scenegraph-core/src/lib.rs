//! SceneGraph Core: shared types, errors, and utilities.
//!
//! This crate provides the foundational types used across all SceneGraph
//! crates. It has no internal SceneGraph dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`ids`]: Node identifiers
//! - [`value`]: Dynamic attribute values and type tags
//! - [`util`]: Name utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ids;
pub mod util;
pub mod value;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use ids::NodeId;
pub use value::{AttrType, Value};
