//! Utility modules shared by the SceneGraph crates.
//!
//! # Modules
//!
//! - [`names`]: node name normalization and de-duplication

pub mod names;
