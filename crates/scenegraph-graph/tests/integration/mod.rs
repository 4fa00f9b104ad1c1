//! Integration tests.

mod editing;
mod persistence;
mod split_edge;
mod templates;
