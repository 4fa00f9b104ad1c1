//! Property-based tests for graph invariants.
