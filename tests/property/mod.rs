//! Property-based tests for snapshot guarantees

mod decision;
