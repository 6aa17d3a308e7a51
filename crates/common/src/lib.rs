//! Shared message and directory types used across all herald crates.

pub mod types;
