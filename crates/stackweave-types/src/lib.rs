//! Shared domain types for stackweave.
//!
//! Fragments ("skills"), consumer definitions ("agents"), stack selections,
//! relationship rules, run reports and the error taxonomy used across the
//! workspace.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod consumer;
pub mod error;
pub mod fragment;
pub mod relationship;
pub mod report;
