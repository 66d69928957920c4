//! Infrastructure layer for stackweave.
//!
//! Filesystem adapters around the pure engine in `stackweave-core`: the
//! catalog scanner, YAML document loaders, project configuration, the output
//! writer, and the end-to-end stack runner.

pub mod config;
pub mod digest;
pub mod documents;
pub mod runner;
pub mod scanner;
pub mod writer;
