//! Logging and trace export setup for stackweave binaries.

pub mod tracing_setup;
