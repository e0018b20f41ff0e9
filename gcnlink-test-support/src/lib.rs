//! Shared test utilities used across gcnlink crates.

pub mod ci;
pub mod tracing;
