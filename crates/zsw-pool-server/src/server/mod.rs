//! Components of the `zsw-pool` binary.
//!
//! - [`config`] - CLI and environment configuration.
//! - [`pool`] - Builds the standalone process pool from a validated config.
//! - [`telemetry`] - `tracing` subscriber setup.

pub mod config;
pub mod pool;
pub mod telemetry;
