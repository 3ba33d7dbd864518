//! Error types for the worker pool.
//!
//! This module defines the central `Error` enum, which captures every failure
//! the orchestrator or one of its drivers can report to the caller. Lookup
//! misses (unknown worker name, unknown worker ID, no live process yet) are not
//! errors; they surface as `None`.
//!
//! ## Error Cases
//! - `DirNotWritable`: The configured IPC directory cannot be written to.
//! - `UnixExists`: A worker's IPC address is already present on disk.
//! - `AlreadyStarted`: The pool was started twice, or reconfigured after start.
//! - `Spawn`: The standalone driver failed to launch a worker process.
//! - `NoCommand`: The standalone driver got a worker it has nothing to run for.
//! - `Runtime`: The embedding server runtime refused a worker.
//! - `MissingEnv` / `InvalidEnv`: A worker process could not read its identity
//!   from the environment.

use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error returned by an embedding [`ServerRuntime`].
///
/// [`ServerRuntime`]: crate::ServerRuntime
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for pool orchestration.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The IPC directory is missing, not a directory, or not writable.
    #[error("the dir({}) is not writable", .dir.display())]
    DirNotWritable { dir: PathBuf },

    /// A computed worker IPC address already exists, usually a stale socket
    /// left behind by a crashed pool.
    #[error("the unix({}) already exists", .path.display())]
    UnixExists { path: PathBuf },

    /// `start` was already called on this pool.
    #[error("process pool has already been started")]
    AlreadyStarted,

    /// A worker process could not be spawned.
    #[error("failed to spawn worker `{worker}`: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    /// The standalone driver was handed a worker without a command.
    #[error("worker `{worker}` has no command to spawn")]
    NoCommand { worker: String },

    /// The embedding runtime rejected a worker.
    #[error("server runtime rejected worker `{worker}`: {source}")]
    Runtime {
        worker: String,
        #[source]
        source: BoxError,
    },

    /// A required worker environment variable is not set.
    #[error("missing environment variable `{var}`")]
    MissingEnv { var: &'static str },

    /// A worker environment variable could not be parsed.
    #[error("invalid value `{value}` for environment variable `{var}`")]
    InvalidEnv { var: &'static str, value: String },
}
