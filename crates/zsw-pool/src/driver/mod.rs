//! Process drivers.
//!
//! A driver owns the actual worker processes: it spawns or activates them,
//! tracks their handles by worker ID and knows the PID of the coordinating
//! process. The orchestrator only ever talks to a driver through
//! [`PoolDriver`].
//!
//! ## Variants
//!
//! - [`ServerDriver`] - adapts an embedding server runtime that already
//!   manages processes.
//! - [`StandaloneDriver`] - spawns and reaps raw OS processes itself.
//!
//! The trait is sealed: those two are the only drivers a pool can be bound
//! to.

pub mod server;
pub mod standalone;

pub use server::{ServerDriver, ServerRuntime};
pub use standalone::{ProcessHandle, StandaloneConfig, StandaloneDriver};

use crate::{
    Result, WorkerId,
    logger::SharedLogger,
    socket::WorkerSocket,
    worker::WorkerDescriptor,
};
use core::future::Future;
use std::sync::Arc;

/// Callback run once when a pool becomes active.
pub type StartHook = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a live worker process owned by a driver.
pub trait WorkerProcess: Send + Sync {
    fn worker_id(&self) -> WorkerId;

    /// OS process ID, if the process is still known to be running.
    fn pid(&self) -> Option<u32>;

    /// The IPC endpoint of this worker, if it can still be addressed.
    fn export_socket(&self) -> Option<WorkerSocket>;
}

pub(crate) mod sealed {
    pub trait Sealed {}
}

/// Capability set every pool driver provides.
pub trait PoolDriver: sealed::Sealed + Send + Sync {
    /// Takes ownership of the lifecycle of `workers`.
    ///
    /// Resolves once the driver's synchronous setup is done. There is no
    /// timeout: a driver that never finishes setting up blocks the caller.
    fn start(
        &mut self,
        workers: Vec<Arc<WorkerDescriptor>>,
        logger: SharedLogger,
    ) -> impl Future<Output = Result<()>> + Send;

    /// PID of the coordinating process.
    fn master_pid(&self) -> u32;

    /// Live process handle of a worker, if it has been spawned and has not
    /// exited.
    fn worker_process(&self, worker_id: WorkerId) -> Option<Arc<dyn WorkerProcess>>;

    /// Registers the callback run once the pool is active. Only one hook is
    /// kept; registering another replaces it.
    fn on_pool_start(&mut self, hook: StartHook);
}
