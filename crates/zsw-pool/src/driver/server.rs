//! Driver for pools embedded in a server runtime that manages processes.
//!
//! The runtime (an application server, a supervisor the caller already runs)
//! owns the worker processes. [`ServerDriver`] only translates the pool's
//! worker set into the runtime's process registration calls and remembers the
//! handles it gets back.

use super::{PoolDriver, StartHook, WorkerProcess, sealed};
use crate::{
    Error, Result, WorkerId,
    error::BoxError,
    logger::SharedLogger,
    worker::WorkerDescriptor,
};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

/// Process-management surface of an embedding server runtime.
pub trait ServerRuntime: Send + Sync + 'static {
    /// PID of the runtime's own (master) process.
    fn master_pid(&self) -> u32;

    /// Registers a worker with the runtime and returns its process handle.
    fn add_process(
        &self,
        worker: &Arc<WorkerDescriptor>,
        logger: &SharedLogger,
    ) -> core::result::Result<Arc<dyn WorkerProcess>, BoxError>;

    /// Schedules `hook` to run once the runtime is serving.
    ///
    /// Runtimes that are already serving when the pool starts can keep the
    /// default, which runs the hook right away.
    fn on_start(&self, hook: StartHook) {
        hook();
    }
}

/// Pool driver backed by an embedding [`ServerRuntime`].
pub struct ServerDriver<R> {
    runtime: R,
    processes: HashMap<WorkerId, Arc<dyn WorkerProcess>>,
    hook: Mutex<Option<StartHook>>,
}

impl<R: ServerRuntime> ServerDriver<R> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            processes: HashMap::new(),
            hook: Mutex::new(None),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R: ServerRuntime> sealed::Sealed for ServerDriver<R> {}

impl<R: ServerRuntime> PoolDriver for ServerDriver<R> {
    async fn start(
        &mut self,
        workers: Vec<Arc<WorkerDescriptor>>,
        logger: SharedLogger,
    ) -> Result<()> {
        // Handles become visible only once every worker has been accepted.
        let mut processes = HashMap::with_capacity(workers.len());
        for worker in &workers {
            let process =
                self.runtime
                    .add_process(worker, &logger)
                    .map_err(|source| Error::Runtime {
                        worker: worker.name().to_owned(),
                        source,
                    })?;

            #[cfg(feature = "tracing")]
            tracing::debug!(
                worker = worker.name(),
                worker_id = worker.id(),
                "registered worker with server runtime"
            );
            processes.insert(worker.id(), process);
        }
        self.processes = processes;

        logger.info(&format!(
            "{} workers handed to server runtime (master pid {})",
            workers.len(),
            self.runtime.master_pid()
        ));

        if let Some(hook) = self.hook.get_mut().take() {
            self.runtime.on_start(hook);
        }
        Ok(())
    }

    fn master_pid(&self) -> u32 {
        self.runtime.master_pid()
    }

    fn worker_process(&self, worker_id: WorkerId) -> Option<Arc<dyn WorkerProcess>> {
        self.processes.get(&worker_id).cloned()
    }

    fn on_pool_start(&mut self, hook: StartHook) {
        *self.hook.get_mut() = Some(hook);
    }
}
