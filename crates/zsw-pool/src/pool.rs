//! The pool orchestrator.
//!
//! [`ProcessPool`] is the registry and coordination layer: it hands out
//! sequential worker IDs, keeps the name index, derives each worker's IPC
//! address and validates the IPC directory before handing the worker set to
//! its [`PoolDriver`]. It never spawns or terminates a process itself.

use crate::{
    Error, Result, WorkerId,
    driver::{
        PoolDriver, ServerDriver, ServerRuntime, StandaloneConfig, StandaloneDriver, StartHook,
        WorkerProcess,
    },
    logger::SharedLogger,
    socket::WorkerSocket,
    unix::PoolShared,
    worker::{SubProcess, WorkerDescriptor},
};
use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

/// A named collection of worker processes bound to one driver.
///
/// # Example
///
/// ```no_run
/// use zsw_pool::{CommandWorker, ProcessPool, WorkerCommand};
///
/// # async fn run() -> zsw_pool::Result<()> {
/// let mut pool = ProcessPool::standalone();
/// pool.add(CommandWorker::new("api", WorkerCommand::new("./api-worker")));
/// pool.add(CommandWorker::new("task", WorkerCommand::new("./task-worker")));
///
/// assert_eq!(pool.worker_id("task"), Some(1));
/// pool.start().await?;
///
/// let socket = pool.worker_socket("api");
/// # Ok(())
/// # }
/// ```
pub struct ProcessPool<D> {
    shared: Arc<PoolShared>,
    driver: D,
    workers: Vec<Arc<WorkerDescriptor>>,
    names: HashMap<String, WorkerId>,
    started: bool,
}

impl<R: ServerRuntime> ProcessPool<ServerDriver<R>> {
    /// Creates a pool whose processes are managed by an embedding server
    /// runtime.
    pub fn with_server(runtime: R) -> Self {
        Self::new(ServerDriver::new(runtime))
    }
}

impl ProcessPool<StandaloneDriver> {
    /// Creates a pool that spawns its workers as raw OS processes.
    pub fn standalone() -> Self {
        Self::standalone_with(StandaloneConfig::default())
    }

    pub fn standalone_with(config: StandaloneConfig) -> Self {
        Self::new(StandaloneDriver::new(config))
    }
}

impl<D: PoolDriver> ProcessPool<D> {
    /// Binds a new pool to `driver` for its whole lifetime.
    pub fn new(driver: D) -> Self {
        let shared = PoolShared::new();

        #[cfg(feature = "tracing")]
        tracing::debug!(instance_id = shared.instance_id(), "created process pool");

        Self {
            shared,
            driver,
            workers: Vec::new(),
            names: HashMap::new(),
            started: false,
        }
    }

    /// Fingerprint that namespaces this pool's IPC addresses.
    pub fn instance_id(&self) -> &str {
        self.shared.instance_id()
    }

    pub fn logger(&self) -> SharedLogger {
        self.shared.logger()
    }

    /// Replaces the logger shared with workers and the driver.
    pub fn set_logger(&mut self, logger: SharedLogger) {
        self.shared.set_logger(logger);
    }

    pub fn unix_dir(&self) -> PathBuf {
        self.shared.settings().dir
    }

    pub fn unix_prefix(&self) -> String {
        self.shared.settings().prefix
    }

    /// Sets the directory worker sockets live in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] once the pool has been started, since
    /// addresses are already in use by then.
    pub fn set_unix_dir(&mut self, dir: impl Into<PathBuf>) -> Result<()> {
        self.ensure_not_started()?;
        self.shared.set_dir(dir.into());
        Ok(())
    }

    /// Sets the file name prefix of worker sockets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] once the pool has been started.
    pub fn set_unix_prefix(&mut self, prefix: impl Into<String>) -> Result<()> {
        self.ensure_not_started()?;
        self.shared.set_prefix(prefix.into());
        Ok(())
    }

    pub fn master_pid(&self) -> u32 {
        self.driver.master_pid()
    }

    /// Registers the callback run once the pool is active. A later
    /// registration replaces an earlier one.
    pub fn on_start(&mut self, hook: impl FnOnce() + Send + 'static) {
        self.driver.on_pool_start(Box::new(hook) as StartHook);
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Registers a worker and returns its newly assigned ID.
    ///
    /// IDs are handed out sequentially from zero. Names are not checked for
    /// uniqueness: registering a second worker under an existing name points
    /// the name at the newer worker, while both stay registered under their
    /// IDs.
    pub fn add(&mut self, worker: impl SubProcess) -> WorkerId {
        let id = self.workers.len();
        let descriptor = Arc::new(WorkerDescriptor::new(
            id,
            Arc::new(worker),
            Arc::downgrade(&self.shared),
        ));

        if let Some(previous) = self.names.insert(descriptor.name().to_owned(), id) {
            self.shared.logger().warn(&format!(
                "worker name `{}` re-registered, id {previous} is no longer addressable by name",
                descriptor.name()
            ));
            #[cfg(feature = "tracing")]
            tracing::warn!(
                worker = descriptor.name(),
                previous,
                id,
                "duplicate worker name, last registration wins"
            );
        }
        self.workers.push(descriptor);
        id
    }

    /// Resolves a worker name to its ID.
    pub fn worker_id(&self, name: &str) -> Option<WorkerId> {
        self.names.get(name).copied()
    }

    /// Resolves a worker ID to its name.
    pub fn worker_name(&self, worker_id: WorkerId) -> Option<&str> {
        self.worker(worker_id).map(|worker| worker.name())
    }

    pub fn worker(&self, worker_id: WorkerId) -> Option<&Arc<WorkerDescriptor>> {
        self.workers.get(worker_id)
    }

    /// Every registered worker in ID order.
    pub fn workers(&self) -> &[Arc<WorkerDescriptor>] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// The IPC address of `worker_id`.
    ///
    /// For IDs that were never registered the path is still well-formed, it
    /// just addresses nothing.
    pub fn worker_unix(&self, worker_id: WorkerId) -> PathBuf {
        self.shared.worker_unix(worker_id)
    }

    /// The driver's live process handle for `worker_id`.
    pub fn worker_process(&self, worker_id: WorkerId) -> Option<Arc<dyn WorkerProcess>> {
        self.driver.worker_process(worker_id)
    }

    /// The IPC endpoint of the worker called `name`.
    ///
    /// `None` if the name is unknown or the driver has no live process for it
    /// yet (for example before [`start`](Self::start)).
    pub fn worker_socket(&self, name: &str) -> Option<WorkerSocket> {
        let worker_id = self.worker_id(name)?;
        self.worker_process(worker_id)?.export_socket()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Validates the IPC directory and hands every worker to the driver.
    ///
    /// Validation covers the whole worker set before the driver is touched,
    /// so a single bad address leaves no worker running. A start that fails,
    /// in validation or in the driver, leaves the pool unstarted so it can be
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`] if called more than once.
    /// - [`Error::DirNotWritable`] if the IPC directory cannot be written.
    /// - [`Error::UnixExists`] if any worker's address is already on disk.
    /// - Any error the driver reports while starting.
    pub async fn start(&mut self) -> Result<()> {
        self.ensure_not_started()?;
        self.unix_pre_check()?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            instance_id = self.instance_id(),
            workers = self.workers.len(),
            "starting process pool"
        );

        let logger = self.shared.logger();
        self.driver.start(self.workers.clone(), logger).await?;
        self.started = true;
        Ok(())
    }

    fn ensure_not_started(&self) -> Result<()> {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        Ok(())
    }

    fn unix_pre_check(&self) -> Result<()> {
        let dir = self.unix_dir();
        if !is_writable(&dir) {
            return Err(Error::DirNotWritable { dir });
        }

        for worker in &self.workers {
            let path = self.worker_unix(worker.id());
            // Any entry counts, stale sockets included.
            if path.symlink_metadata().is_ok() {
                return Err(Error::UnixExists { path });
            }
        }
        Ok(())
    }
}

/// Whether the current process can create files in `dir`.
fn is_writable(dir: &Path) -> bool {
    dir.is_dir() && probe(dir).is_ok()
}

fn probe(dir: &Path) -> io::Result<()> {
    tempfile::tempfile_in(dir).map(drop)
}
