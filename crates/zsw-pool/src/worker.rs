//! Worker implementations and the descriptors the pool tracks them with.

use crate::{
    events::WorkerEvents,
    logger::{SharedLogger, noop_logger},
    socket::{WorkerEnv, WorkerSocket},
    unix::PoolShared,
};
use core::fmt;
use std::{
    path::PathBuf,
    sync::{Arc, Weak},
};

/// Sequential, zero-based identifier assigned by the pool at registration.
pub type WorkerId = usize;

/// Caller-supplied worker logic.
///
/// The name is the external addressing key of the worker; it should be unique
/// within a pool. The command is what the standalone driver launches; workers
/// that only ever run under an embedding server runtime may leave it unset.
pub trait SubProcess: WorkerEvents + Send + Sync + 'static {
    /// Logical name of the worker.
    fn name(&self) -> &str;

    /// Program the standalone driver spawns for this worker.
    fn command(&self) -> Option<WorkerCommand> {
        None
    }
}

/// How to launch a worker as an operating-system process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub envs: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Sets the child's working directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// A [`SubProcess`] that runs a fixed command and reports its lifecycle
/// through `tracing`.
#[derive(Clone, Debug)]
pub struct CommandWorker {
    name: String,
    command: WorkerCommand,
}

impl CommandWorker {
    pub fn new(name: impl Into<String>, command: WorkerCommand) -> Self {
        Self {
            name: name.into(),
            command,
        }
    }
}

impl WorkerEvents for CommandWorker {
    fn on_worker_start(&self, _worker_id: WorkerId) {
        #[cfg(feature = "tracing")]
        tracing::info!(worker = %self.name, worker_id = _worker_id, "worker started");
    }

    fn on_worker_stop(&self, _worker_id: WorkerId) {
        #[cfg(feature = "tracing")]
        tracing::info!(worker = %self.name, worker_id = _worker_id, "worker stopped");
    }

    fn on_worker_exit(&self, _worker_id: WorkerId) {
        #[cfg(feature = "tracing")]
        tracing::debug!(worker = %self.name, worker_id = _worker_id, "worker exited cleanly");
    }

    fn on_worker_error(&self, _worker_id: WorkerId, _pid: u32, _exit_code: i32, _signal: i32) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            worker = %self.name,
            worker_id = _worker_id,
            pid = _pid,
            exit_code = _exit_code,
            signal = _signal,
            "worker terminated abnormally"
        );
    }
}

impl SubProcess for CommandWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn command(&self) -> Option<WorkerCommand> {
        Some(self.command.clone())
    }
}

/// One registered worker: its assigned ID, its name and the caller's logic.
///
/// The descriptor keeps a non-owning reference back to its pool so a worker
/// can look up its own IPC address and logger. Once the pool is dropped those
/// lookups come back empty.
pub struct WorkerDescriptor {
    id: WorkerId,
    name: String,
    worker: Arc<dyn SubProcess>,
    pool: Weak<PoolShared>,
}

impl WorkerDescriptor {
    pub(crate) fn new(id: WorkerId, worker: Arc<dyn SubProcess>, pool: Weak<PoolShared>) -> Self {
        Self {
            id,
            name: worker.name().to_owned(),
            worker,
            pool,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The caller-supplied worker logic.
    pub fn worker(&self) -> &Arc<dyn SubProcess> {
        &self.worker
    }

    pub fn command(&self) -> Option<WorkerCommand> {
        self.worker.command()
    }

    /// Fingerprint of the owning pool, if it is still alive.
    pub fn instance_id(&self) -> Option<String> {
        self.pool
            .upgrade()
            .map(|pool| pool.instance_id().to_owned())
    }

    /// This worker's IPC address, if the owning pool is still alive.
    pub fn unix(&self) -> Option<PathBuf> {
        self.pool.upgrade().map(|pool| pool.worker_unix(self.id))
    }

    /// This worker's IPC endpoint, if the owning pool is still alive.
    pub fn socket(&self) -> Option<WorkerSocket> {
        self.unix().map(|path| WorkerSocket::new(self.id, path))
    }

    /// The identity a spawned process of this worker runs under.
    pub fn env(&self) -> Option<WorkerEnv> {
        let pool = self.pool.upgrade()?;
        Some(WorkerEnv {
            instance_id: pool.instance_id().to_owned(),
            worker_id: self.id,
            name: self.name.clone(),
            socket: WorkerSocket::new(self.id, pool.worker_unix(self.id)),
        })
    }

    /// The pool's current logger, or a no-op logger once the pool is gone.
    pub fn logger(&self) -> SharedLogger {
        self.pool
            .upgrade()
            .map_or_else(noop_logger, |pool| pool.logger())
    }
}

impl fmt::Debug for WorkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builder_accumulates() {
        let command = WorkerCommand::new("php")
            .arg("worker.php")
            .args(["--queue", "default"])
            .env("APP_ENV", "prod")
            .current_dir("/srv/app");

        assert_eq!(command.program, PathBuf::from("php"));
        assert_eq!(command.args, ["worker.php", "--queue", "default"]);
        assert_eq!(command.envs, [("APP_ENV".to_owned(), "prod".to_owned())]);
        assert_eq!(command.current_dir, Some(PathBuf::from("/srv/app")));
    }

    #[test]
    fn descriptor_resolves_through_live_pool_only() {
        let shared = PoolShared::new();
        let worker = Arc::new(CommandWorker::new("api", WorkerCommand::new("true")));
        let descriptor = WorkerDescriptor::new(2, worker, Arc::downgrade(&shared));

        assert_eq!(descriptor.name(), "api");
        assert_eq!(descriptor.unix(), Some(shared.worker_unix(2)));
        assert_eq!(descriptor.instance_id().as_deref(), Some(shared.instance_id()));
        assert_eq!(descriptor.socket().map(|socket| socket.worker_id()), Some(2));
        let env = descriptor.env().unwrap();
        assert_eq!(env.name, "api");
        assert_eq!(env.socket.path(), shared.worker_unix(2));

        drop(shared);
        assert_eq!(descriptor.unix(), None);
        assert!(descriptor.socket().is_none());
        assert!(descriptor.instance_id().is_none());
        assert!(descriptor.env().is_none());
        descriptor.logger().info("still safe to log");
    }
}
