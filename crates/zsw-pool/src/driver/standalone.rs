//! Driver that spawns and reaps raw OS worker processes.
//!
//! Each worker is launched from its [`WorkerCommand`] with the pool identity
//! exported through the `ZSW_*` environment variables (see
//! [`WorkerEnv`]). A monitor task per child waits for it to exit, drops
//! its handle and dispatches the worker's lifecycle callbacks. Exited workers
//! are not restarted.
//!
//! Shutdown is cooperative via a shared [`CancellationToken`]: cancelling it
//! makes every monitor kill its child and wait for it.
//!
//! [`WorkerCommand`]: crate::WorkerCommand
//! [`WorkerEnv`]: crate::WorkerEnv

use super::{PoolDriver, StartHook, WorkerProcess, sealed};
use crate::{
    Error, Result, WorkerId,
    logger::SharedLogger,
    socket::WorkerSocket,
    worker::WorkerDescriptor,
};
use core::time::Duration;
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, io, process::ExitStatus, process::Stdio, sync::Arc};
use tokio::{process::Command, task::JoinHandle, time::timeout};
use tokio_util::sync::CancellationToken;

/// Tuning for [`StandaloneDriver`].
#[derive(Clone, Debug)]
pub struct StandaloneConfig {
    /// How long to wait for each worker to exit once shutdown is requested.
    pub shutdown_timeout: Duration,
    /// Whether children share the parent's stdin/stdout/stderr. When false
    /// they are attached to the null device.
    pub inherit_stdio: bool,
}

impl Default for StandaloneConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(3),
            inherit_stdio: true,
        }
    }
}

/// Handle to a child process spawned by [`StandaloneDriver`].
#[derive(Debug)]
pub struct ProcessHandle {
    worker: Arc<WorkerDescriptor>,
    pid: Option<u32>,
}

impl WorkerProcess for ProcessHandle {
    fn worker_id(&self) -> WorkerId {
        self.worker.id()
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn export_socket(&self) -> Option<WorkerSocket> {
        self.worker.socket()
    }
}

type ProcessTable = Arc<RwLock<HashMap<WorkerId, Arc<ProcessHandle>>>>;

/// Pool driver that owns the full spawn, monitor and reap cycle of its
/// workers.
///
/// Must be started from within a Tokio runtime.
pub struct StandaloneDriver {
    config: StandaloneConfig,
    workers: Vec<Arc<WorkerDescriptor>>,
    processes: ProcessTable,
    monitors: Vec<(WorkerId, JoinHandle<()>)>,
    shutdown_token: CancellationToken,
    hook: Mutex<Option<StartHook>>,
}

impl Default for StandaloneDriver {
    fn default() -> Self {
        Self::new(StandaloneConfig::default())
    }
}

impl StandaloneDriver {
    pub fn new(config: StandaloneConfig) -> Self {
        Self {
            config,
            workers: Vec::new(),
            processes: Arc::new(RwLock::new(HashMap::new())),
            monitors: Vec::new(),
            shutdown_token: CancellationToken::new(),
            hook: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &StandaloneConfig {
        &self.config
    }

    /// Number of workers whose process is currently running.
    pub fn live_workers(&self) -> usize {
        self.processes.read().len()
    }

    /// Kills every worker and waits (up to the configured timeout per worker)
    /// for them to be reaped, then removes their socket files.
    pub async fn shutdown(&mut self) {
        #[cfg(feature = "tracing")]
        tracing::info!("Shutting down {} worker processes", self.live_workers());
        self.shutdown_token.cancel();
        self.reap().await;

        for worker in &self.workers {
            if let Some(path) = worker.unix() {
                // Best effort; the worker may never have bound its socket.
                let _ = std::fs::remove_file(path);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Worker pool shutdown complete");
    }

    async fn reap(&mut self) {
        let shutdown_timeout = self.config.shutdown_timeout;
        let pending = self.monitors.drain(..).map(|(_id, monitor)| async move {
            match timeout(shutdown_timeout, monitor).await {
                Ok(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Worker {_id} reaped");
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Worker {_id} monitor failed: {_e}");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Worker {_id} did not exit within {shutdown_timeout:?}");
                }
            }
        });

        futures::future::join_all(pending).await;
    }

    fn spawn_worker(&mut self, worker: &Arc<WorkerDescriptor>, logger: &SharedLogger) -> Result<()> {
        let command = worker.command().ok_or_else(|| Error::NoCommand {
            worker: worker.name().to_owned(),
        })?;

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .envs(command.envs.iter().map(|(key, value)| (key, value)))
            .kill_on_drop(true);
        if let Some(env) = worker.env() {
            process.envs(env.to_vars());
        }
        if let Some(dir) = &command.current_dir {
            process.current_dir(dir);
        }
        if !self.config.inherit_stdio {
            process
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
        }

        let mut child = process.spawn().map_err(|source| Error::Spawn {
            worker: worker.name().to_owned(),
            source,
        })?;
        let pid = child.id();

        #[cfg(feature = "tracing")]
        tracing::info!(
            pid,
            program = %command.program.display(),
            worker = worker.name(),
            worker_id = worker.id(),
            "spawned worker process"
        );
        logger.info(&format!(
            "worker {}#{} started with pid {}",
            worker.name(),
            worker.id(),
            pid.unwrap_or_default()
        ));

        self.processes.write().insert(
            worker.id(),
            Arc::new(ProcessHandle {
                worker: Arc::clone(worker),
                pid,
            }),
        );
        worker.worker().on_worker_start(worker.id());

        let processes = Arc::clone(&self.processes);
        let shutdown_token = self.shutdown_token.clone();
        let monitored = Arc::clone(worker);
        let logger = Arc::clone(logger);
        let monitor = tokio::spawn(async move {
            let (status, requested) = tokio::select! {
                status = child.wait() => (status, false),
                () = shutdown_token.cancelled() => {
                    if let Err(_e) = child.start_kill() {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("failed to kill worker {}: {_e}", monitored.id());
                    }
                    (child.wait().await, true)
                }
            };

            processes.write().remove(&monitored.id());
            report_exit(&monitored, pid.unwrap_or_default(), status, requested, &logger);
        });
        self.monitors.push((worker.id(), monitor));

        Ok(())
    }
}

impl Drop for StandaloneDriver {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

/// Dispatches the lifecycle callbacks of a reaped worker.
///
/// Exits requested through shutdown count as clean even though the child was
/// killed by a signal.
fn report_exit(
    worker: &WorkerDescriptor,
    pid: u32,
    status: io::Result<ExitStatus>,
    requested: bool,
    logger: &SharedLogger,
) {
    let id = worker.id();
    let events = worker.worker();

    match status {
        Ok(status) if status.success() || requested => {
            logger.info(&format!("worker {}#{id} exited", worker.name()));
            events.on_worker_exit(id);
        }
        Ok(status) => {
            let exit_code = status.code().unwrap_or(-1);
            let signal = exit_signal(&status);
            logger.error(&format!(
                "worker {}#{id} (pid {pid}) terminated with code {exit_code}, signal {signal}",
                worker.name()
            ));
            events.on_worker_error(id, pid, exit_code, signal);
        }
        Err(err) => {
            logger.error(&format!(
                "failed to wait for worker {}#{id} (pid {pid}): {err}",
                worker.name()
            ));
            events.on_worker_error(id, pid, -1, 0);
        }
    }

    events.on_worker_stop(id);
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().unwrap_or(0)
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> i32 {
    0
}

impl sealed::Sealed for StandaloneDriver {}

impl PoolDriver for StandaloneDriver {
    async fn start(
        &mut self,
        workers: Vec<Arc<WorkerDescriptor>>,
        logger: SharedLogger,
    ) -> Result<()> {
        for worker in &workers {
            if let Err(err) = self.spawn_worker(worker, &logger) {
                logger.error(&format!("aborting pool start: {err}"));
                // Take down whatever was already spawned.
                self.shutdown_token.cancel();
                self.reap().await;
                self.shutdown_token = CancellationToken::new();
                return Err(err);
            }
        }
        self.workers = workers;

        if let Some(hook) = self.hook.get_mut().take() {
            hook();
        }
        Ok(())
    }

    fn master_pid(&self) -> u32 {
        std::process::id()
    }

    fn worker_process(&self, worker_id: WorkerId) -> Option<Arc<dyn WorkerProcess>> {
        self.processes
            .read()
            .get(&worker_id)
            .map(|handle| Arc::clone(handle) as Arc<dyn WorkerProcess>)
    }

    fn on_pool_start(&mut self, hook: StartHook) {
        *self.hook.get_mut() = Some(hook);
    }
}
