//! Worker IPC endpoints and the environment a spawned worker inherits.
//!
//! The standalone driver exports the following variables into every child so
//! the worker can find out who it is and where to listen:
//!
//! | Variable              | Content                          |
//! |-----------------------|----------------------------------|
//! | `ZSW_POOL_INSTANCE`   | fingerprint of the owning pool   |
//! | `ZSW_WORKER_ID`       | the worker's sequential ID       |
//! | `ZSW_WORKER_NAME`     | the worker's logical name        |
//! | `ZSW_WORKER_SOCKET`   | the worker's IPC address         |

use crate::{Error, Result, WorkerId};
use std::path::{Path, PathBuf};

pub const ENV_POOL_INSTANCE: &str = "ZSW_POOL_INSTANCE";
pub const ENV_WORKER_ID: &str = "ZSW_WORKER_ID";
pub const ENV_WORKER_NAME: &str = "ZSW_WORKER_NAME";
pub const ENV_WORKER_SOCKET: &str = "ZSW_WORKER_SOCKET";

/// The IPC endpoint exported by a worker process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSocket {
    worker_id: WorkerId,
    path: PathBuf,
}

impl WorkerSocket {
    pub fn new(worker_id: WorkerId, path: impl Into<PathBuf>) -> Self {
        Self {
            worker_id,
            path: path.into(),
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connects to the worker listening on this endpoint.
    #[cfg(unix)]
    pub async fn connect(&self) -> std::io::Result<tokio::net::UnixStream> {
        tokio::net::UnixStream::connect(&self.path).await
    }

    /// Binds the endpoint from inside the worker process.
    ///
    /// Must be called from within a Tokio runtime.
    #[cfg(unix)]
    pub fn bind(&self) -> std::io::Result<tokio::net::UnixListener> {
        tokio::net::UnixListener::bind(&self.path)
    }
}

/// Identity of the current process as a pool worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerEnv {
    pub instance_id: String,
    pub worker_id: WorkerId,
    pub name: String,
    pub socket: WorkerSocket,
}

impl WorkerEnv {
    /// Reads the worker identity exported by the standalone driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`] if a variable is absent and
    /// [`Error::InvalidEnv`] if the worker ID is not a number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`WorkerEnv::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |var: &'static str| lookup(var).ok_or(Error::MissingEnv { var });

        let instance_id = require(ENV_POOL_INSTANCE)?;
        let raw_id = require(ENV_WORKER_ID)?;
        let worker_id = raw_id.parse().map_err(|_| Error::InvalidEnv {
            var: ENV_WORKER_ID,
            value: raw_id.clone(),
        })?;
        let name = require(ENV_WORKER_NAME)?;
        let socket = WorkerSocket::new(worker_id, require(ENV_WORKER_SOCKET)?);

        Ok(Self {
            instance_id,
            worker_id,
            name,
            socket,
        })
    }

    /// The variables a driver exports for this identity.
    pub fn to_vars(&self) -> [(&'static str, String); 4] {
        [
            (ENV_POOL_INSTANCE, self.instance_id.clone()),
            (ENV_WORKER_ID, self.worker_id.to_string()),
            (ENV_WORKER_NAME, self.name.clone()),
            (
                ENV_WORKER_SOCKET,
                self.socket.path().to_string_lossy().into_owned(),
            ),
        ]
    }
}
