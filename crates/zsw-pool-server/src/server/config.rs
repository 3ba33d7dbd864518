use anyhow::{Context, bail};
use clap::Parser;
use core::{str::FromStr, time::Duration};
use std::path::PathBuf;
use zsw_pool::{DEFAULT_UNIX_DIR, DEFAULT_UNIX_PREFIX, WorkerCommand};

/// Runtime configuration for the `zsw-pool` binary.
///
/// All values are parsed from CLI arguments or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "zsw-pool",
    version,
    about = "Runs a pool of worker processes, each with its own unix socket address"
)]
pub struct CliArgs {
    /// Directory the worker sockets are created in. Must be writable.
    ///
    /// Environment variable: `ZSW_UNIX_DIR`
    #[arg(long, env = "ZSW_UNIX_DIR", default_value = DEFAULT_UNIX_DIR)]
    pub unix_dir: PathBuf,

    /// File name prefix of every worker socket.
    ///
    /// Environment variable: `ZSW_UNIX_PREFIX`
    #[arg(long, env = "ZSW_UNIX_PREFIX", default_value = DEFAULT_UNIX_PREFIX)]
    pub unix_prefix: String,

    /// A worker as `NAME=COMMAND [ARGS...]`. Repeat the flag for more
    /// workers; IDs follow the order given. The value is taken whole, so the
    /// command may contain commas. Takes precedence over `--workers`.
    #[arg(long = "worker")]
    pub worker: Vec<String>,

    /// Comma-delimited list of workers, each `NAME=COMMAND [ARGS...]`.
    /// Commands given this way cannot contain commas.
    ///
    /// Environment variable: `ZSW_WORKERS`
    #[arg(long = "workers", env = "ZSW_WORKERS", value_delimiter = ',')]
    pub workers: Vec<String>,

    /// Seconds to wait for each worker to exit on shutdown.
    ///
    /// Environment variable: `ZSW_SHUTDOWN_TIMEOUT`
    #[arg(long, env = "ZSW_SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

/// A worker parsed from its `NAME=COMMAND [ARGS...]` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub name: String,
    pub command: WorkerCommand,
}

impl FromStr for WorkerSpec {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (name, command) = raw
            .split_once('=')
            .with_context(|| format!("worker `{raw}` is not of the form NAME=COMMAND"))?;

        let name = name.trim();
        if name.is_empty() {
            bail!("worker `{raw}` has an empty name");
        }

        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            bail!("worker `{name}` has an empty command");
        };

        Ok(Self {
            name: name.to_owned(),
            command: WorkerCommand::new(program).args(parts),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PoolServerConfig {
    pub unix_dir: PathBuf,
    pub unix_prefix: String,
    pub workers: Vec<WorkerSpec>,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for PoolServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.unix_prefix.is_empty() {
            bail!("ZSW_UNIX_PREFIX must not be empty");
        }
        if args.unix_prefix.contains('/') {
            bail!(
                "ZSW_UNIX_PREFIX ({}) must not contain a path separator",
                args.unix_prefix
            );
        }

        let raw_workers = if args.worker.is_empty() {
            &args.workers
        } else {
            &args.worker
        };
        let workers = raw_workers
            .iter()
            .map(|raw| raw.parse())
            .collect::<anyhow::Result<Vec<WorkerSpec>>>()?;
        if workers.is_empty() {
            bail!("at least one worker must be configured");
        }

        Ok(Self {
            unix_dir: args.unix_dir,
            unix_prefix: args.unix_prefix,
            workers,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}
