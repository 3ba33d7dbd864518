use super::config::PoolServerConfig;
use std::sync::Arc;
use zsw_pool::{
    CommandWorker, ProcessPool, StandaloneConfig, StandaloneDriver, TracingLogger,
};

/// Builds a standalone pool with every configured worker registered, in
/// order, and pool logs forwarded to `tracing`.
pub fn build_pool(config: &PoolServerConfig) -> zsw_pool::Result<ProcessPool<StandaloneDriver>> {
    let mut pool = ProcessPool::standalone_with(StandaloneConfig {
        shutdown_timeout: config.shutdown_timeout,
        ..StandaloneConfig::default()
    });
    pool.set_logger(Arc::new(TracingLogger));
    pool.set_unix_dir(&config.unix_dir)?;
    pool.set_unix_prefix(&config.unix_prefix)?;

    for worker in &config.workers {
        let id = pool.add(CommandWorker::new(&worker.name, worker.command.clone()));
        tracing::debug!(worker = %worker.name, id, "registered worker");
    }

    let instance_id = pool.instance_id().to_owned();
    let workers = pool.len();
    pool.on_start(move || {
        tracing::info!(instance_id = %instance_id, workers, "process pool is up");
    });

    Ok(pool)
}
