//! Per-pool IPC addressing.
//!
//! Every worker is reachable through a unix domain socket whose path is a pure
//! function of the pool's IPC directory, prefix, instance fingerprint and the
//! worker's ID:
//!
//! ```text
//! {unix_dir}/{unix_prefix}.{instance_id}.{worker_id}.sock
//! ```
//!
//! The instance fingerprint keeps two pools running on the same host (or a
//! pool and the stale sockets of a crashed predecessor) from sharing paths.

use crate::{
    WorkerId,
    logger::{SharedLogger, noop_logger},
};
use core::hash::{Hash, Hasher};
use parking_lot::RwLock;
use rustc_hash::FxHasher;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Weak},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

/// Directory used for worker sockets unless reconfigured.
pub const DEFAULT_UNIX_DIR: &str = "/tmp";

/// File name prefix used for worker sockets unless reconfigured.
pub const DEFAULT_UNIX_PREFIX: &str = "zsw";

/// Renders the IPC address of `worker_id`.
pub fn render_unix(dir: &Path, prefix: &str, instance_id: &str, worker_id: WorkerId) -> PathBuf {
    dir.join(format!("{prefix}.{instance_id}.{worker_id}.sock"))
}

#[derive(Debug, Clone)]
pub(crate) struct UnixSettings {
    pub(crate) dir: PathBuf,
    pub(crate) prefix: String,
}

impl Default for UnixSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_UNIX_DIR),
            prefix: DEFAULT_UNIX_PREFIX.to_owned(),
        }
    }
}

/// State the pool shares with its worker descriptors.
///
/// Descriptors only ever hold a [`Weak`] to this, so they can resolve their
/// address and logger at use time without keeping the pool alive.
pub(crate) struct PoolShared {
    instance_id: String,
    settings: RwLock<UnixSettings>,
    logger: RwLock<SharedLogger>,
}

impl PoolShared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            instance_id: instance_fingerprint(this.as_ptr() as usize),
            settings: RwLock::new(UnixSettings::default()),
            logger: RwLock::new(noop_logger()),
        })
    }

    pub(crate) fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub(crate) fn settings(&self) -> UnixSettings {
        self.settings.read().clone()
    }

    pub(crate) fn set_dir(&self, dir: PathBuf) {
        self.settings.write().dir = dir;
    }

    pub(crate) fn set_prefix(&self, prefix: String) {
        self.settings.write().prefix = prefix;
    }

    pub(crate) fn logger(&self) -> SharedLogger {
        self.logger.read().clone()
    }

    pub(crate) fn set_logger(&self, logger: SharedLogger) {
        *self.logger.write() = logger;
    }

    pub(crate) fn worker_unix(&self, worker_id: WorkerId) -> PathBuf {
        let settings = self.settings.read();
        render_unix(&settings.dir, &settings.prefix, &self.instance_id, worker_id)
    }
}

/// Derives a short hexadecimal fingerprint for a new pool.
///
/// Mixes the address of the pool's shared allocation with the wall clock, a
/// monotonic clock reading and the process id. Not a security boundary: collisions are unlikely, not
/// impossible.
fn instance_fingerprint(seed: usize) -> String {
    let mut hasher = FxHasher::default();
    seed.hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
        .hash(&mut hasher);
    Instant::now().hash(&mut hasher);
    std::process::id().hash(&mut hasher);

    let digest = hasher.finish();
    format!("{:08x}", (digest ^ (digest >> 32)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_unix_matches_layout() {
        let path = render_unix(Path::new("/tmp"), "zsw", "1a2b3c4d", 7);
        assert_eq!(path, PathBuf::from("/tmp/zsw.1a2b3c4d.7.sock"));
    }

    #[test]
    fn render_unix_ignores_trailing_separator() {
        let path = render_unix(Path::new("/var/run/"), "pool", "ff", 0);
        assert_eq!(path, PathBuf::from("/var/run/pool.ff.0.sock"));
    }

    #[test]
    fn fingerprint_is_eight_hex_digits() {
        let shared = PoolShared::new();
        let id = shared.instance_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_changes_over_time_for_same_seed() {
        let first = instance_fingerprint(0x1000);
        std::thread::sleep(std::time::Duration::from_millis(1));
        let second = instance_fingerprint(0x1000);
        assert_ne!(first, second);
    }

    #[test]
    fn settings_changes_are_visible_to_addresses() {
        let shared = PoolShared::new();
        shared.set_dir(PathBuf::from("/run/zsw"));
        shared.set_prefix("api".to_owned());

        let expected = format!("/run/zsw/api.{}.3.sock", shared.instance_id());
        assert_eq!(shared.worker_unix(3), PathBuf::from(expected));
    }
}
