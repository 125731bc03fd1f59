//! # Mirror Exclusion Lock
//!
//! Cross-process mutual exclusion for a mirror directory, built on OS
//! advisory file locks (`fs2`). Hook invocations are independent
//! processes that may be launched simultaneously by the scheduler, so an
//! in-process mutex would not help; the advisory lock serializes them at
//! the kernel level, and the kernel releases it if the holding process is
//! killed mid-update, so a crashed fetch never wedges later invocations.
//!
//! Acquisition is scoped: [`CacheLock::acquire`] returns a
//! [`CacheLockGuard`] that unlocks on drop, guaranteeing release on every
//! exit path, including error returns.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use log::debug;

use crate::error::{Error, Result};

/// How long to sleep between lock attempts while another process holds it.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A named cross-process lock keyed by a lock file path.
#[derive(Debug)]
pub struct CacheLock {
    path: PathBuf,
}

/// Held lock. The advisory lock is released when this guard is dropped,
/// or by the kernel if the process dies first.
#[derive(Debug)]
pub struct CacheLockGuard {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the lock, blocking up to `timeout`.
    ///
    /// Blocks by polling `try_lock_exclusive` rather than calling the
    /// unbounded `lock_exclusive`, so a hook stuck behind a slow update
    /// fails with [`Error::LockTimeout`] instead of hanging past the
    /// scheduler's own deadline.
    pub fn acquire(&self, timeout: Duration) -> Result<CacheLockGuard> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!("acquired lock {}", self.path.display());
                    return Ok(CacheLockGuard {
                        file,
                        path: self.path.clone(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                // fs2 reports contention as the platform's EWOULDBLOCK,
                // which std does not always map to WouldBlock
                Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {}
                Err(e) => return Err(Error::Io(e)),
            }

            let waited = started.elapsed();
            if waited >= timeout {
                return Err(Error::LockTimeout {
                    path: self.path.clone(),
                    waited,
                });
            }
            std::thread::sleep(POLL_INTERVAL.min(timeout - waited));
        }
    }
}

impl CacheLockGuard {
    /// Path of the lock file this guard holds.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            debug!("failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
