//! Default values for condor-git-config.
//!
//! This module provides centralized default values used across the CLI,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::Duration;

/// Default glob pattern for configuration files.
pub const DEFAULT_PATTERN: &str = "*.cfg";

/// Default branch to check out when none is given.
pub const DEFAULT_BRANCH: &str = "master";

/// Config key under which the mirror path is exposed to the scheduler.
pub const DEFAULT_PATH_KEY: &str = "GIT_CONFIG_CACHE_PATH";

/// Base interval in seconds before a mirror is considered stale.
/// `inf` disables updates entirely.
pub const DEFAULT_MAX_AGE: f64 = 300.0;

/// Default deadline for acquiring the mirror lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the default cache root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/condor-git-config` (XDG Base Directory)
/// - macOS: `~/Library/Caches/condor-git-config`
///
/// Falls back to `.condor-git-config-cache` in the current directory if
/// the platform cache directory cannot be determined.
///
/// This can be overridden by the `--cache-path` CLI flag or the
/// `CONDOR_GIT_CONFIG_CACHE` environment variable.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".condor-git-config-cache"))
        .join("condor-git-config")
}

/// Spread refresh times so that many nodes sharing one upstream do not
/// all pull in the same second.
///
/// The offset is derived from the mirror's cache digest rather than drawn
/// at random, so a given node keeps the same refresh cadence across
/// invocations while different mirrors land in different slots. The
/// result stays within ±10 seconds of the requested interval. An infinite
/// max-age (updates disabled) passes through untouched.
pub fn jittered_max_age(max_age: f64, digest: &str) -> f64 {
    if !max_age.is_finite() {
        return max_age;
    }
    let seed = digest
        .bytes()
        .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
    let offset = (seed % 21) as f64 - 10.0;
    (max_age + offset).max(0.0)
}

/// Pick the effective max-age for a run.
///
/// A value the operator supplied is honored verbatim; in particular
/// `--max-age 0` means "always pull". Only the built-in default is
/// jittered, since that is the value fleets of nodes share.
pub fn resolve_max_age(requested: Option<f64>, digest: &str) -> f64 {
    match requested {
        Some(explicit) => explicit,
        None => jittered_max_age(DEFAULT_MAX_AGE, digest),
    }
}
