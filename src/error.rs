//! # Error Handling
//!
//! Centralized error handling for `condor-git-config`, built on the
//! `thiserror` library. The `Error` enum covers every failure mode of a
//! hook invocation, each variant carrying enough context (URI, path,
//! underlying cause) to diagnose the problem from the scheduler's logs.
//!
//! All errors are fatal to the current invocation: the hook never emits
//! partial configuration, so every variant propagates to the binary and
//! becomes a non-zero exit with diagnostics on stderr.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for condor-git-config operations
#[derive(Error, Debug)]
pub enum Error {
    /// The remote repository could not be reached or refused access.
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The local mirror exists but is not a valid repository state, and
    /// could not be recovered by re-cloning.
    #[error("Repository cache corrupt at {}: {message}", path.display())]
    RepositoryCorrupt { path: PathBuf, message: String },

    /// The exclusion lock for a mirror could not be acquired within the
    /// configured deadline.
    #[error("Timed out after {waited:?} waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    /// A selected file became unreadable between selection and emission.
    #[error("Failed to read selected file {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A malformed repository reference, pattern, or option value.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The cache directory is already used by a hook with a different
    /// repository or branch.
    #[error("Cache {} belongs to {found}, not {expected}; refusing to share it", path.display())]
    CacheConflict {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
