//! # condor-git-config
//!
//! Dynamically configure an HTCondor node from a git repository.
//!
//! This library backs the `condor-git-config` hook binary: a short-lived
//! program the scheduler invokes during configuration loading, expecting
//! configuration text on stdout and a zero exit code. The hook keeps a
//! persistent local mirror of a configuration repository, selects a
//! deterministic subset of its files, and emits their contents.
//!
//! ## Quick Example
//!
//! ```no_run
//! use std::time::Duration;
//! use condor_git_config::cache::ConfigCache;
//! use condor_git_config::select::ConfigSelector;
//! use condor_git_config::emit;
//!
//! # fn main() -> condor_git_config::error::Result<()> {
//! let cache = ConfigCache::open(
//!     "https://example.com/config.git",
//!     "master",
//!     std::path::Path::new("/var/cache/condor-git-config"),
//!     300.0,
//! )?;
//! let selector = ConfigSelector::new(&["*.cfg".to_string()], &[], &[], false)?;
//!
//! // One exclusive lock spans update, selection, and emission.
//! let guard = cache.lock(Duration::from_secs(30))?;
//! cache.refresh(&guard)?;
//! let files = selector.select(&cache, &guard)?;
//! emit::emit(&cache, &files, "GIT_CONFIG_CACHE_PATH", &mut std::io::stdout().lock())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! - **Mirror cache (`cache`)**: one on-disk clone per repository
//!   reference, at a path derived from a stable hash of the URI, updated
//!   in place and never deleted.
//! - **Exclusion lock (`lock`)**: an advisory file lock serializing
//!   mirror access across concurrent hook processes; released by the
//!   kernel if a holder crashes.
//! - **Selection (`select`)**: glob include/blacklist/whitelist patterns
//!   over the mirror tree, producing a deduplicated, lexicographically
//!   sorted file list.
//! - **Emission (`emit`)**: all-or-nothing assembly of the output text;
//!   the scheduler never sees partial configuration.
//!
//! Concurrency lives *between* hook processes, not inside one: each
//! invocation is single-threaded and relies on the exclusion lock for
//! the full update-select-emit span.

pub mod cache;
pub mod defaults;
pub mod emit;
pub mod error;
pub mod git;
pub mod lock;
pub mod select;
