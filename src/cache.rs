//! # Mirror Manager
//!
//! This module provides [`ConfigCache`], the owner of a single on-disk
//! mirror of a remote configuration repository. Repeated invocations with
//! the same repository reference resolve to the same mirror directory, so
//! the clone persists across runs and is updated in place.
//!
//! ## Layout
//!
//! Each mirror lives under the cache root in a directory derived from the
//! repository URI and branch:
//!
//! ```text
//! <cache-root>/<sha256-prefix of URI>/<branch>/
//!     repo/          the clone itself
//!     cache.json     metadata: URI, branch, last refresh timestamp
//!     cache.lock     cross-process exclusion lock file
//! ```
//!
//! ## Design
//!
//! Git operations go through the [`GitOperations`] trait so the refresh
//! policy can be unit-tested against a mock without a network or a `git`
//! binary; [`DefaultGitOperations`] wraps the real `git` command. Every
//! method that touches the mirror takes a [`CacheLockGuard`], making it
//! impossible to read or mutate the clone without holding the exclusion
//! lock.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::lock::{CacheLock, CacheLockGuard};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Clone a repository's branch into the target directory, replacing
    /// whatever is there.
    fn clone_branch(&self, url: &str, branch: &str, target_dir: &Path) -> Result<()>;

    /// Update an existing clone to the latest upstream revision.
    fn pull(&self, url: &str, repo_dir: &Path) -> Result<()>;

    /// Check whether a directory holds a usable clone.
    fn is_repository(&self, repo_dir: &Path) -> bool;

    /// Resolve the revision currently checked out.
    fn head_revision(&self, repo_dir: &Path) -> Result<String>;
}

/// The default implementation of `GitOperations`, which uses the system's
/// `git` command to perform real Git operations.
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn clone_branch(&self, url: &str, branch: &str, target_dir: &Path) -> Result<()> {
        crate::git::clone(url, branch, target_dir)
    }

    fn pull(&self, url: &str, repo_dir: &Path) -> Result<()> {
        crate::git::pull(url, repo_dir)
    }

    fn is_repository(&self, repo_dir: &Path) -> bool {
        crate::git::is_repository(repo_dir)
    }

    fn head_revision(&self, repo_dir: &Path) -> Result<String> {
        crate::git::head_revision(repo_dir)
    }
}

/// Metadata recorded beside the clone after each successful refresh.
///
/// The URI and branch fields detect a cache directory accidentally shared
/// by hooks configured for different repositories, which would otherwise
/// silently serve one hook's files to the other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CacheMetadata {
    git_uri: String,
    branch: String,
    timestamp: f64,
}

/// Cache for configuration files from a git repository.
pub struct ConfigCache {
    git_uri: String,
    branch: String,
    digest: String,
    work_path: PathBuf,
    max_age: f64,
    lock: CacheLock,
    git_ops: Box<dyn GitOperations>,
}

impl ConfigCache {
    /// Open (creating if necessary) the mirror directory for a repository
    /// reference.
    ///
    /// `max_age` is the number of seconds a successful refresh stays
    /// fresh; `f64::INFINITY` disables updates once a clone exists.
    pub fn open(git_uri: &str, branch: &str, cache_root: &Path, max_age: f64) -> Result<Self> {
        Self::with_git_ops(
            git_uri,
            branch,
            cache_root,
            max_age,
            Box::new(DefaultGitOperations),
        )
    }

    /// Open a cache with a custom `GitOperations` implementation. Used by
    /// tests to inject a mock.
    pub fn with_git_ops(
        git_uri: &str,
        branch: &str,
        cache_root: &Path,
        max_age: f64,
        git_ops: Box<dyn GitOperations>,
    ) -> Result<Self> {
        if git_uri.trim().is_empty() {
            return Err(Error::Configuration {
                message: "repository URI must not be empty".to_string(),
            });
        }
        if branch.trim().is_empty() {
            return Err(Error::Configuration {
                message: "branch must not be empty".to_string(),
            });
        }
        if max_age.is_nan() || max_age < 0.0 {
            return Err(Error::Configuration {
                message: format!("max-age must be a non-negative number, got {}", max_age),
            });
        }

        let digest = reference_digest(git_uri);
        // Branch names may contain '/', which must not create extra levels
        let safe_branch = branch.replace('/', "-");
        let work_path = cache_root.join(&digest).join(safe_branch);
        fs::create_dir_all(&work_path)?;

        let lock = CacheLock::new(work_path.join("cache.lock"));
        Ok(Self {
            git_uri: git_uri.to_string(),
            branch: branch.to_string(),
            digest,
            work_path,
            max_age,
            lock,
            git_ops,
        })
    }

    /// Stable digest identifying this repository reference; the mirror's
    /// directory name under the cache root.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Directory holding the clone itself.
    pub fn repo_path(&self) -> PathBuf {
        self.work_path.join("repo")
    }

    fn meta_path(&self) -> PathBuf {
        self.work_path.join("cache.json")
    }

    /// Acquire the exclusion lock for this mirror.
    ///
    /// The returned guard is required by every other operation, so the
    /// lock is necessarily held for the whole update-select-emit span.
    pub fn lock(&self, timeout: Duration) -> Result<CacheLockGuard> {
        self.lock.acquire(timeout)
    }

    /// Bring the mirror up to date and return the revision now present.
    ///
    /// - A clone fresher than `max_age` is left untouched. Metadata with
    ///   no clone behind it does not count as fresh.
    /// - A missing clone is created with a full single-branch clone.
    /// - An existing clone is updated with `git pull`; if the pull fails
    ///   because the on-disk state is not a valid repository, the mirror
    ///   is discarded and re-cloned with a logged warning. The mirror is
    ///   a disposable cache, not a source of truth.
    ///
    /// Network failures propagate as [`Error::Network`]; a clone that
    /// cannot be recovered even by re-cloning is
    /// [`Error::RepositoryCorrupt`].
    pub fn refresh(&self, _guard: &CacheLockGuard) -> Result<String> {
        let repo_path = self.repo_path();

        // Conflict detection in outdated() runs even when the clone is
        // gone; a missing clone must never clobber another hook's cache.
        let outdated = self.outdated()?;
        let have_repo = self.git_ops.is_repository(&repo_path);
        if !outdated && have_repo {
            return self.git_ops.head_revision(&repo_path);
        }

        if !have_repo {
            self.git_ops
                .clone_branch(&self.git_uri, &self.branch, &repo_path)?;
        } else if let Err(e) = self.git_ops.pull(&self.git_uri, &repo_path) {
            match e {
                Error::RepositoryCorrupt { path, message } => {
                    warn!(
                        "mirror {} is not a valid repository ({}); re-cloning",
                        path.display(),
                        message
                    );
                    self.git_ops
                        .clone_branch(&self.git_uri, &self.branch, &repo_path)?;
                }
                other => return Err(other),
            }
        }

        self.write_metadata()?;
        let revision = self.git_ops.head_revision(&repo_path)?;
        info!("mirror {} at revision {}", repo_path.display(), revision);
        Ok(revision)
    }

    /// Whether the mirror needs a refresh.
    ///
    /// Missing or unreadable metadata counts as outdated; metadata
    /// recorded by a hook for a different repository or branch is a fatal
    /// [`Error::CacheConflict`].
    fn outdated(&self) -> Result<bool> {
        let raw = match fs::read_to_string(self.meta_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(Error::Io(e)),
        };
        let meta: CacheMetadata = match serde_json::from_str(&raw) {
            Ok(meta) => meta,
            Err(e) => {
                warn!("discarding unreadable cache metadata: {}", e);
                return Ok(true);
            }
        };

        if meta.git_uri != self.git_uri || meta.branch != self.branch {
            return Err(Error::CacheConflict {
                path: self.work_path.clone(),
                expected: format!("{}@{}", self.git_uri, self.branch),
                found: format!("{}@{}", meta.git_uri, meta.branch),
            });
        }

        Ok(meta.timestamp + self.max_age <= unix_now())
    }

    fn write_metadata(&self) -> Result<()> {
        let meta = CacheMetadata {
            git_uri: self.git_uri.clone(),
            branch: self.branch.clone(),
            timestamp: unix_now(),
        };
        let raw = serde_json::to_string(&meta).map_err(|e| Error::Configuration {
            message: format!("failed to serialize cache metadata: {}", e),
        })?;
        fs::write(self.meta_path(), raw)?;
        Ok(())
    }

    /// Enumerate the clone's files as sorted, deduplicated paths relative
    /// to the repository root.
    ///
    /// Only `.git` is skipped here; it holds repository plumbing, not
    /// configuration. Other hidden files stay enumerable so a selection
    /// pattern naming them explicitly can still match (wildcards do not,
    /// see the selector's match options).
    pub fn files(&self, _guard: &CacheLockGuard) -> Result<Vec<PathBuf>> {
        let repo_path = self.repo_path();
        let mut paths: Vec<PathBuf> = Vec::new();

        let walker = WalkDir::new(&repo_path)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Dangling symlinks and unreadable subtrees lose their
                // entry, they do not fail the whole selection
                Err(e) => {
                    warn!("skipping unreadable entry in mirror: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() {
                // min_depth(1) guarantees the prefix is present
                let relative = entry
                    .path()
                    .strip_prefix(&repo_path)
                    .expect("walk entries are rooted in the repo path")
                    .to_path_buf();
                paths.push(relative);
            }
        }

        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Stable, filesystem-safe directory name for a repository reference.
///
/// A SHA-256 prefix keeps the name short while remaining stable across
/// toolchains and platforms, so every invocation with the same URI reuses
/// the same mirror.
pub fn reference_digest(git_uri: &str) -> String {
    let digest = Sha256::digest(git_uri.as_bytes());
    let mut out = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
