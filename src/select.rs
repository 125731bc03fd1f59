//! # Configuration File Selection
//!
//! [`ConfigSelector`] turns the mirror's file tree into the ordered list
//! of configuration files to emit. Selection is controlled by three glob
//! pattern sets, applied to paths relative to the repository root:
//!
//! - include patterns (`--pattern`): a file is a candidate when any
//!   include pattern matches,
//! - blacklist patterns (`--blacklist`): candidates matching any
//!   blacklist pattern are dropped,
//! - whitelist patterns (`--whitelist`): blacklisted candidates matching
//!   any whitelist pattern are re-included.
//!
//! By default only top-level files are considered; `recurse` extends
//! selection into subdirectories. The result is deduplicated and sorted
//! lexicographically by relative path, so output is reproducible across
//! runs against the same tree.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::warn;

use crate::cache::ConfigCache;
use crate::error::Result;
use crate::lock::CacheLockGuard;

/// Wildcards must not match a leading dot, so the default `*.cfg`
/// ignores hidden files while a pattern spelling out the dot
/// (`.secret.cfg`) still selects them.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// A file chosen for emission.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SelectedFile {
    /// Path relative to the repository root; the sort key.
    pub relative: PathBuf,
    /// Resolved on-disk location inside the mirror.
    pub absolute: PathBuf,
}

/// Selector for a configuration file iterator
pub struct ConfigSelector {
    patterns: Vec<Pattern>,
    blacklist: Vec<Pattern>,
    whitelist: Vec<Pattern>,
    recurse: bool,
}

impl ConfigSelector {
    /// Compile the pattern sets. Invalid globs surface here, before any
    /// lock is taken or network touched.
    pub fn new(
        patterns: &[String],
        blacklist: &[String],
        whitelist: &[String],
        recurse: bool,
    ) -> Result<Self> {
        Ok(Self {
            patterns: compile(patterns)?,
            blacklist: compile(blacklist)?,
            whitelist: compile(whitelist)?,
            recurse,
        })
    }

    /// Select matching files from the mirror.
    ///
    /// A pattern matching nothing is not an error, and neither is an
    /// empty overall result; the emitter simply emits nothing. Any match
    /// that resolves outside the repository root (a symlink pointing
    /// elsewhere) is excluded with a warning rather than failing the run.
    pub fn select(&self, cache: &ConfigCache, guard: &CacheLockGuard) -> Result<Vec<SelectedFile>> {
        let repo_root = cache.repo_path().canonicalize()?;
        let mut selected = Vec::new();

        for relative in cache.files(guard)? {
            if !self.recurse && relative.parent() != Some(Path::new("")) {
                continue;
            }
            if !self.matches(&relative) {
                continue;
            }

            let absolute = match repo_root.join(&relative).canonicalize() {
                Ok(absolute) => absolute,
                Err(e) => {
                    warn!("skipping {}: {}", relative.display(), e);
                    continue;
                }
            };
            if !absolute.starts_with(&repo_root) {
                warn!(
                    "skipping {}: resolves outside the mirror ({})",
                    relative.display(),
                    absolute.display()
                );
                continue;
            }

            selected.push(SelectedFile { relative, absolute });
        }

        selected.sort();
        selected.dedup();
        Ok(selected)
    }

    fn matches(&self, relative: &Path) -> bool {
        let any = |set: &[Pattern]| {
            set.iter()
                .any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
        };
        if !any(&self.patterns) {
            return false;
        }
        if any(&self.blacklist) {
            return any(&self.whitelist);
        }
        true
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(Into::into))
        .collect()
}
