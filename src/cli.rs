//! CLI argument parsing and hook execution

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::debug;

use condor_git_config::cache::ConfigCache;
use condor_git_config::defaults;
use condor_git_config::emit;
use condor_git_config::select::ConfigSelector;

/// Dynamic Condor Configuration Hook
///
/// Fetches a git repository into a local cache and emits selected files
/// as configuration on stdout. Intended to be called from a condor
/// `include command:` directive.
#[derive(Parser, Debug)]
#[command(name = "condor-git-config")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// git repository URI to fetch files from
    #[arg(value_name = "GIT-URI")]
    pub git_uri: String,

    /// branch to fetch files from
    #[arg(short, long, default_value = defaults::DEFAULT_BRANCH)]
    pub branch: String,

    /// path to cache configuration file sources
    #[arg(long, value_name = "DIR", env = "CONDOR_GIT_CONFIG_CACHE")]
    pub cache_path: Option<PathBuf>,

    /// seconds before a new update is pulled; use inf to disable updates
    /// [default: 300, with a per-mirror jitter of up to 10 seconds]
    #[arg(long, value_name = "SECONDS")]
    pub max_age: Option<f64>,

    /// glob pattern(s) for configuration files
    #[arg(long, value_name = "GLOB")]
    pub pattern: Vec<String>,

    /// glob pattern(s) for ignoring configuration files
    #[arg(long, value_name = "GLOB")]
    pub blacklist: Vec<String>,

    /// glob pattern(s) for including ignored files
    #[arg(long, value_name = "GLOB")]
    pub whitelist: Vec<String>,

    /// provide files beyond the top-level
    #[arg(long)]
    pub recurse: bool,

    /// config key exposing the cache path
    #[arg(long, value_name = "KEY", default_value = defaults::DEFAULT_PATH_KEY)]
    pub path_key: String,

    /// seconds to wait for the cache lock before giving up
    #[arg(long, value_name = "SECONDS", default_value_t = defaults::DEFAULT_LOCK_TIMEOUT.as_secs())]
    pub lock_timeout: u64,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Execute the hook.
    ///
    /// Everything that can fail from bad arguments (pattern compilation,
    /// URI validation) fails before the lock is taken; the exclusion lock
    /// then covers update, selection, and emission, so no concurrent
    /// invocation can observe or create a half-updated mirror.
    pub fn execute(self) -> Result<()> {
        let level = self
            .log_level
            .parse::<log::LevelFilter>()
            .with_context(|| format!("invalid log level: {}", self.log_level))?;
        // Diagnostics on stderr; stdout belongs to the scheduler.
        env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .init();

        let cache_root = self.cache_path.unwrap_or_else(defaults::default_cache_root);
        let digest = condor_git_config::cache::reference_digest(&self.git_uri);
        let max_age = defaults::resolve_max_age(self.max_age, &digest);
        let cache = ConfigCache::open(&self.git_uri, &self.branch, &cache_root, max_age)?;

        let patterns = if self.pattern.is_empty() {
            vec![defaults::DEFAULT_PATTERN.to_string()]
        } else {
            self.pattern
        };
        let selector =
            ConfigSelector::new(&patterns, &self.blacklist, &self.whitelist, self.recurse)?;

        let guard = cache.lock(Duration::from_secs(self.lock_timeout))?;
        let revision = cache.refresh(&guard)?;
        debug!("mirror ready at revision {}", revision);

        let files = selector.select(&cache, &guard)?;
        let stdout = std::io::stdout();
        let mut sink = stdout.lock();
        emit::emit(&cache, &files, &self.path_key, &mut sink)?;
        sink.flush()?;
        Ok(())
    }
}
