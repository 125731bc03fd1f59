//! Library-level pipeline tests: lock, refresh, select, emit against a
//! mock git backend, with no network and no git binary.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use condor_git_config::cache::{ConfigCache, GitOperations};
use condor_git_config::emit::emit;
use condor_git_config::error::{Error, Result};
use condor_git_config::lock::CacheLock;
use condor_git_config::select::ConfigSelector;

/// Fake upstream: "cloning" materializes a fixed working tree.
struct FakeUpstream;

impl GitOperations for FakeUpstream {
    fn clone_branch(&self, _url: &str, _branch: &str, target_dir: &Path) -> Result<()> {
        if target_dir.exists() {
            fs::remove_dir_all(target_dir)?;
        }
        fs::create_dir_all(target_dir.join(".git"))?;
        fs::create_dir_all(target_dir.join("nodes"))?;
        fs::write(target_dir.join("a.conf"), "A = 1\n")?;
        fs::write(target_dir.join("b.conf"), "B = 2\n")?;
        fs::write(target_dir.join("c.txt"), "not config\n")?;
        fs::write(target_dir.join("nodes/worker.conf"), "WORKER = TRUE\n")?;
        Ok(())
    }

    fn pull(&self, _url: &str, _repo_dir: &Path) -> Result<()> {
        Ok(())
    }

    fn is_repository(&self, repo_dir: &Path) -> bool {
        repo_dir.join(".git").exists()
    }

    fn head_revision(&self, _repo_dir: &Path) -> Result<String> {
        Ok("feedc0de".to_string())
    }
}

fn open_cache(root: &Path) -> ConfigCache {
    ConfigCache::with_git_ops(
        "https://example.com/repo.git",
        "master",
        root,
        300.0,
        Box::new(FakeUpstream),
    )
    .unwrap()
}

#[test]
fn full_pipeline_emits_sorted_conf_contents() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path());
    let selector = ConfigSelector::new(&["*.conf".to_string()], &[], &[], false).unwrap();

    let guard = cache.lock(Duration::from_secs(1)).unwrap();
    cache.refresh(&guard).unwrap();
    let files = selector.select(&cache, &guard).unwrap();

    let relative: Vec<_> = files
        .iter()
        .map(|f| f.relative.display().to_string())
        .collect();
    assert_eq!(relative, vec!["a.conf", "b.conf"]);

    let mut sink = Vec::new();
    emit(&cache, &files, "GIT_CONFIG_CACHE_PATH", &mut sink).unwrap();
    let output = String::from_utf8(sink).unwrap();

    assert!(output.find("A = 1").unwrap() < output.find("B = 2").unwrap());
    assert!(!output.contains("not config"));
    assert!(!output.contains("WORKER"));
}

#[test]
fn repeated_runs_reuse_the_same_mirror_and_output() {
    let temp = TempDir::new().unwrap();

    let mut outputs = Vec::new();
    let mut paths = Vec::new();
    for _ in 0..2 {
        let cache = open_cache(temp.path());
        let selector = ConfigSelector::new(&["*.conf".to_string()], &[], &[], false).unwrap();
        let guard = cache.lock(Duration::from_secs(1)).unwrap();
        cache.refresh(&guard).unwrap();
        let files = selector.select(&cache, &guard).unwrap();
        let mut sink = Vec::new();
        emit(&cache, &files, "GIT_CONFIG_CACHE_PATH", &mut sink).unwrap();
        outputs.push(sink);
        paths.push(cache.repo_path());
    }

    assert_eq!(paths[0], paths[1]);
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn recursive_selection_includes_subdirectories() {
    let temp = TempDir::new().unwrap();
    let cache = open_cache(temp.path());
    let selector =
        ConfigSelector::new(&["*.conf".to_string(), "**/*.conf".to_string()], &[], &[], true)
            .unwrap();

    let guard = cache.lock(Duration::from_secs(1)).unwrap();
    cache.refresh(&guard).unwrap();
    let files = selector.select(&cache, &guard).unwrap();

    let relative: Vec<_> = files
        .iter()
        .map(|f| f.relative.display().to_string())
        .collect();
    assert_eq!(relative, vec!["a.conf", "b.conf", "nodes/worker.conf"]);
}

#[test]
fn failed_refresh_leaves_no_output() {
    struct DeadUpstream;
    impl GitOperations for DeadUpstream {
        fn clone_branch(&self, url: &str, _branch: &str, _target_dir: &Path) -> Result<()> {
            Err(Error::Network {
                url: url.to_string(),
                message: "Could not resolve host".to_string(),
            })
        }
        fn pull(&self, _url: &str, _repo_dir: &Path) -> Result<()> {
            unreachable!()
        }
        fn is_repository(&self, _repo_dir: &Path) -> bool {
            false
        }
        fn head_revision(&self, _repo_dir: &Path) -> Result<String> {
            unreachable!()
        }
    }

    let temp = TempDir::new().unwrap();
    let cache = ConfigCache::with_git_ops(
        "https://unreachable.example/repo.git",
        "master",
        temp.path(),
        300.0,
        Box::new(DeadUpstream),
    )
    .unwrap();

    let guard = cache.lock(Duration::from_secs(1)).unwrap();
    let result = cache.refresh(&guard);
    assert!(matches!(result, Err(Error::Network { .. })));
    // The failed invocation stops before selection and emission, so the
    // scheduler sees an empty stdout and a non-zero exit.
}

/// Threads standing in for concurrent hook processes: the advisory lock
/// admits exactly one holder at a time for the whole refresh span.
#[test]
fn concurrent_refreshes_are_serialized() {
    let temp = TempDir::new().unwrap();
    let lock_path = temp.path().join("cache.lock");

    let num_threads = 4;
    let barrier = Arc::new(Barrier::new(num_threads));
    let active = Arc::new(Mutex::new(0u32));
    let max_active = Arc::new(Mutex::new(0u32));

    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let lock_path = lock_path.clone();
            let barrier = Arc::clone(&barrier);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);

            thread::spawn(move || {
                barrier.wait();
                let lock = CacheLock::new(&lock_path);
                let _guard = lock.acquire(Duration::from_secs(10)).unwrap();

                {
                    let mut active = active.lock().unwrap();
                    *active += 1;
                    let mut max_active = max_active.lock().unwrap();
                    *max_active = (*max_active).max(*active);
                }
                // Simulated mirror update while holding the lock
                thread::sleep(Duration::from_millis(20));
                {
                    let mut active = active.lock().unwrap();
                    *active -= 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread should not panic");
    }

    assert_eq!(*max_active.lock().unwrap(), 1, "lock admitted two holders");
}
