use std::fs;
use std::path::Path;
use std::process::Command;

use log::debug;

use crate::error::{Error, Result};

/// Clone a repository's branch into the target directory
///
/// This uses the system git command, which automatically handles:
/// - SSH keys from ~/.ssh/
/// - Git credential helpers
/// - Personal access tokens
/// - Any authentication configured in ~/.gitconfig
///
/// The clone is single-branch but not shallow: the mirror is updated in
/// place with `git pull` on later invocations, which needs history.
pub fn clone(url: &str, branch: &str, target_dir: &Path) -> Result<()> {
    // Remove target directory if it exists (git won't clone into existing non-empty dir)
    if target_dir.exists() {
        fs::remove_dir_all(target_dir)?;
    }

    // Create parent directory if it doesn't exist
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("cloning {} (branch {}) into {}", url, branch, target_dir.display());
    let output = Command::new("git")
        .args(["clone", "--quiet", "--single-branch", "--branch", branch, url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::Network {
            url: url.to_string(),
            message: format!("failed to run git clone: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_failure(url, target_dir, &stderr));
    }

    Ok(())
}

/// Update an existing clone to the latest upstream revision
pub fn pull(url: &str, repo_dir: &Path) -> Result<()> {
    debug!("pulling {} in {}", url, repo_dir.display());
    let output = Command::new("git")
        .args(["pull", "--quiet"])
        .current_dir(repo_dir)
        .output()
        .map_err(|e| Error::Network {
            url: url.to_string(),
            message: format!("failed to run git pull: {}", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(classify_failure(url, repo_dir, &stderr));
    }

    Ok(())
}

/// Resolve the revision currently checked out in a clone
pub fn head_revision(repo_dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_dir)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::RepositoryCorrupt {
            path: repo_dir.to_path_buf(),
            message: stderr.trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Check whether a directory looks like a git clone
///
/// Only the presence of `.git` is checked; a clone that is damaged in
/// deeper ways surfaces as a failed `pull` and is re-cloned.
pub fn is_repository(repo_dir: &Path) -> bool {
    repo_dir.join(".git").exists()
}

/// Sort a failed git invocation into the error taxonomy.
///
/// Git reports both transport problems and local-state problems on
/// stderr; transport markers take priority so that an unreachable remote
/// is never misreported as cache corruption.
fn classify_failure(url: &str, repo_dir: &Path, stderr: &str) -> Error {
    let transport_markers = [
        "Could not resolve host",
        "unable to access",
        "Connection refused",
        "Connection timed out",
        "Authentication failed",
        "Permission denied",
        "Could not read from remote repository",
        "Remote branch",
        "remote branch",
        "not found in upstream",
        "Repository not found",
    ];

    if transport_markers.iter().any(|m| stderr.contains(m)) {
        Error::Network {
            url: url.to_string(),
            message: stderr.trim().to_string(),
        }
    } else {
        Error::RepositoryCorrupt {
            path: repo_dir.to_path_buf(),
            message: stderr.trim().to_string(),
        }
    }
}
