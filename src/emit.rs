//! # Configuration Emission
//!
//! The emitter turns the selected file list into the text the scheduler
//! parses. The scheduler treats whatever appears on stdout as
//! configuration, so partial output under failure would misconfigure the
//! node: the whole output is therefore assembled in memory first and
//! handed to the sink in a single write. Until that write, nothing is
//! observable downstream.
//!
//! Output layout:
//!
//! ```text
//! GIT_CONFIG_CACHE_PATH = /var/cache/condor-git-config/<digest>/master/repo
//! # >>> a.conf
//! <contents of a.conf>
//! # >>> b.conf
//! <contents of b.conf>
//! ```
//!
//! The leading line exposes the mirror path to the condor configuration
//! (key name set by `--path-key`); the `# >>>` markers identify each
//! file's origin when debugging the merged output.

use std::fs;
use std::io::Write;

use log::debug;

use crate::cache::ConfigCache;
use crate::error::{Error, Result};
use crate::select::SelectedFile;

/// Assemble and write the configuration output.
///
/// Reads every selected file before writing anything. A file that became
/// unreadable between selection and here (a race with a concurrent mirror
/// update) aborts the whole emission with [`Error::FileRead`]; there is
/// no partial-success mode.
pub fn emit<W: Write>(
    cache: &ConfigCache,
    files: &[SelectedFile],
    path_key: &str,
    sink: &mut W,
) -> Result<()> {
    let mut buffer: Vec<u8> = Vec::new();

    buffer.extend_from_slice(
        format!("{} = {}\n", path_key, cache.repo_path().display()).as_bytes(),
    );

    for file in files {
        let contents = fs::read(&file.absolute).map_err(|e| Error::FileRead {
            path: file.absolute.clone(),
            source: e,
        })?;
        buffer.extend_from_slice(format!("# >>> {}\n", file.relative.display()).as_bytes());
        buffer.extend_from_slice(&contents);
        if !contents.ends_with(b"\n") {
            buffer.push(b'\n');
        }
    }

    debug!("emitting {} bytes from {} files", buffer.len(), files.len());
    sink.write_all(&buffer)?;
    sink.flush()?;
    Ok(())
}
