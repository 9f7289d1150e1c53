//! The private directory extracted libraries are installed into.

use crate::{LibrarySpec, Logger, Result, io_error};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// A writable directory holding extracted libraries, one file per
/// `(library, version)`.
#[derive(Debug, Clone)]
pub struct LibraryCache {
    dir: PathBuf,
}

impl LibraryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the installed copy of `spec`; deterministic for a given spec.
    #[inline]
    pub fn library_path(&self, spec: &LibrarySpec) -> PathBuf {
        self.dir.join(spec.cache_file_name())
    }

    /// Creates the cache directory if it does not exist yet.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|err| {
            io_error(format!(
                "failed to create cache directory {}: {err}",
                self.dir.display()
            ))
        })
    }

    /// Deletes cached files of `spec`'s library other than the one for its
    /// own version, or every cached version when `force` is set.
    ///
    /// Files are matched by the mapped name prefix. Deletion failures are
    /// logged and skipped. Returns the number of files removed.
    pub fn cleanup(&self, spec: &LibrarySpec, force: bool, logger: &dyn Logger) -> usize {
        let keep = self.library_path(spec);
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !file_name.starts_with(&spec.mapped_name) {
                continue;
            }
            let path = entry.path();
            if !force && path == keep {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    logger.log(&format!("Removed stale library {}", path.display()));
                    removed += 1;
                }
                Err(err) => log::warn!("failed to remove {}: {err}", path.display()),
            }
        }
        removed
    }
}
