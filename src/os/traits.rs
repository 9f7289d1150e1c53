use crate::{Result, arch};
use std::{
    env::consts::{DLL_PREFIX, DLL_SUFFIX},
    path::Path,
};

/// Outcome of asking the platform loader for a library by name.
///
/// A failed lookup is an expected branch of the relinking state machine, not
/// an error, so it is returned as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadAttempt {
    /// The platform loader found and loaded the library.
    Loaded,
    /// The platform loader could not satisfy the request.
    Unsatisfied {
        /// The loader's diagnostic.
        reason: String,
    },
}

impl LoadAttempt {
    #[inline]
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadAttempt::Loaded)
    }
}

/// Maps a logical library name to the platform file name (`foo` -> `libfoo.so`).
#[inline]
pub fn map_library_name(name: &str) -> String {
    format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
}

/// Maps a platform file name back to its logical name (`libfoo.so` -> `foo`).
///
/// Names that do not carry both the platform prefix and suffix are returned
/// unchanged.
#[inline]
pub fn unmap_library_name(file_name: &str) -> String {
    file_name
        .strip_prefix(DLL_PREFIX)
        .and_then(|rest| rest.strip_suffix(DLL_SUFFIX))
        .filter(|name| !name.is_empty())
        .unwrap_or(file_name)
        .to_string()
}

/// A trait for the platform's dynamic loading primitives.
///
/// Implementations must be shareable across threads: the asynchronous entry
/// point runs the orchestrator on a worker.
///
/// # Example
/// ```rust,ignore
/// struct NoopLoader;
///
/// impl LibraryLoader for NoopLoader {
///     fn load_library(&self, _name: &str) -> LoadAttempt {
///         LoadAttempt::Loaded
///     }
///
///     fn load_path(&self, _path: &Path) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait LibraryLoader: Send + Sync {
    /// Asks the platform loader to find and load `name` (a logical name) on
    /// its usual search path.
    fn load_library(&self, name: &str) -> LoadAttempt;

    /// Loads the library at an explicit path.
    ///
    /// # Errors
    /// [`Error::LoadFailed`](crate::Error::LoadFailed) carrying the platform
    /// loader's diagnostic.
    fn load_path(&self, path: &Path) -> Result<()>;

    /// Maps a logical name to the file name stored in archives and the cache.
    fn map_library_name(&self, name: &str) -> String {
        map_library_name(name)
    }

    /// Inverse of [`map_library_name`](LibraryLoader::map_library_name),
    /// applied to `DT_NEEDED` entries.
    fn unmap_library_name(&self, file_name: &str) -> String {
        unmap_library_name(file_name)
    }

    /// ABI directories to search in archives, most preferred first.
    fn supported_abis(&self) -> Vec<String> {
        arch::supported_abis()
    }
}
