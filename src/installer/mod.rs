//! Locating native libraries in package archives and copying them out.
//!
//! A package archive is a zip file with libraries stored at
//! `lib/<abi>/<mapped name>`. [`ArchiveInstaller`] searches a list of such
//! archives and extracts the best match into the cache directory.

mod extract;
mod locate;

pub use extract::{EntrySource, extract};
pub use locate::{FoundLibrary, LIB_DIR, archive_abis, entry_path, locate};

use crate::{Logger, Result, invalid_argument};
use std::path::{Path, PathBuf};

/// Default retry budget for opening archives and for extraction.
pub const MAX_TRIES: usize = 5;

/// A trait for getting a library's bytes into a loadable file.
pub trait LibraryInstaller: Send + Sync {
    /// Installs `mapped_name` (a platform file name such as `libfoo.so`) at
    /// `destination`, preferring builds for ABIs earlier in `abis`.
    fn install(
        &self,
        abis: &[String],
        mapped_name: &str,
        destination: &Path,
        logger: &dyn Logger,
    ) -> Result<()>;
}

/// Installs libraries from zip-format package archives.
///
/// # Examples
/// ```no_run
/// use relinker::installer::ArchiveInstaller;
///
/// let installer = ArchiveInstaller::new(["/data/app/base.apk", "/data/app/split_config.apk"])
///     .max_tries(3);
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    archives: Vec<PathBuf>,
    max_tries: usize,
}

impl ArchiveInstaller {
    /// Creates an installer searching `archives` in the given order.
    pub fn new<P: Into<PathBuf>>(archives: impl IntoIterator<Item = P>) -> Self {
        Self {
            archives: archives.into_iter().map(Into::into).collect(),
            max_tries: MAX_TRIES,
        }
    }

    /// Sets the retry budget for opening each archive and for extraction.
    pub fn max_tries(mut self, max_tries: usize) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// The archives searched, in order.
    #[inline]
    pub fn archives(&self) -> &[PathBuf] {
        &self.archives
    }
}

impl LibraryInstaller for ArchiveInstaller {
    fn install(
        &self,
        abis: &[String],
        mapped_name: &str,
        destination: &Path,
        logger: &dyn Logger,
    ) -> Result<()> {
        if self.max_tries == 0 {
            return Err(invalid_argument("installer retry budget must be at least 1"));
        }
        let mut found = locate(&self.archives, abis, mapped_name, self.max_tries, logger)?;
        logger.log(&format!(
            "Using {} from {}",
            found.entry_name(),
            found.archive_path().display()
        ));
        extract(&mut found, destination, self.max_tries, logger)?;
        Ok(())
    }
}
