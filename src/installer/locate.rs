use super::EntrySource;
use crate::{Logger, Result, missing_library};
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};
use zip::{ZipArchive, result::ZipResult};

/// Directory inside a package archive that holds per-ABI native libraries.
pub const LIB_DIR: &str = "lib";

/// Archive entry path of `mapped_name` built for `abi`.
#[inline]
pub fn entry_path(abi: &str, mapped_name: &str) -> String {
    format!("{LIB_DIR}/{abi}/{mapped_name}")
}

/// A library entry found inside an open package archive.
///
/// The archive handle is owned here and closed when this value is dropped.
pub struct FoundLibrary {
    archive_path: PathBuf,
    archive: ZipArchive<File>,
    entry_name: String,
    index: usize,
}

impl FoundLibrary {
    /// Path of the archive the entry was found in.
    #[inline]
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Entry path inside the archive (`lib/<abi>/<mapped name>`).
    #[inline]
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }
}

impl EntrySource for FoundLibrary {
    fn name(&self) -> &str {
        &self.entry_name
    }

    fn open(&mut self) -> io::Result<Box<dyn Read + '_>> {
        let entry = self.archive.by_index(self.index).map_err(io::Error::other)?;
        Ok(Box::new(entry))
    }
}

fn open_archive(path: &Path) -> ZipResult<ZipArchive<File>> {
    let file = File::open(path)?;
    ZipArchive::new(file)
}

/// Opens `path`, retrying up to `max_tries` times on failure.
fn open_with_retries(path: &Path, max_tries: usize, logger: &dyn Logger) -> Option<ZipArchive<File>> {
    for attempt in 1..=max_tries {
        match open_archive(path) {
            Ok(archive) => return Some(archive),
            Err(err) => logger.log(&format!(
                "Failed to open archive {} (attempt {attempt}/{max_tries}): {err}",
                path.display()
            )),
        }
    }
    None
}

/// Finds the first archive containing `lib/<abi>/<mapped_name>` for the
/// most preferred ABI it ships.
///
/// Archives are searched in the order given and ABIs in priority order; the
/// search stops at the first match. Archives that cannot be opened within
/// `max_tries` attempts are skipped. Every archive that does not produce the
/// match is closed before the next one is opened.
///
/// # Errors
/// [`Error::MissingLibrary`](crate::Error::MissingLibrary) if no archive
/// contains the library for any of `abis`.
pub fn locate(
    archives: &[PathBuf],
    abis: &[String],
    mapped_name: &str,
    max_tries: usize,
    logger: &dyn Logger,
) -> Result<FoundLibrary> {
    for archive_path in archives {
        let Some(archive) = open_with_retries(archive_path, max_tries, logger) else {
            continue;
        };
        for abi in abis {
            let entry_name = entry_path(abi, mapped_name);
            logger.log(&format!(
                "Looking for {entry_name} in archive {}...",
                archive_path.display()
            ));
            if let Some(index) = archive.index_for_name(&entry_name) {
                return Ok(FoundLibrary {
                    archive_path: archive_path.clone(),
                    archive,
                    entry_name,
                    index,
                });
            }
        }
        // `archive` is dropped (and its file closed) here.
    }

    let found = match archive_abis(archives, mapped_name) {
        Ok(found) => format!("{found:?}"),
        Err(err) => format!("[{err}]"),
    };
    Err(missing_library(format!(
        "Could not find '{mapped_name}'. Looked for: {abis:?}, but only found: {found}."
    )))
}

/// Lists the ABI directories under which the archives ship `mapped_name`,
/// in archive order without duplicates.
pub fn archive_abis(archives: &[PathBuf], mapped_name: &str) -> ZipResult<Vec<String>> {
    let mut found: Vec<String> = Vec::new();
    for archive_path in archives {
        let archive = open_archive(archive_path)?;
        for name in archive.file_names() {
            let abi = name
                .strip_prefix(LIB_DIR)
                .and_then(|rest| rest.strip_prefix('/'))
                .and_then(|rest| rest.strip_suffix(mapped_name))
                .and_then(|rest| rest.strip_suffix('/'))
                .filter(|abi| !abi.is_empty() && !abi.contains('/'));
            if let Some(abi) = abi {
                if !found.iter().any(|known| known == abi) {
                    found.push(abi.to_string());
                }
            }
        }
    }
    Ok(found)
}
