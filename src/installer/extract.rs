use crate::{Logger, Result, extraction_failed, invalid_argument};
use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::Path,
};

/// A re-openable byte stream: each extraction attempt starts from the first byte.
pub trait EntrySource {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Opens a fresh stream over the entry's bytes.
    fn open(&mut self) -> io::Result<Box<dyn Read + '_>>;
}

#[cfg(unix)]
fn set_library_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    // rwxr-x---: owner/group may read and map it executable, only the owner writes.
    fs::set_permissions(path, fs::Permissions::from_mode(0o750))
}

#[cfg(not(unix))]
fn set_library_permissions(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

/// One extraction attempt. Returns the number of bytes copied.
fn copy_once(
    source: &mut dyn EntrySource,
    destination: &Path,
) -> core::result::Result<u64, String> {
    let name = source.name().to_string();
    let mut out = File::create(destination)
        .map_err(|err| format!("failed to create {}: {err}", destination.display()))?;
    let written = {
        let mut input = source
            .open()
            .map_err(|err| format!("failed to open entry {name}: {err}"))?;
        io::copy(&mut input, &mut out).map_err(|err| format!("failed to copy {name}: {err}"))?
    };
    out.flush()
        .and_then(|()| out.sync_all())
        .map_err(|err| format!("failed to sync {}: {err}", destination.display()))?;
    drop(out);

    let len = fs::metadata(destination)
        .map_err(|err| format!("failed to stat {}: {err}", destination.display()))?
        .len();
    if written != len {
        return Err(format!(
            "copied {written} bytes but {} holds {len}",
            destination.display()
        ));
    }
    set_library_permissions(destination)
        .map_err(|err| format!("failed to set permissions on {}: {err}", destination.display()))?;
    Ok(written)
}

/// Copies `source` to `destination`, retrying up to `max_tries` times.
///
/// Each attempt recreates the destination, streams the entry into it, syncs it
/// to disk and checks that the file length equals the number of bytes copied,
/// which catches a concurrent writer truncating the same file. On success the
/// file is made readable and executable by owner and group, writable by owner.
///
/// # Errors
/// [`Error::ExtractionFailed`](crate::Error::ExtractionFailed) once every
/// attempt failed. The partially written destination is removed first so it
/// is never mistaken for an installed library.
///
/// [`Error::InvalidArgument`](crate::Error::InvalidArgument) if `max_tries`
/// is zero; the destination is left untouched.
pub fn extract(
    source: &mut dyn EntrySource,
    destination: &Path,
    max_tries: usize,
    logger: &dyn Logger,
) -> Result<u64> {
    if max_tries == 0 {
        return Err(invalid_argument("extraction retry budget must be at least 1"));
    }
    let mut last_error = String::from("no extraction attempted");
    for attempt in 1..=max_tries {
        logger.log(&format!(
            "Found {}! Extracting (attempt {attempt}/{max_tries})...",
            source.name()
        ));
        match copy_once(source, destination) {
            Ok(written) => {
                log::trace!(
                    "[Extract] {} -> {} ({} bytes)",
                    source.name(),
                    destination.display(),
                    written
                );
                return Ok(written);
            }
            Err(err) => {
                logger.log(&format!("Extraction attempt {attempt} failed: {err}"));
                last_error = err;
            }
        }
    }

    if let Err(err) = fs::remove_file(destination) {
        if err.kind() != io::ErrorKind::NotFound {
            log::warn!(
                "failed to remove partial library {}: {err}",
                destination.display()
            );
        }
    }
    Err(extraction_failed(format!(
        "couldn't extract {} to {} after {max_tries} attempts: {last_error}",
        source.name(),
        destination.display()
    )))
}
