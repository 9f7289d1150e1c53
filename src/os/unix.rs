use super::{LibraryLoader, LoadAttempt, map_library_name};
use crate::{Result, load_failed};
use std::{
    ffi::{CStr, CString},
    os::unix::ffi::OsStrExt,
    path::Path,
};

/// Loads libraries through `dlopen`.
///
/// Handles are never closed: a loaded library stays mapped for the life of
/// the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl SystemLoader {
    fn dlopen(name: &CStr) -> core::result::Result<(), String> {
        let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
        if handle.is_null() {
            return Err(last_dl_error());
        }
        Ok(())
    }
}

fn last_dl_error() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        return "dlopen failed".into();
    }
    unsafe { CStr::from_ptr(msg) }
        .to_string_lossy()
        .into_owned()
}

impl LibraryLoader for SystemLoader {
    fn load_library(&self, name: &str) -> LoadAttempt {
        let file_name = map_library_name(name);
        let Ok(cname) = CString::new(file_name) else {
            return LoadAttempt::Unsatisfied {
                reason: format!("library name {name:?} contains a NUL byte"),
            };
        };
        match Self::dlopen(&cname) {
            Ok(()) => LoadAttempt::Loaded,
            Err(reason) => LoadAttempt::Unsatisfied { reason },
        }
    }

    fn load_path(&self, path: &Path) -> Result<()> {
        let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            load_failed(format!("library path {} contains a NUL byte", path.display()))
        })?;
        Self::dlopen(&cpath).map_err(load_failed)
    }
}
