use super::{LibraryLoader, LoadAttempt, map_library_name};
use crate::{Result, load_failed};
use std::{ffi::OsStr, os::windows::ffi::OsStrExt, path::Path};
use windows_sys::Win32::{Foundation::GetLastError, System::LibraryLoader::LoadLibraryW};

/// Loads libraries through `LoadLibraryW`.
///
/// Module handles are never freed: a loaded library stays mapped for the life
/// of the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl SystemLoader {
    fn load(name: &OsStr) -> core::result::Result<(), String> {
        let wide: Vec<u16> = name.encode_wide().chain(Some(0)).collect();
        let module = unsafe { LoadLibraryW(wide.as_ptr()) };
        if module.is_null() {
            let err_code = unsafe { GetLastError() };
            return Err(format!(
                "LoadLibraryW({}) failed with error: {}",
                name.to_string_lossy(),
                err_code
            ));
        }
        Ok(())
    }
}

impl LibraryLoader for SystemLoader {
    fn load_library(&self, name: &str) -> LoadAttempt {
        match Self::load(OsStr::new(&map_library_name(name))) {
            Ok(()) => LoadAttempt::Loaded,
            Err(reason) => LoadAttempt::Unsatisfied { reason },
        }
    }

    fn load_path(&self, path: &Path) -> Result<()> {
        Self::load(path.as_os_str()).map_err(load_failed)
    }
}
