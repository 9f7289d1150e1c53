use super::{LibraryLoader, LoadAttempt};
use crate::{Result, load_failed};
use std::path::Path;

/// Placeholder loader for targets without a dynamic loader: every request fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLoader;

impl LibraryLoader for SystemLoader {
    fn load_library(&self, name: &str) -> LoadAttempt {
        LoadAttempt::Unsatisfied {
            reason: format!("no dynamic loader on this target to load {name}"),
        }
    }

    fn load_path(&self, path: &Path) -> Result<()> {
        Err(load_failed(format!(
            "no dynamic loader on this target to load {}",
            path.display()
        )))
    }
}
