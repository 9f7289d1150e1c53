//! The set of libraries already loaded into this process.
//!
//! This is the one piece of process-wide shared state: a library loaded by one
//! [`Relinker`](crate::Relinker) is in the process for every other one, so all
//! instances share [`LoadedLibraries::global`] unless told otherwise. Entries
//! are only ever added; a forced load re-inserts after reinstalling.

use dashmap::DashSet;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<LoadedLibraries>> = OnceLock::new();

/// A concurrent, append-only set of logical library names.
#[derive(Debug, Default)]
pub struct LoadedLibraries {
    names: DashSet<String>,
}

impl LoadedLibraries {
    /// Creates an empty registry, detached from the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<LoadedLibraries> {
        GLOBAL.get_or_init(|| Arc::new(LoadedLibraries::new())).clone()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Records `name` as loaded. Returns `false` if it was already present.
    #[inline]
    pub(crate) fn insert(&self, name: &str) -> bool {
        self.names.insert(name.to_string())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// A snapshot of the recorded names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().map(|name| name.key().clone()).collect()
    }
}
