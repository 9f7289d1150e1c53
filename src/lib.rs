//! # relinker
//! Recover from dynamic-loader failures by relinking native libraries out of
//! package archives.
//! ## Usage
//! [`Relinker::load`] first asks the platform loader for a library by name. If
//! that fails, the library is extracted from `lib/<abi>/` inside one of the
//! package archives into a private cache directory and loaded from there by
//! path. With [`Relinker::recursively`] the `DT_NEEDED` dependencies of the
//! extracted file are loaded first, the same way.
//!
//! Every part the orchestrator touches is behind a trait: [`LibraryLoader`]
//! for the platform loader, [`LibraryInstaller`] for getting bytes into the
//! cache and [`Logger`] for diagnostics.
//! ## Example
//! ```no_run
//! use relinker::Relinker;
//!
//! let relinker = Relinker::new("/data/data/com.example/app_lib", ["/data/app/base.apk"])
//!     .recursively();
//! relinker.load_version("foo", Some("1.2.0")).unwrap();
//! ```
#![allow(clippy::len_without_is_empty)]

pub mod arch;
pub mod cache;
pub mod elf;
mod error;
pub mod input;
pub mod installer;
mod library;
mod loader;
mod logger;
pub mod os;
mod pool;
mod registry;

pub(crate) use error::*;

pub use cache::LibraryCache;
pub use crate::elf::ElfParser;
pub use error::{Error, load_failed};
pub use input::{ElfReader, IntoElfReader};
pub use installer::{ArchiveInstaller, LibraryInstaller};
pub use library::LibrarySpec;
pub use loader::{LoadHandle, LoadListener, LoadState, Relinker};
pub use logger::Logger;
pub use os::{LibraryLoader, LoadAttempt, SystemLoader};
pub use registry::LoadedLibraries;

/// A type alias for `Result`s returned by `relinker` functions.
///
/// This is a convenience alias that eliminates the need to repeatedly specify
/// the `Error` type in function signatures.
pub type Result<T> = core::result::Result<T, Error>;
