//! Platform loader primitives.
//!
//! [`LibraryLoader`] is the seam between the orchestrator and the platform's
//! dynamic loader. [`SystemLoader`] is the default implementation for the
//! compilation target.

mod traits;

pub use traits::{LibraryLoader, LoadAttempt, map_library_name, unmap_library_name};

cfg_if::cfg_if! {
    if #[cfg(windows)]{
        pub(crate) mod windows;
        pub use windows::*;
    }else if #[cfg(unix)]{
        pub(crate) mod unix;
        pub use unix::*;
    }else {
        pub(crate) mod bare;
        pub use bare::*;
    }
}
