//! Random-access byte sources for the ELF parser
//!
//! This module abstracts where library bytes come from, so the parser can run
//! over an installed file or over an in-memory image with the same code.

pub use backend::{ElfBinary, ElfFile};
pub use traits::{ElfReader, IntoElfReader};

mod backend;
mod traits;
