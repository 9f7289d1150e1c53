//! ELF (Executable and Linkable Format) parsing.
//!
//! Just enough of the format is decoded to answer one question: which shared
//! libraries does this file declare as `DT_NEEDED`? Both ELF32 and ELF64, in
//! either byte order, are supported regardless of the host.

mod defs;
mod dynamic;
mod ehdr;
mod parser;
mod phdrs;

pub use defs::{ElfClass, Endian, PN_XNUM};
pub use dynamic::{DynamicEntry, ElfDynamic};
pub use ehdr::ElfHeader;
pub use parser::ElfParser;
pub use phdrs::{ElfPhdrs, ProgramHeader};
/// ELF ABI constants and definitions from the elf crate.
pub use elf::abi::{DT_NEEDED, DT_NULL, DT_STRTAB, PT_DYNAMIC, PT_LOAD};
