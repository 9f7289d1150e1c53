//! ELF header parsing and validation
//!
//! Only the fields needed to find the program and section header tables are
//! decoded. Both the 32-bit and the 64-bit layout are spelled out explicitly.

use super::{ElfClass, Endian, defs::EI_PREFIX_SIZE, defs::Fields};
use crate::{ElfReader, Result, invalid_format};
use elf::abi::{EI_CLASS, EI_DATA, ELFMAGIC};

/// The decoded ELF file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfHeader {
    /// Word size from `e_ident[EI_CLASS]`.
    pub class: ElfClass,
    /// Byte order from `e_ident[EI_DATA]`.
    pub endian: Endian,
    /// Object file type (`e_type`).
    pub e_type: u16,
    /// File offset of the program header table (`e_phoff`).
    pub phoff: u64,
    /// Size of one program header entry (`e_phentsize`).
    pub phentsize: u16,
    /// Raw program header count (`e_phnum`); may be [`PN_XNUM`](super::PN_XNUM).
    pub phnum: u16,
    /// File offset of the section header table (`e_shoff`).
    pub shoff: u64,
    /// Size of one section header entry (`e_shentsize`).
    pub shentsize: u16,
    /// Section header count (`e_shnum`).
    pub shnum: u16,
    /// Index of the section name string table (`e_shstrndx`).
    pub shstrndx: u16,
}

impl ElfHeader {
    /// Reads and validates the header at the start of `object`.
    ///
    /// The first 8 bytes are checked for the ELF magic, then the class and
    /// data-encoding bytes select the layout and byte order of the rest.
    ///
    /// # Errors
    /// * [`Error::InvalidFormat`](crate::Error::InvalidFormat) for a bad magic
    ///   or class byte.
    /// * [`Error::Truncated`](crate::Error::Truncated) if the file is shorter
    ///   than the header.
    pub fn parse(object: &mut impl ElfReader) -> Result<Self> {
        let mut ident = [0u8; EI_PREFIX_SIZE];
        object.read(&mut ident, 0)?;
        if ident[0..4] != ELFMAGIC {
            return Err(invalid_format(format!(
                "{}: invalid ELF magic",
                object.shortname()
            )));
        }
        let class = ElfClass::from_ident(ident[EI_CLASS])?;
        let endian = Endian::from_ident(ident[EI_DATA]);

        let mut buf = [0u8; 64];
        let raw = &mut buf[..class.ehdr_size()];
        object.read(raw, 0)?;
        let fields = Fields::new(raw, endian);

        let header = match class {
            ElfClass::Elf32 => ElfHeader {
                class,
                endian,
                e_type: fields.u16_at(16)?,
                phoff: fields.u32_at(28)?.into(),
                shoff: fields.u32_at(32)?.into(),
                phentsize: fields.u16_at(42)?,
                phnum: fields.u16_at(44)?,
                shentsize: fields.u16_at(46)?,
                shnum: fields.u16_at(48)?,
                shstrndx: fields.u16_at(50)?,
            },
            ElfClass::Elf64 => ElfHeader {
                class,
                endian,
                e_type: fields.u16_at(16)?,
                phoff: fields.u64_at(32)?,
                shoff: fields.u64_at(40)?,
                phentsize: fields.u16_at(54)?,
                phnum: fields.u16_at(56)?,
                shentsize: fields.u16_at(58)?,
                shnum: fields.u16_at(60)?,
                shstrndx: fields.u16_at(62)?,
            },
        };
        log::trace!(
            "[ELF] {}: {:?} {:?} phoff: 0x{:x} phnum: {} shoff: 0x{:x} shnum: {}",
            object.shortname(),
            header.class,
            header.endian,
            header.phoff,
            header.phnum,
            header.shoff,
            header.shnum
        );
        Ok(header)
    }

    /// Calculates the file offset of section header `index`.
    #[inline]
    pub(crate) fn shdr_offset(&self, index: u64) -> Option<u64> {
        index
            .checked_mul(u64::from(self.shentsize))?
            .checked_add(self.shoff)
    }

    /// Calculates the file offset of program header `index`.
    #[inline]
    pub(crate) fn phdr_offset(&self, index: u64) -> Option<u64> {
        index
            .checked_mul(u64::from(self.phentsize))?
            .checked_add(self.phoff)
    }
}
