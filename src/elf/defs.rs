//! ELF format definitions and field decoding.
//!
//! The parser never casts raw bytes to `#[repr(C)]` structs: a library built
//! for another ABI may use a different word size or byte order than the host,
//! so every field is decoded at its fixed offset with the file's own
//! endianness.

use crate::{Result, corrupt_binary, invalid_format};
use elf::abi::{ELFCLASS32, ELFCLASS64, ELFDATA2MSB};

/// Sentinel `e_phnum` value meaning "the real count lives in `sh_info` of section 0".
pub const PN_XNUM: u16 = 0xffff;

/// Upper bound on program headers the parser will walk, extended numbering included.
pub(crate) const MAX_PROGRAM_HEADERS: usize = 1 << 20;

/// Upper bound on dynamic entries walked before giving up on a missing `DT_NULL`.
pub(crate) const MAX_DYNAMIC_ENTRIES: usize = 1 << 20;

/// Longest `DT_NEEDED` name accepted, terminator excluded.
pub(crate) const MAX_NEEDED_NAME_LEN: usize = 4096;

/// Size of the identification prefix read before the class is known.
pub(crate) const EI_PREFIX_SIZE: usize = 8;

/// The file's word size, taken from `e_ident[EI_CLASS]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    pub(crate) fn from_ident(byte: u8) -> Result<Self> {
        match byte {
            ELFCLASS32 => Ok(ElfClass::Elf32),
            ELFCLASS64 => Ok(ElfClass::Elf64),
            other => Err(invalid_format(format!("unsupported ELF class byte {other}"))),
        }
    }

    /// Word size in bits (32 or 64).
    #[inline]
    pub fn bits(self) -> u32 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of the file header.
    #[inline]
    pub(crate) fn ehdr_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 52,
            ElfClass::Elf64 => 64,
        }
    }

    /// Minimum size of one program header entry.
    #[inline]
    pub(crate) fn phdr_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        }
    }

    /// Minimum size of one section header entry.
    #[inline]
    pub(crate) fn shdr_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of one `(d_tag, d_val)` pair in the dynamic table.
    #[inline]
    pub(crate) fn dyn_size(self) -> usize {
        match self {
            ElfClass::Elf32 => 8,
            ElfClass::Elf64 => 16,
        }
    }
}

/// The file's byte order, taken from `e_ident[EI_DATA]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Only `ELFDATA2MSB` selects big-endian; any other byte reads as little-endian.
    pub(crate) fn from_ident(byte: u8) -> Self {
        if byte == ELFDATA2MSB {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

/// A view over one raw table entry that decodes fields with the file's byte order.
pub(crate) struct Fields<'a> {
    bytes: &'a [u8],
    endian: Endian,
}

impl<'a> Fields<'a> {
    #[inline]
    pub(crate) fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self { bytes, endian }
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        self.bytes
            .get(offset..offset + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| corrupt_binary(format!("field at offset {offset} exceeds entry size")))
    }

    pub(crate) fn u16_at(&self, offset: usize) -> Result<u16> {
        let raw = self.array::<2>(offset)?;
        Ok(match self.endian {
            Endian::Little => u16::from_le_bytes(raw),
            Endian::Big => u16::from_be_bytes(raw),
        })
    }

    pub(crate) fn u32_at(&self, offset: usize) -> Result<u32> {
        let raw = self.array::<4>(offset)?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }

    pub(crate) fn u64_at(&self, offset: usize) -> Result<u64> {
        let raw = self.array::<8>(offset)?;
        Ok(match self.endian {
            Endian::Little => u64::from_le_bytes(raw),
            Endian::Big => u64::from_be_bytes(raw),
        })
    }

    /// Reads an address-sized field: 4 bytes for ELF32, 8 bytes for ELF64.
    pub(crate) fn word_at(&self, offset: usize, class: ElfClass) -> Result<u64> {
        match class {
            ElfClass::Elf32 => self.u32_at(offset).map(u64::from),
            ElfClass::Elf64 => self.u64_at(offset),
        }
    }

    /// Reads a signed address-sized field, sign-extending ELF32 values.
    pub(crate) fn sword_at(&self, offset: usize, class: ElfClass) -> Result<i64> {
        match class {
            ElfClass::Elf32 => self.u32_at(offset).map(|v| i64::from(v as i32)),
            ElfClass::Elf64 => self.u64_at(offset).map(|v| v as i64),
        }
    }
}
