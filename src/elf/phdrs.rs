use super::{ElfClass, ElfHeader, PN_XNUM, defs::Fields, defs::MAX_PROGRAM_HEADERS};
use crate::{ElfReader, Result, corrupt_binary, truncated};
use elf::abi::PT_LOAD;

/// The program header fields the dependency walk needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    /// Segment type (`p_type`).
    pub p_type: u32,
    /// File offset of the segment (`p_offset`).
    pub offset: u64,
    /// Virtual address of the segment (`p_vaddr`).
    pub vaddr: u64,
    /// Bytes of the segment present in the file (`p_filesz`).
    pub filesz: u64,
    /// Bytes of the segment in memory (`p_memsz`).
    pub memsz: u64,
}

impl ProgramHeader {
    fn decode(raw: &[u8], header: &ElfHeader) -> Result<Self> {
        let fields = Fields::new(raw, header.endian);
        match header.class {
            ElfClass::Elf32 => Ok(ProgramHeader {
                p_type: fields.u32_at(0)?,
                offset: fields.u32_at(4)?.into(),
                vaddr: fields.u32_at(8)?.into(),
                filesz: fields.u32_at(16)?.into(),
                memsz: fields.u32_at(20)?.into(),
            }),
            ElfClass::Elf64 => Ok(ProgramHeader {
                p_type: fields.u32_at(0)?,
                offset: fields.u64_at(8)?,
                vaddr: fields.u64_at(16)?,
                filesz: fields.u64_at(32)?,
                memsz: fields.u64_at(40)?,
            }),
        }
    }

    /// Translates `vaddr` into a file offset if this segment's memory image covers it.
    ///
    /// The range checked is `[p_vaddr, p_vaddr + p_memsz]`, so addresses in the
    /// zero-filled tail of a segment still map.
    #[inline]
    pub fn map_vaddr(&self, vaddr: u64) -> Option<u64> {
        let end = self.vaddr.checked_add(self.memsz)?;
        if self.vaddr <= vaddr && vaddr <= end {
            (vaddr - self.vaddr).checked_add(self.offset)
        } else {
            None
        }
    }
}

/// Program headers of one file, in table order.
#[derive(Debug, Clone, Default)]
pub struct ElfPhdrs {
    phdrs: Vec<ProgramHeader>,
}

impl ElfPhdrs {
    /// Reads the program header table.
    ///
    /// When `e_phnum` is [`PN_XNUM`] the real count is taken from `sh_info` of
    /// section header 0. The count and the table's extent are validated
    /// against the file length before any entry is read.
    pub fn parse(object: &mut impl ElfReader, header: &ElfHeader) -> Result<Self> {
        let count = Self::count(object, header)?;
        if count == 0 {
            return Ok(Self::default());
        }
        let entsize = usize::from(header.phentsize);
        if entsize < header.class.phdr_size() {
            return Err(corrupt_binary(format!(
                "program header entry size {entsize} is too small"
            )));
        }
        let table_end = header
            .phdr_offset(count as u64)
            .ok_or_else(|| corrupt_binary("program header table offset overflows"))?;
        if table_end > object.len() {
            return Err(truncated(format!(
                "{}: program header table ends at 0x{table_end:x}, past end of file",
                object.shortname()
            )));
        }

        let mut raw = vec![0u8; entsize];
        let mut phdrs = Vec::with_capacity(count);
        for index in 0..count as u64 {
            // In range: the whole table was checked above.
            let offset = header.phoff + index * entsize as u64;
            object.read(&mut raw, offset)?;
            phdrs.push(ProgramHeader::decode(&raw, header)?);
        }
        Ok(Self { phdrs })
    }

    /// Resolves the effective program header count.
    pub(crate) fn count(object: &mut impl ElfReader, header: &ElfHeader) -> Result<usize> {
        if header.phnum != PN_XNUM {
            return Ok(usize::from(header.phnum));
        }
        if header.shoff == 0 {
            return Err(corrupt_binary(
                "extended program header numbering without a section header table",
            ));
        }
        let entsize = usize::from(header.shentsize);
        if entsize < header.class.shdr_size() {
            return Err(corrupt_binary(format!(
                "section header entry size {entsize} is too small"
            )));
        }
        let offset = header
            .shdr_offset(0)
            .ok_or_else(|| corrupt_binary("section header table offset overflows"))?;
        let mut raw = vec![0u8; entsize];
        object.read(&mut raw, offset)?;
        let fields = Fields::new(&raw, header.endian);
        let sh_info = match header.class {
            ElfClass::Elf32 => fields.u32_at(28)?,
            ElfClass::Elf64 => fields.u32_at(44)?,
        } as usize;
        if sh_info > MAX_PROGRAM_HEADERS {
            return Err(corrupt_binary(format!(
                "extended program header count {sh_info} exceeds limit"
            )));
        }
        log::trace!(
            "[ELF] {}: extended program header count {}",
            object.shortname(),
            sh_info
        );
        Ok(sh_info)
    }

    /// Finds the first entry of type `p_type`.
    #[inline]
    pub fn find(&self, p_type: u32) -> Option<&ProgramHeader> {
        self.phdrs.iter().find(|phdr| phdr.p_type == p_type)
    }

    /// Maps a virtual address to a file offset through the `PT_LOAD` segments,
    /// trying them in table order.
    pub fn vaddr_to_offset(&self, vaddr: u64) -> Option<u64> {
        self.phdrs
            .iter()
            .filter(|phdr| phdr.p_type == PT_LOAD)
            .find_map(|phdr| phdr.map_vaddr(vaddr))
    }

    #[inline]
    pub fn as_slice(&self) -> &[ProgramHeader] {
        &self.phdrs
    }
}

impl From<Vec<ProgramHeader>> for ElfPhdrs {
    fn from(phdrs: Vec<ProgramHeader>) -> Self {
        Self { phdrs }
    }
}
