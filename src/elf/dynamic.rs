//! Parsing the `PT_DYNAMIC` table
use super::{ElfHeader, defs::Fields, defs::MAX_DYNAMIC_ENTRIES};
use crate::{ElfReader, Result, corrupt_binary};
use elf::abi::{DT_NEEDED, DT_NULL, DT_STRTAB};

/// One `(d_tag, d_val)` pair of the dynamic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicEntry {
    /// `DT_NEEDED`: string table offset of a required library name.
    Needed(u64),
    /// `DT_STRTAB`: virtual address of the dynamic string table.
    StrTab(u64),
    /// Any other tag, kept only so the walk can be logged.
    Other { tag: i64, value: u64 },
}

/// The parts of the dynamic table needed to list dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElfDynamic {
    /// `DT_NEEDED` values in table order.
    pub needed: Vec<u64>,
    /// The last `DT_STRTAB` value seen.
    pub strtab: Option<u64>,
}

impl ElfDynamic {
    /// Walks the dynamic table at file offset `offset` until `DT_NULL`.
    ///
    /// # Errors
    /// * [`Error::Truncated`](crate::Error::Truncated) if the table runs past
    ///   the end of the file before `DT_NULL`.
    /// * [`Error::CorruptBinary`](crate::Error::CorruptBinary) if the walk
    ///   exceeds the entry limit.
    pub fn parse(object: &mut impl ElfReader, header: &ElfHeader, offset: u64) -> Result<Self> {
        let class = header.class;
        let entsize = class.dyn_size();
        let word = entsize / 2;
        let mut raw = [0u8; 16];
        let raw = &mut raw[..entsize];
        let mut dynamic = ElfDynamic::default();

        for index in 0..MAX_DYNAMIC_ENTRIES as u64 {
            let entry_offset = index
                .checked_mul(entsize as u64)
                .and_then(|rel| rel.checked_add(offset))
                .ok_or_else(|| corrupt_binary("dynamic table offset overflows"))?;
            object.read(raw, entry_offset)?;
            let fields = Fields::new(raw, header.endian);
            let tag = fields.sword_at(0, class)?;
            if tag == DT_NULL {
                return Ok(dynamic);
            }
            let value = fields.word_at(word, class)?;
            match DynamicEntry::from_raw(tag, value) {
                DynamicEntry::Needed(name) => dynamic.needed.push(name),
                DynamicEntry::StrTab(addr) => dynamic.strtab = Some(addr),
                DynamicEntry::Other { tag, value } => {
                    log::trace!("[Dynamic] skip tag: {} value: 0x{:x}", tag, value)
                }
            }
        }
        Err(corrupt_binary(format!(
            "{}: dynamic table has no DT_NULL within {MAX_DYNAMIC_ENTRIES} entries",
            object.shortname()
        )))
    }
}

impl DynamicEntry {
    #[inline]
    pub fn from_raw(tag: i64, value: u64) -> Self {
        match tag {
            DT_NEEDED => DynamicEntry::Needed(value),
            DT_STRTAB => DynamicEntry::StrTab(value),
            tag => DynamicEntry::Other { tag, value },
        }
    }
}
