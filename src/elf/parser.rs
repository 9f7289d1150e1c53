use super::{ElfDynamic, ElfHeader, ElfPhdrs, defs::MAX_NEEDED_NAME_LEN};
use crate::{ElfReader, IntoElfReader, Result, corrupt_binary, truncated};
use elf::abi::PT_DYNAMIC;

/// Extracts the `DT_NEEDED` dependency list of a shared library.
///
/// # Examples
/// ```no_run
/// use relinker::elf::ElfParser;
///
/// let mut parser = ElfParser::new("/data/app/lib/libfoo.so").unwrap();
/// for name in parser.parse_needed_dependencies().unwrap() {
///     println!("needs {name}");
/// }
/// ```
pub struct ElfParser<R: ElfReader> {
    object: R,
}

impl<R: ElfReader> ElfParser<R> {
    /// Creates a parser over anything that converts into an [`ElfReader`]:
    /// a path, a byte slice, or an already opened reader.
    pub fn new<'a, I>(input: I) -> Result<Self>
    where
        I: IntoElfReader<'a, Reader = R>,
        R: 'a,
    {
        Ok(Self {
            object: input.into_reader()?,
        })
    }

    /// Reads and validates the file header.
    pub fn parse_header(&mut self) -> Result<ElfHeader> {
        ElfHeader::parse(&mut self.object)
    }

    /// Reads the program header table, honouring extended numbering.
    pub fn parse_program_headers(&mut self, header: &ElfHeader) -> Result<ElfPhdrs> {
        ElfPhdrs::parse(&mut self.object, header)
    }

    /// Returns the names of the libraries this file declares as `DT_NEEDED`,
    /// in dynamic table order.
    ///
    /// A file without a `PT_DYNAMIC` segment has no dependencies and yields an
    /// empty list.
    ///
    /// # Errors
    /// * [`Error::InvalidFormat`](crate::Error::InvalidFormat) for a bad header.
    /// * [`Error::CorruptBinary`](crate::Error::CorruptBinary) if `DT_STRTAB`
    ///   is missing or its address is not covered by any `PT_LOAD` segment.
    /// * [`Error::Truncated`](crate::Error::Truncated) if any read runs past
    ///   the end of the file.
    pub fn parse_needed_dependencies(&mut self) -> Result<Vec<String>> {
        let header = self.parse_header()?;
        let phdrs = self.parse_program_headers(&header)?;

        let Some(dynamic_phdr) = phdrs.find(PT_DYNAMIC) else {
            log::trace!("[ELF] {}: no PT_DYNAMIC segment", self.object.shortname());
            return Ok(Vec::new());
        };
        let dynamic = ElfDynamic::parse(&mut self.object, &header, dynamic_phdr.offset)?;

        let strtab_vaddr = dynamic.strtab.ok_or_else(|| {
            corrupt_binary(format!(
                "{}: dynamic table has no DT_STRTAB entry",
                self.object.shortname()
            ))
        })?;
        let strtab_offset = phdrs.vaddr_to_offset(strtab_vaddr).ok_or_else(|| {
            corrupt_binary(format!(
                "{}: no PT_LOAD segment maps string table address 0x{strtab_vaddr:x}",
                self.object.shortname()
            ))
        })?;

        let mut names = Vec::with_capacity(dynamic.needed.len());
        for name_offset in dynamic.needed {
            let offset = strtab_offset
                .checked_add(name_offset)
                .ok_or_else(|| corrupt_binary("needed name offset overflows"))?;
            names.push(self.read_cstr(offset)?);
        }
        log::debug!(
            "[ELF] {}: needed libraries {:?}",
            self.object.shortname(),
            names
        );
        Ok(names)
    }

    /// Reads a NUL-terminated string starting at `offset`.
    fn read_cstr(&mut self, offset: u64) -> Result<String> {
        let len = self.object.len();
        if offset >= len {
            return Err(truncated(format!(
                "{}: string at 0x{offset:x} starts past end of file",
                self.object.shortname()
            )));
        }
        // Read in chunks, clamped to the file end so a short tail still parses.
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 64];
        let mut cursor = offset;
        loop {
            let avail = (len - cursor).min(chunk.len() as u64) as usize;
            if avail == 0 {
                return Err(truncated(format!(
                    "{}: unterminated string at 0x{offset:x}",
                    self.object.shortname()
                )));
            }
            self.object.read(&mut chunk[..avail], cursor)?;
            if let Some(nul) = chunk[..avail].iter().position(|&b| b == 0) {
                bytes.extend_from_slice(&chunk[..nul]);
                break;
            }
            bytes.extend_from_slice(&chunk[..avail]);
            if bytes.len() > MAX_NEEDED_NAME_LEN {
                return Err(corrupt_binary(format!(
                    "{}: needed name at 0x{offset:x} exceeds {MAX_NEEDED_NAME_LEN} bytes",
                    self.object.shortname()
                )));
            }
            cursor += avail as u64;
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Gives back the underlying reader.
    #[inline]
    pub fn into_inner(self) -> R {
        self.object
    }
}
