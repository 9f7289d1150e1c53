use super::{ElfReader, IntoElfReader};
use crate::{Result, io_error, truncated};
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

/// Checks that `len` bytes starting at `offset` lie inside a source of `total` bytes.
#[inline]
fn check_range(name: &str, offset: u64, len: usize, total: u64) -> Result<()> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= total => Ok(()),
        _ => Err(truncated(format!(
            "{name}: read of {len} bytes at offset 0x{offset:x} exceeds length 0x{total:x}"
        ))),
    }
}

/// An ELF object source backed by an in-memory byte slice.
///
/// This is useful for inspecting libraries that are already in memory, such
/// as an archive entry read in full.
#[derive(Debug)]
pub struct ElfBinary<'bytes> {
    /// The name assigned to this ELF object.
    name: String,
    /// The raw ELF data.
    bytes: &'bytes [u8],
}

impl<'bytes> ElfBinary<'bytes> {
    /// Creates a new memory-based ELF object.
    ///
    /// # Arguments
    /// - `name` - A string identifier for the ELF object, used in error messages.
    /// - `bytes` - A byte slice containing the complete ELF data.
    ///
    /// # Examples
    /// ```rust
    /// use relinker::input::ElfBinary;
    ///
    /// let data = &[]; // In practice, this would be the bytes of an ELF file
    /// let binary = ElfBinary::new("libfoo.so", data);
    /// ```
    pub fn new(name: &str, bytes: &'bytes [u8]) -> Self {
        Self {
            name: name.to_string(),
            bytes,
        }
    }
}

impl<'bytes> ElfReader for ElfBinary<'bytes> {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_range(&self.name, offset, buf.len(), self.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }
}

/// An ELF object source backed by a file on the filesystem.
///
/// The file handle is owned by this object and closed when it is dropped.
pub struct ElfFile {
    name: String,
    file: File,
    len: u64,
}

impl ElfFile {
    /// Opens the file at the given path for parsing.
    ///
    /// # Returns
    /// - `Ok(ElfFile)` - If the file was successfully opened and its length read.
    /// - `Err` - [`Error::Io`](crate::Error::Io) if the file could not be opened.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file =
            File::open(path).map_err(|err| io_error(format!("failed to open {name}: {err}")))?;
        let len = file
            .metadata()
            .map_err(|err| io_error(format!("failed to stat {name}: {err}")))?
            .len();
        Ok(ElfFile { name, file, len })
    }
}

impl ElfReader for ElfFile {
    fn file_name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()> {
        check_range(&self.name, offset, buf.len(), self.len)?;
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|err| io_error(format!("{}: seek failed: {err}", self.name)))?;
        self.file.read_exact(buf).map_err(|err| {
            // The file shrank underneath us after it was opened.
            if err.kind() == io::ErrorKind::UnexpectedEof {
                truncated(format!("{}: unexpected end of file", self.name))
            } else {
                io_error(format!("{}: read failed: {err}", self.name))
            }
        })
    }
}

impl<'a> IntoElfReader<'a> for &'a Path {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        ElfFile::from_path(self)
    }
}

impl<'a> IntoElfReader<'a> for &'a str {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        ElfFile::from_path(self)
    }
}

impl<'a> IntoElfReader<'a> for &'a [u8] {
    type Reader = ElfBinary<'a>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(ElfBinary::new("<memory>", self))
    }
}

impl<'a> IntoElfReader<'a> for &'a Vec<u8> {
    type Reader = ElfBinary<'a>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(ElfBinary::new("<memory>", self.as_slice()))
    }
}

impl<'a> IntoElfReader<'a> for ElfFile {
    type Reader = ElfFile;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(self)
    }
}

impl<'a, 'b> IntoElfReader<'a> for ElfBinary<'b>
where
    'b: 'a,
{
    type Reader = ElfBinary<'b>;

    fn into_reader(self) -> Result<Self::Reader> {
        Ok(self)
    }
}
