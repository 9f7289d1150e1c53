use crate::Result;

/// A trait for reading ELF data from various sources.
///
/// `ElfReader` abstracts the underlying storage (memory, file system, etc.)
/// providing a unified interface for the parser to access headers and tables.
pub trait ElfReader {
    /// Returns the full name or path of the ELF object.
    fn file_name(&self) -> &str;

    /// Returns the total length of the source in bytes.
    fn len(&self) -> u64;

    /// Reads a chunk of data from the ELF object into the provided buffer.
    ///
    /// # Arguments
    /// * `buf` - The destination buffer. Its length determines the number of bytes read.
    /// * `offset` - The starting byte offset within the ELF source.
    ///
    /// # Errors
    /// Returns [`Error::Truncated`](crate::Error::Truncated) when the range
    /// `offset..offset + buf.len()` extends past the end of the source.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> Result<()>;

    /// Returns the short name of the ELF object (the filename without the path).
    fn shortname(&self) -> &str {
        let name = self.file_name();
        name.rsplit(['/', '\\']).next().unwrap_or(name)
    }
}

/// A trait for converting various input sources into an `ElfReader`.
///
/// This trait allows different types (like file paths or byte slices) to be
/// converted into a reader that implements `ElfReader`.
pub trait IntoElfReader<'a> {
    /// The type of reader produced by this conversion.
    type Reader: ElfReader + 'a;

    /// Converts the input into an `ElfReader`.
    ///
    /// # Returns
    /// * `Ok(reader)` - The converted reader.
    /// * `Err(error)` - If the conversion fails (e.g., file not found).
    fn into_reader(self) -> Result<Self::Reader>;
}
