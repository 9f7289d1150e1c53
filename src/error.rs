use std::borrow::Cow;
use std::fmt::Display;

/// Error types used throughout the `relinker` library.
///
/// Parser errors (`InvalidFormat`, `CorruptBinary`, `Truncated`) describe a
/// malformed library file. The remaining variants describe a failure to get a
/// library into a loadable location or into the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The file does not start with the ELF magic or carries an unknown class
    /// byte.
    InvalidFormat {
        /// A descriptive message about the rejected header.
        msg: Cow<'static, str>,
    },

    /// The dynamic table is present but unusable.
    ///
    /// This error typically indicates issues such as:
    /// * No `DT_STRTAB` entry before `DT_NULL`
    /// * A string table address no `PT_LOAD` segment covers
    /// * Header counts or entry sizes outside sane bounds
    CorruptBinary {
        /// A descriptive message about the malformed structure.
        msg: Cow<'static, str>,
    },

    /// A read ran past the end of the file.
    Truncated {
        /// A descriptive message naming the failed read.
        msg: Cow<'static, str>,
    },

    /// No package archive contains the requested library for any supported ABI.
    MissingLibrary {
        /// The searched ABIs and the ABIs the archives do ship.
        msg: Cow<'static, str>,
    },

    /// The retry budget was exhausted while copying a library into the cache.
    ExtractionFailed {
        /// A descriptive message about the last failed step.
        msg: Cow<'static, str>,
    },

    /// The platform loader refused the library, even after relinking.
    LoadFailed {
        /// The platform loader's own diagnostic.
        msg: Cow<'static, str>,
    },

    /// An error occurred while opening or reading a file outside the parser's
    /// bounds checks (for example a vanished cache file).
    Io {
        /// A descriptive message about the I/O error.
        msg: Cow<'static, str>,
    },

    /// The caller passed an unusable argument (for example an empty name).
    InvalidArgument {
        /// A descriptive message about the argument.
        msg: Cow<'static, str>,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidFormat { msg } => write!(f, "Invalid ELF format: {msg}"),
            Error::CorruptBinary { msg } => write!(f, "Corrupt ELF binary: {msg}"),
            Error::Truncated { msg } => write!(f, "Truncated ELF binary: {msg}"),
            Error::MissingLibrary { msg } => write!(f, "Missing library: {msg}"),
            Error::ExtractionFailed { msg } => write!(f, "Extraction failed: {msg}"),
            Error::LoadFailed { msg } => write!(f, "Load failed: {msg}"),
            Error::Io { msg } => write!(f, "I/O error: {msg}"),
            Error::InvalidArgument { msg } => write!(f, "Invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Whether the error came from the binary parser rather than from
    /// installation or loading.
    #[inline]
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat { .. } | Error::CorruptBinary { .. } | Error::Truncated { .. }
        )
    }
}

#[cold]
#[inline(never)]
pub(crate) fn invalid_format(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::InvalidFormat { msg: msg.into() }
}

/// Creates a corrupt-binary error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn corrupt_binary(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::CorruptBinary { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn truncated(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Truncated { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn missing_library(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::MissingLibrary { msg: msg.into() }
}

/// Creates an extraction error with the specified message.
///
/// Used once the installer's retry budget is exhausted.
#[cold]
#[inline(never)]
pub(crate) fn extraction_failed(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ExtractionFailed { msg: msg.into() }
}

/// Creates a load error with the specified message.
///
/// This is public so custom [`LibraryLoader`](crate::os::LibraryLoader)
/// implementations can report explicit-path failures.
#[cold]
#[inline(never)]
pub fn load_failed(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::LoadFailed { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

#[cold]
#[inline(never)]
pub(crate) fn invalid_argument(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::InvalidArgument { msg: msg.into() }
}
