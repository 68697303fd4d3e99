//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout xnbkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every decode failure is fatal for the file being decoded; nothing is
/// retried or skipped. Variants carry the byte offset (relative to the buffer
/// being read when the error was raised) so malformed files can be diagnosed.
#[derive(Debug)]
pub enum Error {
    /// A read ran past the end of the buffer.
    TruncatedInput {
        /// Cursor position when the read was attempted.
        offset: usize,
        /// Bytes the read needed.
        need: usize,
        /// Bytes left in the buffer.
        have: usize,
    },
    /// The file does not start with `XNB`.
    BadMagic {
        /// The three bytes found instead.
        found: [u8; 3],
    },
    /// Decompressed output length differs from the size declared in the
    /// header.
    CorruptCompression {
        /// Size declared in the header.
        expected: usize,
        /// Size actually produced.
        actual: usize,
    },
    /// The compressed bitstream itself is malformed.
    CompressedStream {
        /// Offset within the compressed data.
        offset: usize,
        /// What went wrong.
        reason: &'static str,
    },
    /// No reader is registered for a type name.
    UnsupportedType {
        /// The (assembly-qualified) type or reader name.
        name: String,
        /// Payload offset where the object was dispatched.
        offset: usize,
    },
    /// A shared-resource reference points at a slot that was never filled.
    DanglingReference {
        /// Zero-based slot index.
        slot: usize,
        /// Number of slots declared by the file.
        available: usize,
    },
    /// A structural constraint was violated.
    InvalidData {
        /// Offset of the offending field.
        offset: usize,
        /// Which constraint.
        reason: String,
    },
    /// An underlying I/O operation failed.
    Io(io::Error),
    /// JSON serialization of an exported value failed.
    Json(String),
    /// LZ4 decompression failed.
    #[cfg(feature = "compression")]
    Lz4(String),
    /// PNG encoding failed.
    #[cfg(feature = "png")]
    Png(String),
}

impl Error {
    pub(crate) fn invalid(offset: usize, reason: impl Into<String>) -> Self {
        Error::InvalidData {
            offset,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TruncatedInput { offset, need, have } => write!(
                f,
                "truncated input at offset {offset:#x} (need {need} bytes, have {have})"
            ),
            Error::BadMagic { found } => write!(
                f,
                "bad magic value {:?}, not an XNB file",
                String::from_utf8_lossy(found)
            ),
            Error::CorruptCompression { expected, actual } => write!(
                f,
                "corrupt compressed payload: header declares {expected} bytes, got {actual}"
            ),
            Error::CompressedStream { offset, reason } => {
                write!(f, "corrupt compressed stream at offset {offset:#x}: {reason}")
            }
            Error::UnsupportedType { name, offset } => {
                write!(
                    f,
                    "no type reader registered for {name:?} (at offset {offset:#x}); \
                     custom types need a reader added with Registry::register"
                )
            }
            Error::DanglingReference { slot, available } => write!(
                f,
                "shared resource {slot} referenced but never defined ({available} declared)"
            ),
            Error::InvalidData { offset, reason } => {
                write!(f, "invalid data at offset {offset:#x}: {reason}")
            }
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Json(e) => write!(f, "json serialization failed: {e}"),
            #[cfg(feature = "compression")]
            Error::Lz4(e) => write!(f, "lz4 decompression failed: {e}"),
            #[cfg(feature = "png")]
            Error::Png(e) => write!(f, "png encoding failed: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
