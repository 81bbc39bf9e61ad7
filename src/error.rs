use std::{error, fmt, io};

/// Type alias for the result of metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of errors that may occur while performing metadata operations.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// An IO error has occurred, this includes reads past the end of a truncated stream.
    /// Contains the original `io::Error`.
    #[error("io error: {0}")]
    Io(io::Error),
    /// The stream doesn't start with the magic signature of the expected format.
    #[error("missing format signature")]
    NoTag,
    /// A declared size, count or offset is negative, implausibly large or exceeds its parent.
    #[error("corrupt structure")]
    Corrupt,
    /// A nested object consumed more bytes than its declared size.
    #[error("size mismatch")]
    SizeMismatch,
    /// A versioned structure carries a version this library doesn't understand.
    #[error("unknown version {0}")]
    UnknownVersion(u8),
    /// No reader or writer is available for the requested format.
    #[error("unsupported format")]
    UnsupportedFormat,
}

/// A structure able to represent any error that may occur while performing metadata operations.
pub struct Error {
    /// The kind of error.
    pub kind: ErrorKind,
    /// A human readable string describing the error.
    pub description: String,
}

impl Error {
    /// Creates a new `Error` using the error kind and description.
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Error {
        Error { kind, description: description.into() }
    }

    pub(crate) fn corrupt(description: impl Into<String>) -> Error {
        Error::new(ErrorKind::Corrupt, description)
    }

    pub(crate) fn no_tag(description: impl Into<String>) -> Error {
        Error::new(ErrorKind::NoTag, description)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        let description = err.to_string();
        Error { kind: ErrorKind::Io(err), description }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err.kind {
            ErrorKind::Io(e) => e,
            _ => io::Error::new(io::ErrorKind::InvalidData, err.description),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}: {}", self.kind, self.description)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.description)
        }
    }
}
