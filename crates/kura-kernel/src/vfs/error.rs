//! VFS error types.

use std::io;
use thiserror::Error;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A source byte stream failed before it was fully buffered.
    #[error("stream failed: {0}")]
    StreamFailure(String),

    /// Invalid path (e.g. empty where a file name is required).
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// Path escapes root (security violation).
    #[error("path escapes root: {0}")]
    PathEscapesRoot(String),

    /// Filesystem is read-only.
    #[error("filesystem is read-only")]
    ReadOnly,

    /// Settings could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a StreamFailure error.
    pub fn stream_failure(msg: impl Into<String>) -> Self {
        Self::StreamFailure(msg.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a PathEscapesRoot error.
    pub fn path_escapes_root(path: impl Into<String>) -> Self {
        Self::PathEscapesRoot(path.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap an I/O error, turning `ErrorKind::NotFound` into [`VfsError::NotFound`]
    /// for the given path so both backends report misses the same way.
    pub fn from_io(path: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.to_string())
        } else {
            Self::Io(err)
        }
    }

    /// Returns true for [`VfsError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_))
    }
}

/// Convert VfsError to std::io::Error for compatibility.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::StreamFailure(msg) => io::Error::new(io::ErrorKind::UnexpectedEof, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::PathEscapesRoot(msg) => {
                io::Error::new(io::ErrorKind::PermissionDenied, msg)
            }
            VfsError::ReadOnly => {
                io::Error::new(io::ErrorKind::PermissionDenied, "filesystem is read-only")
            }
            VfsError::Config(msg) => io::Error::new(io::ErrorKind::InvalidData, msg),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_maps_not_found() {
        let err = VfsError::from_io("a/b.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "not found: a/b.txt");

        let err = VfsError::from_io("a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, VfsError::Io(_)));
    }

    #[test]
    fn test_into_io_error() {
        let io_err: io::Error = VfsError::not_found("x").into();
        assert_eq!(io_err.kind(), io::ErrorKind::NotFound);

        let io_err: io::Error = VfsError::ReadOnly.into();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }
}
