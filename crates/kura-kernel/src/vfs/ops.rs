//! Backend operations trait.
//!
//! Every storage backend implements [`Backend`]. Paths arrive already
//! normalized by the [`FileSystem`](super::FileSystem) facade: separator-joined,
//! relative to the backend root, with the root itself being `""`.

use async_trait::async_trait;
use std::time::SystemTime;

use super::types::{ByteStream, Config, PathStream};
use super::VfsResult;

/// Core storage contract.
///
/// Read-class calls on a missing target return [`VfsError::NotFound`](super::VfsError::NotFound)
/// through the normal result channel. `delete`, `delete_directory`, `copy` and
/// `move_file` on a missing source complete without error and change nothing.
/// Write-class calls create missing parent directories.
#[async_trait]
pub trait Backend: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Returns true if a file (not a directory) exists at `path`.
    async fn file_exists(&self, path: &str) -> VfsResult<bool>;

    /// Read the whole file.
    async fn read(&self, path: &str) -> VfsResult<Vec<u8>>;

    /// Read the file as a stream of chunks.
    async fn read_stream(&self, path: &str) -> VfsResult<ByteStream>;

    /// Returns true if `path` names a directory.
    async fn is_directory(&self, path: &str) -> VfsResult<bool>;

    /// List full paths under `path`.
    ///
    /// Files of a directory come first, then its sub-directories. With `deep`
    /// each sub-directory is walked in turn (pre-order); with
    /// `show_directories` directory paths are yielded too. An unresolvable
    /// location produces an empty stream.
    fn list_contents(&self, path: &str, deep: bool, show_directories: bool) -> PathStream;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Create or overwrite a file.
    async fn write(&self, path: &str, content: &[u8], config: &Config) -> VfsResult<()>;

    /// Create or overwrite a file from a stream.
    ///
    /// A stream error fails with [`VfsError::StreamFailure`](super::VfsError::StreamFailure)
    /// and leaves the target untouched.
    async fn write_stream(&self, path: &str, content: ByteStream, config: &Config)
        -> VfsResult<()>;

    /// Remove a file.
    async fn delete(&self, path: &str) -> VfsResult<()>;

    /// Remove a directory and everything under it.
    async fn delete_directory(&self, path: &str) -> VfsResult<()>;

    /// Create a directory and any missing parents.
    async fn create_directory(&self, path: &str, config: &Config) -> VfsResult<()>;

    /// Copy a file, then remove the source.
    async fn move_file(&self, source: &str, destination: &str, config: &Config)
        -> VfsResult<()>;

    /// Copy a file, creating the destination's parent directories.
    async fn copy(&self, source: &str, destination: &str, config: &Config) -> VfsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Content type of the file at `path`.
    async fn mime_type(&self, path: &str) -> VfsResult<String>;

    /// Time of last modification.
    async fn last_modified(&self, path: &str) -> VfsResult<SystemTime>;

    /// File size in bytes.
    async fn file_size(&self, path: &str) -> VfsResult<u64>;

    /// Returns true if this backend rejects write-class calls.
    fn read_only(&self) -> bool {
        false
    }
}
