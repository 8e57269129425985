//! Caller-facing facade over a [`Backend`].

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use futures::stream::{self, StreamExt};
use tracing::debug;

use super::normalize::{PathNormalizer, StandardNormalizer};
use super::ops::Backend;
use super::types::{ByteStream, Config, PathStream};
use super::VfsResult;

/// Filesystem facade.
///
/// Normalizes every path, merges per-call [`Config`] overrides onto the
/// facade defaults and forwards to the backend. Cloning is cheap; clones
/// share the backend.
#[derive(Clone)]
pub struct FileSystem {
    backend: Arc<dyn Backend>,
    normalizer: Arc<dyn PathNormalizer>,
    defaults: Config,
}

impl fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystem")
            .field("read_only", &self.backend.read_only())
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl FileSystem {
    /// Wrap `backend` with the standard normalizer and empty defaults.
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Wrap an already shared backend.
    pub fn from_arc(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            normalizer: Arc::new(StandardNormalizer::default()),
            defaults: Config::default(),
        }
    }

    /// Replace the path normalizer.
    pub fn with_normalizer(mut self, normalizer: impl PathNormalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// Replace the default config applied to write-class calls.
    pub fn with_config(mut self, defaults: Config) -> Self {
        self.defaults = defaults;
        self
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Defaults applied to write-class calls.
    pub fn defaults(&self) -> &Config {
        &self.defaults
    }

    fn normalize(&self, op: &'static str, path: &str) -> VfsResult<String> {
        let normalized = self.normalizer.normalize_path(path)?;
        debug!(op, path = %normalized, "vfs call");
        Ok(normalized)
    }

    fn merged(&self, config: Option<&Config>) -> Config {
        match config {
            Some(overrides) => self.defaults.extend(overrides),
            None => self.defaults,
        }
    }

    pub async fn file_exists(&self, path: &str) -> VfsResult<bool> {
        let path = self.normalize("file_exists", path)?;
        self.backend.file_exists(&path).await
    }

    pub async fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        let path = self.normalize("read", path)?;
        self.backend.read(&path).await
    }

    pub async fn read_stream(&self, path: &str) -> VfsResult<ByteStream> {
        let path = self.normalize("read_stream", path)?;
        self.backend.read_stream(&path).await
    }

    pub async fn is_directory(&self, path: &str) -> VfsResult<bool> {
        let path = self.normalize("is_directory", path)?;
        self.backend.is_directory(&path).await
    }

    /// List paths under `path`. A path that fails normalization yields a
    /// single error item.
    pub fn list_contents(&self, path: &str, deep: bool, show_directories: bool) -> PathStream {
        match self.normalize("list_contents", path) {
            Ok(path) => self.backend.list_contents(&path, deep, show_directories),
            Err(e) => stream::iter(std::iter::once(Err(e))).boxed(),
        }
    }

    pub async fn write(
        &self,
        path: &str,
        content: &[u8],
        config: Option<&Config>,
    ) -> VfsResult<()> {
        let path = self.normalize("write", path)?;
        self.backend.write(&path, content, &self.merged(config)).await
    }

    pub async fn write_stream(
        &self,
        path: &str,
        content: ByteStream,
        config: Option<&Config>,
    ) -> VfsResult<()> {
        let path = self.normalize("write_stream", path)?;
        self.backend
            .write_stream(&path, content, &self.merged(config))
            .await
    }

    pub async fn delete(&self, path: &str) -> VfsResult<()> {
        let path = self.normalize("delete", path)?;
        self.backend.delete(&path).await
    }

    pub async fn delete_directory(&self, path: &str) -> VfsResult<()> {
        let path = self.normalize("delete_directory", path)?;
        self.backend.delete_directory(&path).await
    }

    pub async fn create_directory(&self, path: &str, config: Option<&Config>) -> VfsResult<()> {
        let path = self.normalize("create_directory", path)?;
        self.backend
            .create_directory(&path, &self.merged(config))
            .await
    }

    pub async fn move_file(
        &self,
        source: &str,
        destination: &str,
        config: Option<&Config>,
    ) -> VfsResult<()> {
        let source = self.normalize("move", source)?;
        let destination = self.normalize("move", destination)?;
        self.backend
            .move_file(&source, &destination, &self.merged(config))
            .await
    }

    pub async fn copy(
        &self,
        source: &str,
        destination: &str,
        config: Option<&Config>,
    ) -> VfsResult<()> {
        let source = self.normalize("copy", source)?;
        let destination = self.normalize("copy", destination)?;
        self.backend
            .copy(&source, &destination, &self.merged(config))
            .await
    }

    pub async fn mime_type(&self, path: &str) -> VfsResult<String> {
        let path = self.normalize("mime_type", path)?;
        self.backend.mime_type(&path).await
    }

    pub async fn last_modified(&self, path: &str) -> VfsResult<SystemTime> {
        let path = self.normalize("last_modified", path)?;
        self.backend.last_modified(&path).await
    }

    pub async fn file_size(&self, path: &str) -> VfsResult<u64> {
        let path = self.normalize("file_size", path)?;
        self.backend.file_size(&path).await
    }

    pub fn read_only(&self) -> bool {
        self.backend.read_only()
    }
}
