//! Local filesystem backend.
//!
//! Provides access to real filesystem paths, with path security
//! to prevent escaping the root directory.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::mime::guess_mime_type;
use crate::vfs::ops::Backend;
use crate::vfs::path::PathVector;
use crate::vfs::types::{ByteStream, Config, PathStream};

/// Chunk size used by `read_stream`.
const READ_CHUNK: usize = 64 * 1024;

/// Local filesystem backend.
///
/// All operations are relative to `root`. For example, if `root` is
/// `/home/amy/project`, then `read("src/main.rs")` reads
/// `/home/amy/project/src/main.rs`.
///
/// Path security is enforced: `..` components are refused and existing
/// symlinks that lead outside the root are caught after canonicalization.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    read_only: bool,
}

impl LocalBackend {
    /// Create a new local filesystem rooted at the given path.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` → `/private/tmp`). It does not have to exist yet;
    /// the first write creates it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = canonical_root(root.into());
        Self {
            root,
            read_only: false,
        }
    }

    /// Create a read-only local filesystem.
    pub fn read_only(root: impl Into<PathBuf>) -> Self {
        let mut backend = Self::new(root);
        backend.read_only = true;
        backend
    }

    /// Set whether this filesystem is read-only.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a backend path to an absolute path within the root.
    fn resolve(&self, path: &str) -> VfsResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(VfsError::path_escapes_root(path));
        }

        let full = self.root.join(relative);

        // Symlinks can still lead out: check the deepest existing ancestor
        // inside the root. A root that does not exist yet has none.
        if let Some(existing) = full
            .ancestors()
            .take_while(|p| p.starts_with(&self.root))
            .find(|p| p.exists())
        {
            let canonical = dunce::canonicalize(existing).map_err(VfsError::from)?;
            if !canonical.starts_with(&self.root) {
                return Err(VfsError::path_escapes_root(format!(
                    "{} is not under {}",
                    canonical.display(),
                    self.root.display()
                )));
            }
        }

        Ok(full)
    }

    /// Check if write operations are allowed.
    fn check_writable(&self) -> VfsResult<()> {
        if self.read_only {
            Err(VfsError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Metadata of `full`, `None` when it does not exist.
    async fn metadata(path: &str, full: &Path) -> VfsResult<Option<std::fs::Metadata>> {
        match fs::metadata(full).await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VfsError::from_io(path, e)),
        }
    }

    /// Metadata of a regular file, or NotFound.
    async fn file_metadata(&self, path: &str) -> VfsResult<std::fs::Metadata> {
        let full = self.resolve(path)?;
        match Self::metadata(path, &full).await? {
            Some(meta) if meta.is_file() => Ok(meta),
            _ => Err(VfsError::not_found(path)),
        }
    }

    /// Create the parent directories of `full`.
    async fn ensure_parent(full: &Path, config: &Config) -> VfsResult<()> {
        if let Some(parent) = full.parent() {
            create_dir_all(parent, config).await?;
        }
        Ok(())
    }

    /// Returns true if `path` names an existing regular file.
    async fn is_file(&self, path: &str, full: &Path) -> VfsResult<bool> {
        Ok(Self::metadata(path, full)
            .await?
            .is_some_and(|meta| meta.is_file()))
    }
}

/// Canonicalize `root`, or its deepest existing ancestor when `root` itself
/// is missing, so later prefix checks compare like with like.
fn canonical_root(root: PathBuf) -> PathBuf {
    if let Ok(canonical) = dunce::canonicalize(&root) {
        return canonical;
    }
    let absolute = std::path::absolute(&root).unwrap_or(root);
    for ancestor in absolute.ancestors().skip(1) {
        let Ok(base) = dunce::canonicalize(ancestor) else {
            continue;
        };
        if let Ok(rest) = absolute.strip_prefix(ancestor) {
            return base.join(rest);
        }
    }
    absolute
}

#[cfg(unix)]
async fn create_dir_all(dir: &Path, config: &Config) -> VfsResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    if let Some(mode) = config.permission {
        builder.mode(mode);
    }
    builder.create(dir).await.map_err(VfsError::from)
}

#[cfg(not(unix))]
async fn create_dir_all(dir: &Path, _config: &Config) -> VfsResult<()> {
    fs::create_dir_all(dir).await.map_err(VfsError::from)
}

#[cfg(unix)]
async fn apply_permission(full: &Path, config: &Config) -> VfsResult<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = config.permission {
        fs::set_permissions(full, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(VfsError::from)?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn apply_permission(_full: &Path, _config: &Config) -> VfsResult<()> {
    Ok(())
}

/// Sibling path a streamed write is staged in before the final rename.
fn staging_path(full: &Path) -> PathBuf {
    let name = full
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    full.with_file_name(format!(".{}.kura-partial", name))
}

#[async_trait]
impl Backend for LocalBackend {
    async fn file_exists(&self, path: &str) -> VfsResult<bool> {
        let full = self.resolve(path)?;
        self.is_file(path, &full).await
    }

    async fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        let full = self.resolve(path)?;
        if !self.is_file(path, &full).await? {
            return Err(VfsError::not_found(path));
        }
        fs::read(&full).await.map_err(|e| VfsError::from_io(path, e))
    }

    async fn read_stream(&self, path: &str) -> VfsResult<ByteStream> {
        let full = self.resolve(path)?;
        if !self.is_file(path, &full).await? {
            return Err(VfsError::not_found(path));
        }
        let file = fs::File::open(&full)
            .await
            .map_err(|e| VfsError::from_io(path, e))?;

        let chunks = stream::unfold(Some(file), |state| async move {
            let mut file = state?;
            let mut buffer = vec![0u8; READ_CHUNK];
            match file.read(&mut buffer).await {
                Ok(0) => None,
                Ok(n) => {
                    buffer.truncate(n);
                    Some((Ok(buffer), Some(file)))
                }
                // Yield the error once, then end the stream.
                Err(e) => Some((Err(VfsError::Io(e)), None)),
            }
        });
        Ok(chunks.boxed())
    }

    async fn is_directory(&self, path: &str) -> VfsResult<bool> {
        let full = self.resolve(path)?;
        Ok(Self::metadata(path, &full)
            .await?
            .is_some_and(|meta| meta.is_dir()))
    }

    fn list_contents(&self, path: &str, deep: bool, show_directories: bool) -> PathStream {
        let start = match self.resolve(path) {
            Ok(start) => start,
            Err(e) => return stream::iter(std::iter::once(Err(e))).boxed(),
        };

        let walk = DiskWalk {
            paths: PathVector::default(),
            deep,
            show_directories,
            pending: vec![DiskDir {
                full: start,
                display: path.trim_matches('/').to_string(),
                announce: false,
            }],
            ready: VecDeque::new(),
        };

        stream::unfold(walk, |mut walk| async move {
            loop {
                if let Some(item) = walk.ready.pop_front() {
                    return Some((item, walk));
                }
                let dir = walk.pending.pop()?;
                walk.visit(dir).await;
            }
        })
        .boxed()
    }

    #[tracing::instrument(skip(self, content, config), fields(size = content.len()), name = "vfs.local.write")]
    async fn write(&self, path: &str, content: &[u8], config: &Config) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        Self::ensure_parent(&full, config).await?;
        fs::write(&full, content).await.map_err(VfsError::from)?;
        apply_permission(&full, config).await
    }

    #[tracing::instrument(skip(self, content, config), name = "vfs.local.write_stream")]
    async fn write_stream(
        &self,
        path: &str,
        mut content: ByteStream,
        config: &Config,
    ) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        Self::ensure_parent(&full, config).await?;

        let staging = staging_path(&full);
        let mut file = fs::File::create(&staging).await.map_err(VfsError::from)?;

        let mut failure = None;
        while let Some(chunk) = content.next().await {
            let result = match chunk {
                Ok(bytes) => file.write_all(&bytes).await.map_err(VfsError::from),
                Err(e) => Err(VfsError::stream_failure(format!("{}: {}", path, e))),
            };
            if let Err(e) = result {
                failure = Some(e);
                break;
            }
        }
        if failure.is_none() {
            if let Err(e) = file.flush().await {
                failure = Some(VfsError::from(e));
            }
        }
        drop(file);

        if let Some(e) = failure {
            if let Err(cleanup) = fs::remove_file(&staging).await {
                warn!(staging = %staging.display(), "failed to remove partial file: {}", cleanup);
            }
            return Err(e);
        }

        fs::rename(&staging, &full).await.map_err(VfsError::from)?;
        apply_permission(&full, config).await
    }

    async fn delete(&self, path: &str) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        match fs::remove_file(&full).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path, "delete target missing, skipping");
                Ok(())
            }
            other => other.map_err(VfsError::from),
        }
    }

    #[tracing::instrument(skip(self), name = "vfs.local.delete_directory")]
    async fn delete_directory(&self, path: &str) -> VfsResult<()> {
        self.check_writable()?;
        if path.trim_matches('/').is_empty() {
            return Err(VfsError::invalid_path(path));
        }
        let full = self.resolve(path)?;
        match fs::remove_dir_all(&full).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other.map_err(VfsError::from),
        }
    }

    async fn create_directory(&self, path: &str, config: &Config) -> VfsResult<()> {
        self.check_writable()?;
        let full = self.resolve(path)?;
        create_dir_all(&full, config).await
    }

    #[tracing::instrument(skip(self, config), name = "vfs.local.move")]
    async fn move_file(&self, source: &str, destination: &str, config: &Config) -> VfsResult<()> {
        self.check_writable()?;
        let from = self.resolve(source)?;
        let to = self.resolve(destination)?;
        if from == to {
            return Ok(());
        }
        if !self.is_file(source, &from).await? {
            debug!(source, "move source missing, skipping");
            return Ok(());
        }

        Self::ensure_parent(&to, config).await?;
        fs::rename(&from, &to).await.map_err(VfsError::from)
    }

    async fn copy(&self, source: &str, destination: &str, config: &Config) -> VfsResult<()> {
        self.check_writable()?;
        let from = self.resolve(source)?;
        let to = self.resolve(destination)?;
        // fs::copy truncates the destination before reading the source.
        if from == to {
            return Ok(());
        }
        if !self.is_file(source, &from).await? {
            debug!(source, "copy source missing, skipping");
            return Ok(());
        }

        Self::ensure_parent(&to, config).await?;
        fs::copy(&from, &to).await.map_err(VfsError::from)?;
        apply_permission(&to, config).await
    }

    async fn mime_type(&self, path: &str) -> VfsResult<String> {
        Ok(guess_mime_type(path).to_string())
    }

    async fn last_modified(&self, path: &str) -> VfsResult<SystemTime> {
        let meta = self.file_metadata(path).await?;
        meta.modified().map_err(VfsError::from)
    }

    async fn file_size(&self, path: &str) -> VfsResult<u64> {
        Ok(self.file_metadata(path).await?.len())
    }

    fn read_only(&self) -> bool {
        self.read_only
    }
}

/// A directory queued for visiting by [`DiskWalk`].
#[derive(Debug)]
struct DiskDir {
    full: PathBuf,
    display: String,
    announce: bool,
}

/// Lazy pre-order directory walk, one `read_dir` per visited directory.
#[derive(Debug)]
struct DiskWalk {
    paths: PathVector,
    deep: bool,
    show_directories: bool,
    pending: Vec<DiskDir>,
    ready: VecDeque<VfsResult<String>>,
}

impl DiskWalk {
    async fn visit(&mut self, dir: DiskDir) {
        let mut files = Vec::new();
        let mut dirs = Vec::new();

        let mut entries = match fs::read_dir(&dir.full).await {
            Ok(entries) => entries,
            // Vanished or never a directory: nothing to list.
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                return;
            }
            Err(e) => {
                self.ready.push_back(Err(VfsError::Io(e)));
                return;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    match entry.file_type().await {
                        Ok(kind) if kind.is_dir() => dirs.push(name),
                        Ok(_) => files.push(name),
                        Err(e) => self.ready.push_back(Err(VfsError::Io(e))),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    self.ready.push_back(Err(VfsError::Io(e)));
                    break;
                }
            }
        }
        files.sort();
        dirs.sort();

        if dir.announce {
            self.ready.push_back(Ok(dir.display.clone()));
        }
        for name in &files {
            self.ready.push_back(Ok(self.paths.join(&dir.display, name)));
        }

        if self.deep {
            for name in dirs.iter().rev() {
                self.pending.push(DiskDir {
                    full: dir.full.join(name),
                    display: self.paths.join(&dir.display, name),
                    announce: self.show_directories,
                });
            }
        } else if self.show_directories {
            for name in &dirs {
                self.ready.push_back(Ok(self.paths.join(&dir.display, name)));
            }
        }
    }
}
