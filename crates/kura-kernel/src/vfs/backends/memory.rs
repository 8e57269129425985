//! In-memory filesystem backend.
//!
//! A tree of [`TreeNode`]s behind a single lock. All data is ephemeral and
//! lives as long as the last [`VirtualTree`] handle.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::vfs::error::{VfsError, VfsResult};
use crate::vfs::mime::DEFAULT_MIME_TYPE;
use crate::vfs::node::{FileEntry, TreeNode};
use crate::vfs::ops::Backend;
use crate::vfs::path::PathVector;
use crate::vfs::types::{ByteStream, Config, PathStream};

/// In-memory filesystem backend.
///
/// Every operation takes the tree lock once and holds it for its whole
/// duration. Cloning yields another handle onto the same tree.
#[derive(Debug, Clone, Default)]
pub struct VirtualTree {
    root: Arc<RwLock<TreeNode>>,
    paths: PathVector,
}

impl VirtualTree {
    /// Create an empty tree using `/` as separator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree splitting paths on `separator`.
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            root: Arc::new(RwLock::new(TreeNode::new(""))),
            paths: PathVector::new(separator),
        }
    }

    /// Lazily walk `location`. See [`TreeWalk`].
    pub fn walk(&self, location: &str, deep: bool, show_directories: bool) -> TreeWalk {
        TreeWalk::new(
            Arc::clone(&self.root),
            &self.paths,
            location,
            deep,
            show_directories,
        )
    }

    /// Run `f` on the file at `path`, or fail with NotFound.
    fn with_file<T>(&self, path: &str, f: impl FnOnce(&FileEntry) -> T) -> VfsResult<T> {
        let (owner, leaf) = self.paths.split_leaf(path)?;
        let root = self.root.read();
        root.navigate(&owner)
            .and_then(|node| node.get_file(leaf))
            .map(f)
            .ok_or_else(|| VfsError::not_found(path))
    }

    /// Copy under an already-held lock. Returns false when the source is missing.
    fn copy_locked(
        &self,
        root: &mut TreeNode,
        source: &str,
        destination: &str,
    ) -> VfsResult<bool> {
        let (src_owner, src_leaf) = self.paths.split_leaf(source)?;
        let (dst_owner, dst_leaf) = self.paths.split_leaf(destination)?;

        let Some(content) = root
            .navigate(&src_owner)
            .and_then(|node| node.get_file(src_leaf))
            .map(|entry| entry.content().to_vec())
        else {
            debug!(source, "copy source missing, skipping");
            return Ok(false);
        };

        if let Some(node) = root.navigate_mut(&dst_owner, true) {
            node.set_file(dst_leaf, content);
        }
        Ok(true)
    }
}

#[async_trait]
impl Backend for VirtualTree {
    async fn file_exists(&self, path: &str) -> VfsResult<bool> {
        if path.is_empty() {
            return Ok(false);
        }
        match self.with_file(path, |_| ()) {
            Ok(()) => Ok(true),
            Err(VfsError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn read(&self, path: &str) -> VfsResult<Vec<u8>> {
        self.with_file(path, |entry| entry.content().to_vec())
    }

    async fn read_stream(&self, path: &str) -> VfsResult<ByteStream> {
        let content = self.read(path).await?;
        Ok(stream::iter(std::iter::once(Ok(content))).boxed())
    }

    async fn is_directory(&self, path: &str) -> VfsResult<bool> {
        if path.is_empty() {
            return Ok(true);
        }
        let (owner, leaf) = self.paths.split_leaf(path)?;
        let root = self.root.read();
        Ok(root
            .navigate(&owner)
            .is_some_and(|node| node.has_directory(leaf)))
    }

    fn list_contents(&self, path: &str, deep: bool, show_directories: bool) -> PathStream {
        stream::iter(self.walk(path, deep, show_directories).map(Ok)).boxed()
    }

    #[tracing::instrument(skip(self, content, _config), fields(size = content.len()), name = "vfs.memory.write")]
    async fn write(&self, path: &str, content: &[u8], _config: &Config) -> VfsResult<()> {
        let (owner, leaf) = self.paths.split_leaf(path)?;
        let mut root = self.root.write();
        if let Some(node) = root.navigate_mut(&owner, true) {
            node.set_file(leaf, content.to_vec());
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, content, config), name = "vfs.memory.write_stream")]
    async fn write_stream(
        &self,
        path: &str,
        content: ByteStream,
        config: &Config,
    ) -> VfsResult<()> {
        let buffered: Vec<u8> = content
            .map_err(|e| VfsError::stream_failure(format!("{}: {}", path, e)))
            .try_concat()
            .await?;
        self.write(path, &buffered, config).await
    }

    async fn delete(&self, path: &str) -> VfsResult<()> {
        let (owner, leaf) = self.paths.split_leaf(path)?;
        let mut root = self.root.write();
        if let Some(node) = root.navigate_mut(&owner, false) {
            node.remove_file(leaf);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "vfs.memory.delete_directory")]
    async fn delete_directory(&self, path: &str) -> VfsResult<()> {
        let (owner, leaf) = self.paths.split_leaf(path)?;
        let mut root = self.root.write();
        let removed = root
            .navigate_mut(&owner, false)
            .is_some_and(|node| node.remove_directory(leaf));
        debug!(removed, "delete_directory");
        Ok(())
    }

    async fn create_directory(&self, path: &str, _config: &Config) -> VfsResult<()> {
        let segments = self.paths.segments(path);
        let mut root = self.root.write();
        root.navigate_mut(&segments, true);
        Ok(())
    }

    #[tracing::instrument(skip(self, _config), name = "vfs.memory.move")]
    async fn move_file(&self, source: &str, destination: &str, _config: &Config) -> VfsResult<()> {
        if source == destination {
            return Ok(());
        }
        let mut root = self.root.write();
        if self.copy_locked(&mut root, source, destination)? {
            let (owner, leaf) = self.paths.split_leaf(source)?;
            if let Some(node) = root.navigate_mut(&owner, false) {
                node.remove_file(leaf);
            }
        }
        Ok(())
    }

    async fn copy(&self, source: &str, destination: &str, _config: &Config) -> VfsResult<()> {
        let mut root = self.root.write();
        self.copy_locked(&mut root, source, destination)?;
        Ok(())
    }

    async fn mime_type(&self, _path: &str) -> VfsResult<String> {
        Ok(DEFAULT_MIME_TYPE.to_string())
    }

    async fn last_modified(&self, path: &str) -> VfsResult<SystemTime> {
        self.with_file(path, FileEntry::modified_at)
    }

    async fn file_size(&self, path: &str) -> VfsResult<u64> {
        self.with_file(path, FileEntry::size)
    }
}

/// A directory queued for visiting.
#[derive(Debug)]
struct PendingDir {
    /// Segments from the root. Resolution walks these, never `path`.
    segments: Vec<String>,
    /// Display path yielded to the caller.
    path: String,
    /// Yield the directory's own path when it is visited.
    announce: bool,
}

impl PendingDir {
    fn child(&self, name: &str, separator: &str, announce: bool) -> PendingDir {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        PendingDir {
            segments,
            path: self.child_path(name, separator),
            announce,
        }
    }

    /// Full path of `name` inside this directory. Only the root omits the
    /// separator, so an empty-named directory keeps a distinct path.
    fn child_path(&self, name: &str, separator: &str) -> String {
        if self.segments.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", self.path, separator, name)
        }
    }
}

/// Lazy pre-order walk over a [`VirtualTree`].
///
/// The walk never holds the tree lock between items. Each directory is
/// re-resolved from the root when the walk reaches it and only that
/// directory's entry names are snapshotted, so iteration is weakly
/// consistent: changes made while walking may or may not show up, and a
/// directory removed before it is reached is skipped. Every queued
/// directory sits one segment deeper than its parent, so the walk always
/// ends. Not restartable.
#[derive(Debug)]
pub struct TreeWalk {
    root: Arc<RwLock<TreeNode>>,
    separator: String,
    deep: bool,
    show_directories: bool,
    pending: Vec<PendingDir>,
    ready: VecDeque<String>,
}

impl TreeWalk {
    fn new(
        root: Arc<RwLock<TreeNode>>,
        paths: &PathVector,
        location: &str,
        deep: bool,
        show_directories: bool,
    ) -> Self {
        let segments = paths
            .segments(location)
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            root,
            separator: paths.separator().to_string(),
            deep,
            show_directories,
            pending: vec![PendingDir {
                segments,
                path: location.to_string(),
                announce: false,
            }],
            ready: VecDeque::new(),
        }
    }

    fn visit(&mut self, dir: PendingDir) {
        let root = self.root.read();
        let segments: Vec<&str> = dir.segments.iter().map(String::as_str).collect();
        let Some(node) = root.navigate(&segments) else {
            return;
        };

        if dir.announce {
            self.ready.push_back(dir.path.clone());
        }
        for (name, _) in node.files() {
            self.ready.push_back(dir.child_path(name, &self.separator));
        }

        if self.deep {
            // Reverse so the first child is popped first.
            let children: Vec<_> = node
                .children()
                .map(|(name, _)| dir.child(name, &self.separator, self.show_directories))
                .collect();
            self.pending.extend(children.into_iter().rev());
        } else if self.show_directories {
            for (name, _) in node.children() {
                self.ready.push_back(dir.child_path(name, &self.separator));
            }
        }
    }
}

impl Iterator for TreeWalk {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(path) = self.ready.pop_front() {
                return Some(path);
            }
            let dir = self.pending.pop()?;
            self.visit(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(tree: &VirtualTree, path: &str, deep: bool, dirs: bool) -> Vec<String> {
        tree.list_contents(path, deep, dirs)
            .try_collect::<Vec<_>>()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = VirtualTree::new();
        fs.write("test.txt", b"hello world", &Config::new())
            .await
            .unwrap();

        let data = fs.read("test.txt").await.unwrap();
        assert_eq!(data, b"hello world");
        assert!(fs.file_exists("test.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let fs = VirtualTree::new();
        assert!(fs.read("nope.txt").await.unwrap_err().is_not_found());
        assert!(fs.read("no/such/dir/file").await.unwrap_err().is_not_found());
        assert!(!fs.file_exists("no/such/dir/file").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_does_not_create_directories() {
        let fs = VirtualTree::new();
        let _ = fs.read("ghost/file.txt").await;
        let _ = fs.file_exists("ghost/file.txt").await;
        let _ = fs.file_size("ghost/file.txt").await;
        assert!(!fs.is_directory("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn test_auto_create_parents() {
        let fs = VirtualTree::new();
        fs.write("a/b/c/file.txt", b"x", &Config::new())
            .await
            .unwrap();

        assert!(fs.is_directory("a").await.unwrap());
        assert!(fs.is_directory("a/b").await.unwrap());
        assert!(fs.is_directory("a/b/c").await.unwrap());
        assert!(!fs.is_directory("a/b/c/file.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_directory_root_and_missing() {
        let fs = VirtualTree::new();
        assert!(fs.is_directory("").await.unwrap());
        assert!(!fs.is_directory("missing").await.unwrap());
        assert!(!fs.is_directory("missing/deeper").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_directory_full_path() {
        let fs = VirtualTree::new();
        fs.create_directory("test1/test2", &Config::new())
            .await
            .unwrap();

        assert!(fs.is_directory("test1").await.unwrap());
        assert!(fs.is_directory("test1/test2").await.unwrap());
        assert!(!fs.file_exists("test1/test2").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_path_requires_leaf() {
        let fs = VirtualTree::new();
        let err = fs.write("", b"x", &Config::new()).await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));
        assert!(!fs.file_exists("").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let fs = VirtualTree::new();
        fs.delete("nope.txt").await.unwrap();
        fs.delete("no/such/file").await.unwrap();
        fs.delete_directory("no/such/dir").await.unwrap();
        assert!(collect(&fs, "", true, true).await.is_empty());
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_noop() {
        let fs = VirtualTree::new();
        fs.copy("missing.txt", "dest/copy.txt", &Config::new())
            .await
            .unwrap();
        // The destination owner must not be created for a skipped copy.
        assert!(!fs.is_directory("dest").await.unwrap());
    }

    #[tokio::test]
    async fn test_move_onto_itself_keeps_file() {
        let fs = VirtualTree::new();
        fs.write("same.txt", b"data", &Config::new()).await.unwrap();
        fs.move_file("same.txt", "same.txt", &Config::new())
            .await
            .unwrap();
        assert_eq!(fs.read("same.txt").await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_write_stream_concatenates_chunks() {
        let fs = VirtualTree::new();
        let chunks: ByteStream = stream::iter(vec![
            Ok(b"file ".to_vec()),
            Ok(b"1 ".to_vec()),
            Ok(b"stream".to_vec()),
        ])
        .boxed();

        fs.write_stream("1stream.txt", chunks, &Config::new())
            .await
            .unwrap();
        assert_eq!(fs.read("1stream.txt").await.unwrap(), b"file 1 stream");
    }

    #[tokio::test]
    async fn test_write_stream_failure_leaves_target_untouched() {
        let fs = VirtualTree::new();
        fs.write("target.txt", b"original", &Config::new())
            .await
            .unwrap();

        let chunks: ByteStream = stream::iter(vec![
            Ok(b"partial".to_vec()),
            Err(VfsError::Io(std::io::Error::other("connection reset"))),
        ])
        .boxed();

        let err = fs
            .write_stream("target.txt", chunks, &Config::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::StreamFailure(_)));
        assert_eq!(fs.read("target.txt").await.unwrap(), b"original");

        let chunks: ByteStream =
            stream::iter(vec![Err::<Vec<u8>, _>(VfsError::Io(std::io::Error::other("boom")))]).boxed();
        let _ = fs.write_stream("fresh/new.txt", chunks, &Config::new()).await;
        assert!(!fs.file_exists("fresh/new.txt").await.unwrap());
        assert!(!fs.is_directory("fresh").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_stream_single_chunk() {
        let fs = VirtualTree::new();
        fs.write("s.txt", b"whole payload", &Config::new())
            .await
            .unwrap();

        let chunks: Vec<Vec<u8>> = fs
            .read_stream("s.txt")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, vec![b"whole payload".to_vec()]);

        assert!(fs.read_stream("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_mime_type_is_constant() {
        let fs = VirtualTree::new();
        fs.write("page.html", b"<p>", &Config::new()).await.unwrap();
        assert_eq!(fs.mime_type("page.html").await.unwrap(), DEFAULT_MIME_TYPE);
        assert_eq!(fs.mime_type("missing").await.unwrap(), DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_listing_order_preorder() {
        let fs = VirtualTree::new();
        let cfg = Config::new();
        fs.write("r/one.txt", b"1", &cfg).await.unwrap();
        fs.write("r/b/inner.txt", b"2", &cfg).await.unwrap();
        fs.write("r/b/deeper/leaf.txt", b"3", &cfg).await.unwrap();
        fs.write("r/a/other.txt", b"4", &cfg).await.unwrap();
        fs.write("r/two.txt", b"5", &cfg).await.unwrap();

        let listed = collect(&fs, "r", true, false).await;
        assert_eq!(
            listed,
            vec![
                "r/one.txt",
                "r/two.txt",
                "r/b/inner.txt",
                "r/b/deeper/leaf.txt",
                "r/a/other.txt",
            ]
        );

        let listed = collect(&fs, "r", true, true).await;
        assert_eq!(
            listed,
            vec![
                "r/one.txt",
                "r/two.txt",
                "r/b",
                "r/b/inner.txt",
                "r/b/deeper",
                "r/b/deeper/leaf.txt",
                "r/a",
                "r/a/other.txt",
            ]
        );

        let listed = collect(&fs, "r", false, true).await;
        assert_eq!(listed, vec!["r/one.txt", "r/two.txt", "r/b", "r/a"]);
    }

    #[tokio::test]
    async fn test_listing_root() {
        let fs = VirtualTree::new();
        fs.write("top.txt", b"", &Config::new()).await.unwrap();
        fs.write("d/f.txt", b"", &Config::new()).await.unwrap();

        assert_eq!(collect(&fs, "", false, false).await, vec!["top.txt"]);
        assert_eq!(
            collect(&fs, "", true, false).await,
            vec!["top.txt", "d/f.txt"]
        );
    }

    #[tokio::test]
    async fn test_listing_unresolvable_is_empty() {
        let fs = VirtualTree::new();
        assert!(collect(&fs, "nowhere/at/all", true, true).await.is_empty());
    }

    #[tokio::test]
    async fn test_walk_is_weakly_consistent() {
        let fs = VirtualTree::new();
        let cfg = Config::new();
        fs.write("w/first.txt", b"", &cfg).await.unwrap();
        fs.write("w/gone/x.txt", b"", &cfg).await.unwrap();
        fs.write("w/kept/y.txt", b"", &cfg).await.unwrap();

        let mut walk = fs.walk("w", true, false);
        assert_eq!(walk.next().as_deref(), Some("w/first.txt"));

        // The walk holds no lock between items, so mutation is allowed.
        fs.delete_directory("w/gone").await.unwrap();
        fs.write("w/kept/z.txt", b"", &cfg).await.unwrap();

        let rest: Vec<_> = walk.collect();
        assert_eq!(rest, vec!["w/kept/y.txt", "w/kept/z.txt"]);
    }

    #[tokio::test]
    async fn test_walk_empty_named_directory_terminates() {
        let fs = VirtualTree::new();
        let cfg = Config::new();
        // Unnormalized: the owner is a directory named "" under the root.
        fs.write("/x.txt", b"x", &cfg).await.unwrap();
        fs.write("top.txt", b"t", &cfg).await.unwrap();

        let files: Vec<_> = fs.walk("", true, false).take(10).collect();
        assert_eq!(files, vec!["top.txt", "/x.txt"]);

        let all: Vec<_> = fs.walk("", true, true).take(10).collect();
        assert_eq!(all, vec!["top.txt", "", "/x.txt"]);

        // Listed paths resolve back to what was written.
        assert_eq!(fs.read("/x.txt").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_custom_separator() {
        let fs = VirtualTree::with_separator("\\");
        fs.write("a\\b\\c.txt", b"sep", &Config::new())
            .await
            .unwrap();
        assert!(fs.is_directory("a\\b").await.unwrap());
        assert_eq!(collect(&fs, "a", true, false).await, vec!["a\\b\\c.txt"]);
    }

    #[tokio::test]
    async fn test_clone_shares_tree() {
        let fs = VirtualTree::new();
        let other = fs.clone();
        fs.write("shared.txt", b"s", &Config::new()).await.unwrap();
        assert!(other.file_exists("shared.txt").await.unwrap());
    }
}
