//! Directory nodes of the in-memory tree.
//!
//! A [`TreeNode`] owns its sub-directories and its files outright. Dropping a
//! node drops the whole subtree; there are no back-references.

use indexmap::IndexMap;
use std::time::SystemTime;

/// A stored file: payload plus modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    content: Vec<u8>,
    modified_at: SystemTime,
}

impl FileEntry {
    fn new(content: Vec<u8>) -> Self {
        Self {
            content,
            modified_at: SystemTime::now(),
        }
    }

    /// File payload.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Time of creation or last overwrite.
    pub fn modified_at(&self) -> SystemTime {
        self.modified_at
    }

    /// Payload length in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A directory in the tree (including the root).
///
/// Sub-directories and files live in separate maps, so the same name can be
/// both a directory and a file under one parent. Both maps keep insertion
/// order, which is the order listings come out in.
#[derive(Debug, Clone, Default)]
pub struct TreeNode {
    name: String,
    children: IndexMap<String, TreeNode>,
    files: IndexMap<String, FileEntry>,
}

impl TreeNode {
    /// Create an empty directory node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: IndexMap::new(),
            files: IndexMap::new(),
        }
    }

    /// The segment this node represents (empty for the root).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sub-directories, in insertion order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &TreeNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Files, in insertion order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Direct sub-directory lookup.
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    /// Returns true if `name` is a direct sub-directory.
    pub fn has_directory(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Returns true if the node has neither files nor sub-directories.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.files.is_empty()
    }

    /// Walk down `segments` without creating anything.
    ///
    /// Returns `None` as soon as a segment is missing. An empty slice returns
    /// `self`.
    pub fn navigate(&self, segments: &[&str]) -> Option<&TreeNode> {
        let mut node = self;
        for segment in segments {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    /// Walk down `segments` mutably.
    ///
    /// With `autocreate`, every missing segment gets a fresh empty node and the
    /// result is always `Some`. Without it, a missing segment yields `None`.
    pub fn navigate_mut(&mut self, segments: &[&str], autocreate: bool) -> Option<&mut TreeNode> {
        let Some((first, rest)) = segments.split_first() else {
            return Some(self);
        };

        let next = if autocreate {
            self.children
                .entry((*first).to_string())
                .or_insert_with(|| TreeNode::new(*first))
        } else {
            self.children.get_mut(*first)?
        };
        next.navigate_mut(rest, autocreate)
    }

    /// Direct file lookup, no traversal.
    pub fn get_file(&self, name: &str) -> Option<&FileEntry> {
        self.files.get(name)
    }

    /// Insert or overwrite a file, stamping the current time.
    pub fn set_file(&mut self, name: impl Into<String>, content: Vec<u8>) {
        self.files.insert(name.into(), FileEntry::new(content));
    }

    /// Remove a file. Returns false if it was not there.
    pub fn remove_file(&mut self, name: &str) -> bool {
        self.files.shift_remove(name).is_some()
    }

    /// Remove a sub-directory and its whole subtree. Returns false if it was
    /// not there.
    pub fn remove_directory(&mut self, name: &str) -> bool {
        self.children.shift_remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_empty_is_identity() {
        let mut root = TreeNode::new("");
        root.set_file("a.txt", b"a".to_vec());

        let same = root.navigate(&[]).unwrap();
        assert_eq!(same.name(), "");
        assert!(same.get_file("a.txt").is_some());
    }

    #[test]
    fn test_navigate_missing_is_none() {
        let mut root = TreeNode::new("");
        assert!(root.navigate(&["a", "b"]).is_none());
        assert!(root.navigate_mut(&["a", "b"], false).is_none());
        // A miss must not create anything.
        assert!(root.is_empty());
    }

    #[test]
    fn test_navigate_autocreate() {
        let mut root = TreeNode::new("");
        let leaf = root.navigate_mut(&["a", "b", "c"], true).unwrap();
        assert_eq!(leaf.name(), "c");

        assert!(root.has_directory("a"));
        let b = root.navigate(&["a", "b"]).unwrap();
        assert_eq!(b.name(), "b");
        assert!(b.has_directory("c"));
    }

    #[test]
    fn test_navigate_autocreate_reuses_existing() {
        let mut root = TreeNode::new("");
        root.navigate_mut(&["a"], true)
            .unwrap()
            .set_file("keep.txt", b"x".to_vec());

        root.navigate_mut(&["a", "b"], true).unwrap();
        let a = root.child("a").unwrap();
        assert!(a.get_file("keep.txt").is_some());
        assert!(a.has_directory("b"));
    }

    #[test]
    fn test_set_file_overwrites() {
        let mut node = TreeNode::new("d");
        node.set_file("f", b"one".to_vec());
        let first = node.get_file("f").unwrap().modified_at();

        node.set_file("f", b"three".to_vec());
        let entry = node.get_file("f").unwrap();
        assert_eq!(entry.content(), b"three");
        assert_eq!(entry.size(), 5);
        assert!(entry.modified_at() >= first);
        assert_eq!(node.files().count(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut node = TreeNode::new("d");
        assert!(!node.remove_file("nope"));
        assert!(!node.remove_directory("nope"));
    }

    #[test]
    fn test_remove_directory_drops_subtree() {
        let mut root = TreeNode::new("");
        root.navigate_mut(&["a", "b"], true)
            .unwrap()
            .set_file("f", b"x".to_vec());

        assert!(root.remove_directory("a"));
        assert!(root.navigate(&["a"]).is_none());
        assert!(root.is_empty());
    }

    #[test]
    fn test_file_and_directory_namespaces_are_separate() {
        let mut root = TreeNode::new("");
        root.navigate_mut(&["same"], true).unwrap();
        root.set_file("same", b"file".to_vec());

        assert!(root.has_directory("same"));
        assert_eq!(root.get_file("same").unwrap().content(), b"file");

        root.remove_file("same");
        assert!(root.has_directory("same"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut root = TreeNode::new("");
        for name in ["z", "a", "m"] {
            root.set_file(name, Vec::new());
        }
        root.remove_file("a");
        root.set_file("b", Vec::new());

        let names: Vec<_> = root.files().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["z", "m", "b"]);
    }
}
