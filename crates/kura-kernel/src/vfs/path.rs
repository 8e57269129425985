//! Splitting normalized locations into path segments.

use super::{VfsError, VfsResult};

/// Default segment separator.
pub const DEFAULT_SEPARATOR: &str = "/";

/// Turns a normalized location into the segment vector a tree walks.
///
/// No validation happens here: empty segments, `.` and `..` are passed
/// through untouched. Normalization belongs to the facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathVector {
    separator: String,
}

impl Default for PathVector {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl PathVector {
    /// Create a path vector splitting on `separator`.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// The configured separator.
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Split `location` into its segments. The empty location is the root and
    /// yields no segments.
    pub fn segments<'a>(&self, location: &'a str) -> Vec<&'a str> {
        if location.is_empty() {
            return Vec::new();
        }
        location.split(self.separator.as_str()).collect()
    }

    /// Split `location` into (owner directory segments, leaf name).
    pub fn split_leaf<'a>(&self, location: &'a str) -> VfsResult<(Vec<&'a str>, &'a str)> {
        let mut segments = self.segments(location);
        let leaf = segments
            .pop()
            .ok_or_else(|| VfsError::invalid_path(location))?;
        Ok((segments, leaf))
    }

    /// Build the full path of `name` inside `prefix`.
    pub fn join(&self, prefix: &str, name: &str) -> String {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", prefix, self.separator, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        let pv = PathVector::default();
        assert_eq!(pv.segments("a/b/c.txt"), vec!["a", "b", "c.txt"]);
        assert_eq!(pv.segments("file"), vec!["file"]);
        assert!(pv.segments("").is_empty());
    }

    #[test]
    fn test_segments_not_validated() {
        let pv = PathVector::default();
        assert_eq!(pv.segments("a//b"), vec!["a", "", "b"]);
        assert_eq!(pv.segments("./a/.."), vec![".", "a", ".."]);
    }

    #[test]
    fn test_split_leaf() {
        let pv = PathVector::default();
        let (owner, leaf) = pv.split_leaf("a/b/c.txt").unwrap();
        assert_eq!(owner, vec!["a", "b"]);
        assert_eq!(leaf, "c.txt");

        let (owner, leaf) = pv.split_leaf("top.txt").unwrap();
        assert!(owner.is_empty());
        assert_eq!(leaf, "top.txt");
    }

    #[test]
    fn test_split_leaf_empty_fails() {
        let pv = PathVector::default();
        assert!(matches!(pv.split_leaf(""), Err(VfsError::InvalidPath(_))));
    }

    #[test]
    fn test_custom_separator() {
        let pv = PathVector::new("::");
        assert_eq!(pv.segments("a::b"), vec!["a", "b"]);
        assert_eq!(pv.join("a", "b"), "a::b");
        assert_eq!(pv.join("", "b"), "b");
    }
}
