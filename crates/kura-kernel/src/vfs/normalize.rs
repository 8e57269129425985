//! Path normalization applied by the [`FileSystem`](super::FileSystem) facade.

use super::path::DEFAULT_SEPARATOR;
use super::{VfsError, VfsResult};

/// Turns caller-supplied paths into the canonical form backends expect.
pub trait PathNormalizer: Send + Sync {
    /// Normalize `path`. The root normalizes to `""`.
    fn normalize_path(&self, path: &str) -> VfsResult<String>;
}

/// Default normalizer.
///
/// Accepts both `/` and `\` as separators, drops empty and `.` segments,
/// resolves `..` and joins what is left with the configured separator.
/// A `..` that would climb above the root fails with
/// [`VfsError::PathEscapesRoot`].
#[derive(Debug, Clone)]
pub struct StandardNormalizer {
    separator: String,
}

impl StandardNormalizer {
    /// Normalizer joining segments with `separator`.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }
}

impl Default for StandardNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATOR)
    }
}

impl PathNormalizer for StandardNormalizer {
    fn normalize_path(&self, path: &str) -> VfsResult<String> {
        let mut segments: Vec<&str> = Vec::new();
        for segment in path.trim().split(['/', '\\']) {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(VfsError::path_escapes_root(path));
                    }
                }
                other => segments.push(other),
            }
        }
        Ok(segments.join(&self.separator))
    }
}
