//! Core VFS types shared by every backend.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::VfsResult;

/// Byte payload stream used by `write_stream` / `read_stream`.
pub type ByteStream = BoxStream<'static, VfsResult<Vec<u8>>>;

/// Stream of full paths produced by `list_contents`.
pub type PathStream = BoxStream<'static, VfsResult<String>>;

/// Per-call options for write-class operations.
///
/// The facade merges its defaults with per-call overrides via
/// [`Config::extend`] before handing the result to a backend. Backends
/// without a permission model ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Unix mode for created files and directories (e.g. `0o644`).
    pub permission: Option<u32>,
}

impl Config {
    /// Create an empty config (no options set).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the permission mode.
    pub fn with_permission(mut self, permission: u32) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Merge `overrides` on top of `self`. Every option set in `overrides` wins.
    pub fn extend(&self, overrides: &Config) -> Config {
        Config {
            permission: overrides.permission.or(self.permission),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_extend() {
        let defaults = Config::new().with_permission(0o644);

        let merged = defaults.extend(&Config::new());
        assert_eq!(merged.permission, Some(0o644));

        let merged = defaults.extend(&Config::new().with_permission(0o600));
        assert_eq!(merged.permission, Some(0o600));

        let merged = Config::new().extend(&Config::new());
        assert_eq!(merged.permission, None);
    }
}
