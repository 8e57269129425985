//! Settings for building a [`FileSystem`] from a TOML file.
//!
//! ```toml
//! backend = "local"      # "memory" (default) or "local"
//! root = "/srv/data"     # required for "local"
//! read_only = false
//! separator = "/"        # segment separator of the in-memory tree
//!
//! [defaults]
//! permission = 0o644     # merged into every write-class call
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::vfs::{
    Config, FileSystem, LocalBackend, StandardNormalizer, VfsError, VfsResult, VirtualTree,
    DEFAULT_SEPARATOR,
};

/// Which storage backend the facade wraps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory [`VirtualTree`].
    #[default]
    Memory,
    /// Disk-backed [`LocalBackend`].
    Local,
}

/// Settings file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub backend: BackendKind,

    /// Root directory of the local backend.
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Reject write-class calls (local backend only).
    #[serde(default)]
    pub read_only: bool,

    #[serde(default = "default_separator")]
    pub separator: String,

    /// Config merged into every write-class call.
    #[serde(default)]
    pub defaults: Config,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            root: None,
            read_only: false,
            separator: default_separator(),
            defaults: Config::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| VfsError::config(format!("failed to read {}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml(content: &str) -> VfsResult<Self> {
        let settings: Settings =
            toml::from_str(content).map_err(|e| VfsError::config(e.to_string()))?;
        if settings.separator.is_empty() {
            return Err(VfsError::config("separator must not be empty"));
        }
        Ok(settings)
    }

    /// Build the configured facade.
    pub fn build_filesystem(&self) -> VfsResult<FileSystem> {
        let fs = match self.backend {
            BackendKind::Memory => {
                FileSystem::new(VirtualTree::with_separator(self.separator.clone()))
                    .with_normalizer(StandardNormalizer::new(self.separator.clone()))
            }
            BackendKind::Local => {
                let root = self
                    .root
                    .as_ref()
                    .ok_or_else(|| VfsError::config("local backend requires `root`"))?;
                let mut backend = LocalBackend::new(root);
                backend.set_read_only(self.read_only);
                tracing::info!(root = %backend.root().display(), read_only = self.read_only, "local backend");
                FileSystem::new(backend)
            }
        };
        Ok(fs.with_config(self.defaults))
    }
}
