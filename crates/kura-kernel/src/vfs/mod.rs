//! Virtual Filesystem abstraction.
//!
//! This module provides a path-based storage layer with interchangeable
//! backends. Key components:
//!
//! - [`Backend`] - Core trait every storage backend implements
//! - [`FileSystem`] - Facade that normalizes paths and merges [`Config`]
//! - [`VirtualTree`] - In-memory tree of [`TreeNode`]s (for scratch, testing)
//! - [`LocalBackend`] - Local filesystem access (with path security)
//!
//! ## Design Decisions
//!
//! - **String paths, normalized once**: the facade hands backends
//!   separator-joined paths relative to the root; the root is `""`.
//! - **Missing is not an error for removals**: `delete`, `delete_directory`,
//!   `copy` and `move_file` on a missing source change nothing.
//! - **Buffered streaming**: `write_stream` collects the whole payload before
//!   touching the target, so a failed stream leaves it as it was.
//! - **Weakly consistent listing**: `list_contents` is lazy and never holds a
//!   lock between items.

pub mod backends;
mod error;
mod filesystem;
pub mod mime;
mod node;
mod normalize;
mod ops;
mod path;
mod types;

pub use backends::{LocalBackend, TreeWalk, VirtualTree};
pub use error::{VfsError, VfsResult};
pub use filesystem::FileSystem;
pub use node::{FileEntry, TreeNode};
pub use normalize::{PathNormalizer, StandardNormalizer};
pub use ops::Backend;
pub use path::{PathVector, DEFAULT_SEPARATOR};
pub use types::{ByteStream, Config, PathStream};
