//! # kura-kernel
//!
//! Storage-agnostic filesystem abstraction.
//!
//! Callers talk to a [`FileSystem`] facade; the facade normalizes paths and
//! forwards to a [`Backend`]. Two backends ship with the crate:
//! - [`VirtualTree`], an in-memory tree of directories and files
//! - [`LocalBackend`], a directory on disk that paths cannot escape
//!
//! [`Settings`] builds a configured facade from a TOML file.

pub mod settings;
pub mod vfs;

pub use settings::{BackendKind, Settings};
pub use vfs::{
    backends::{LocalBackend, VirtualTree},
    Backend, ByteStream, Config, FileSystem, PathStream, VfsError, VfsResult,
};
