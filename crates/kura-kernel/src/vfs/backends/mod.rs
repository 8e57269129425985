//! VFS backends.
//!
//! Backends implement [`Backend`](super::Backend) for different storage types.

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::{TreeWalk, VirtualTree};
