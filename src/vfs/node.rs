use super::file::{Mode, Offset, OpenFlags};
use crate::prelude::*;
use core::ops::Deref;

/// The type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    CharDevice,
    File,
}

/// Informations about a node, as returned by [`Node::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stat {
    /// The type of the node.
    pub kind: Kind,

    /// The size of the node, in bytes. Always 0 for character devices.
    pub size: u64,
}

/// The result of a successful read or write on a node: the number of bytes actually
/// transferred and the offset right after the last byte transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transfer {
    pub bytes: usize,
    pub offset: Offset,
}

/// An object of the storage layer: a regular file, a device... This is the only
/// interface the descriptor layer uses to access the data behind an open file.
pub trait Node: Send + Sync {
    /// Reads from the node at the given offset into the given buffer. A short read is
    /// not an error, and reading at or after the end of the node returns 0 bytes.
    ///
    /// # Errors
    /// If the node could not be read, an error is returned, described by the [`Error`]
    /// enum.
    fn read(&self, buf: &mut [u8], offset: Offset) -> Result<Transfer, Error>;

    /// Writes the given buffer to the node at the given offset.
    ///
    /// # Errors
    /// If the buffer could not be written to the node, an error is returned, described
    /// by the [`Error`] enum.
    fn write(&self, buf: &[u8], offset: Offset) -> Result<Transfer, Error>;

    /// Writes the given buffer at the end of the node. Finding the end and writing
    /// must be a single step, so that concurrent appends never overwrite each other,
    /// even through different open files.
    ///
    /// # Errors
    /// Same as [`Node::write`].
    fn append(&self, buf: &[u8]) -> Result<Transfer, Error>;

    /// Returns informations about the node.
    ///
    /// # Errors
    /// If the informations could not be retrieved, an error is returned, described by
    /// the [`Error`] enum.
    fn stat(&self) -> Result<Stat, Error>;

    /// Returns true if the node supports random access. Devices that produce a stream
    /// of bytes, like the console, are not seekable.
    fn is_seekable(&self) -> bool;

    /// Called exactly once for every successful open of this node, when the last
    /// reference to the open file is gone.
    fn close(&self);
}

/// The storage layer seen from the descriptor layer. It resolves a path into a node,
/// creating or truncating it according to the flags.
pub trait Filesystem: Send + Sync {
    /// Opens the node designated by `path`. The mode is only meaningful when the node
    /// is created.
    ///
    /// # Errors
    /// If the node could not be opened, an error is returned, described by the [`Error`]
    /// enum. The error is reported unchanged to the task that tried to open the node.
    fn open(&self, path: &str, flags: OpenFlags, mode: Mode) -> Result<NodeRef, Error>;
}

/// An opened node. Dropping it closes the node, so each successful [`Filesystem::open`]
/// is balanced by exactly one [`Node::close`].
pub struct NodeRef(Arc<dyn Node>);

impl NodeRef {
    /// Wraps a node that has just been opened.
    #[must_use]
    pub fn new(node: Arc<dyn Node>) -> Self {
        Self(node)
    }
}

impl Deref for NodeRef {
    type Target = dyn Node;
    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl Drop for NodeRef {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl core::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeRef")
            .field("seekable", &self.0.is_seekable())
            .finish_non_exhaustive()
    }
}

/// The errors reported by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The node does not exist and was not created.
    NoSuchFile,

    /// The node exists but its permissions forbid the requested access.
    PermissionDenied,

    /// The path designates a directory, which cannot be opened as a file.
    IsADirectory,

    /// A component of the path used as a directory is not a directory.
    NotADirectory,

    /// There is no space left to grow the node.
    NoSpace,

    /// An I/O error occurred while accessing the node.
    IoError,
}
