//! The descriptor layer: open files, the global open file table, the descriptor table
//! of each task and the interface it expects from the storage layer.
pub mod fd;
pub mod file;
pub mod node;
pub mod table;

pub use fd::{Descriptor, Descriptors};
pub use file::{AccessMode, Mode, Offset, OpenFile, OpenFlags, Whence};
pub use node::{Error, Filesystem, Kind, Node, NodeRef, Stat, Transfer};
pub use table::{Index, OpenFileTable, Release};
