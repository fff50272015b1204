use super::node::{self, NodeRef};
use crate::prelude::*;

bitflags::bitflags! {
    /// The flags used to open a file. The access mode is encoded in the two lowest
    /// bits: no bit set means read-only, and setting both bits is invalid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: usize {
        /// The file is opened for writing only.
        const WRITE_ONLY = 1 << 0;

        /// The file is opened for reading and writing.
        const READ_WRITE = 1 << 1;

        /// The file is created if it does not exist.
        const CREATE = 1 << 2;

        /// The file is truncated to 0 length if it exists.
        const TRUNCATE = 1 << 4;

        /// Every write is done at the end of the file.
        const APPEND = 1 << 5;
    }
}

impl OpenFlags {
    /// The flags of a file opened for reading only.
    pub const READ_ONLY: Self = Self::empty();

    /// Parses the raw flags passed by a task. Returns `None` if an unknown bit is set
    /// or if the access mode is invalid.
    #[must_use]
    pub fn parse(raw: usize) -> Option<Self> {
        let flags = Self::from_bits(raw)?;
        flags.access_mode().map(|_| flags)
    }

    /// Returns the access mode encoded in these flags, or `None` if both the
    /// write-only and read-write bits are set.
    #[must_use]
    pub fn access_mode(&self) -> Option<AccessMode> {
        match (
            self.contains(Self::WRITE_ONLY),
            self.contains(Self::READ_WRITE),
        ) {
            (false, false) => Some(AccessMode::ReadOnly),
            (true, false) => Some(AccessMode::WriteOnly),
            (false, true) => Some(AccessMode::ReadWrite),
            (true, true) => None,
        }
    }
}

/// How an open file can be accessed. It is fixed when the file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    #[must_use]
    pub const fn readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    #[must_use]
    pub const fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// The permission bits given to a file when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(pub u32);

impl Mode {
    pub const OWNER_READ: u32 = 0o400;
    pub const OWNER_WRITE: u32 = 0o200;

    /// Creates a mode from the raw value passed by a task. Only the permission bits
    /// are kept.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_raw(raw: usize) -> Self {
        Self((raw & 0o7777) as u32)
    }

    #[must_use]
    pub const fn owner_can_read(self) -> bool {
        self.0 & Self::OWNER_READ != 0
    }

    #[must_use]
    pub const fn owner_can_write(self) -> bool {
        self.0 & Self::OWNER_WRITE != 0
    }
}

/// An offset in a file. It is never negative.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(pub u64);

impl Offset {
    /// The greatest offset a task can observe. Offsets are returned to userland in a
    /// register that is interpreted as signed, so they must fit in an `isize`.
    #[allow(clippy::cast_sign_loss)]
    pub const MAX: Self = Self(isize::MAX as u64);

    /// Moves the offset by `delta` bytes. Returns `None` if the result would be
    /// negative or greater than [`Offset::MAX`].
    #[must_use]
    pub fn checked_move(self, delta: i64) -> Option<Self> {
        let position = if delta < 0 {
            self.0.checked_sub(delta.unsigned_abs())?
        } else {
            self.0.checked_add(delta.unsigned_abs())?
        };

        (position <= Self::MAX.0).then_some(Self(position))
    }
}

/// The seek mode for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Whence {
    /// Seek from the beginning of the file.
    Start,

    /// Seek from the current offset.
    Current,

    /// Seek from the end of the file.
    End,
}

impl TryFrom<usize> for Whence {
    type Error = ();

    fn try_from(whence: usize) -> Result<Self, Self::Error> {
        match whence {
            0 => Ok(Self::Start),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            _ => Err(()),
        }
    }
}

/// An open file. It is created by each successful open, and shared by every
/// descriptor duplicated from the one returned by that open.
#[derive(Debug)]
pub struct OpenFile {
    /// The node opened by this file. It is closed when the file is dropped.
    node: NodeRef,

    /// The flags used to open this file.
    flags: OpenFlags,

    /// The access mode of this file, extracted from the flags.
    access: AccessMode,

    /// The current state of this file. It is stored in a separate structure to
    /// avoid locking the file just to read fields that are never modified, like
    /// the access mode.
    state: Spinlock<OpenFileState>,
}

/// The state of an open file. It contains informations about the file that
/// can change over time, like the current offset in the file.
#[derive(Debug, Default)]
pub struct OpenFileState {
    /// The current offset in the file.
    pub offset: Offset,
}

impl OpenFile {
    /// Creates a new open file with its cursor at the beginning of the node.
    ///
    /// # Errors
    /// Returns [`InvalidFlags`] if the access mode of the flags is invalid. In this
    /// case, the node is closed.
    pub fn new(node: NodeRef, flags: OpenFlags) -> Result<Self, InvalidFlags> {
        let access = flags.access_mode().ok_or(InvalidFlags)?;
        Ok(Self {
            node,
            flags,
            access,
            state: Spinlock::new(OpenFileState::default()),
        })
    }

    #[must_use]
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.access
    }

    #[must_use]
    pub fn state(&self) -> &Spinlock<OpenFileState> {
        &self.state
    }

    /// Repositions the offset of the file according to the raw `whence` value passed
    /// by a task and returns the new offset, which never exceeds [`Offset::MAX`].
    /// Seeking after the end of the file is allowed.
    ///
    /// # Errors
    /// See [`SeekError`] for more details. The offset is left unchanged on error.
    pub fn seek(&self, offset: i64, whence: usize) -> Result<Offset, SeekError> {
        if !self.node.is_seekable() {
            return Err(SeekError::NotSeekable);
        }

        let size = self.node.stat()?.size;
        let mut state = self.state.lock();
        let position = match Whence::try_from(whence).map_err(|()| SeekError::InvalidWhence)? {
            Whence::Start => Offset(0)
                .checked_move(offset)
                .ok_or(SeekError::InvalidOffset)?,
            Whence::Current => state
                .offset
                .checked_move(offset)
                .ok_or(SeekError::InvalidOffset)?,
            Whence::End => Offset(size)
                .checked_move(offset)
                .ok_or(SeekError::InvalidOffset)?,
        };

        state.offset = position;
        Ok(position)
    }
}

/// The access mode encoded in the open flags is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvalidFlags;

/// The error returned when seeking into a file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekError {
    /// The node does not support random access.
    NotSeekable,

    /// The whence is not one of the known values.
    InvalidWhence,

    /// The resulting offset would be negative or too large.
    InvalidOffset,

    /// The size of the node could not be retrieved.
    Node(node::Error),
}

impl From<node::Error> for SeekError {
    fn from(error: node::Error) -> Self {
        Self::Node(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryNode;

    #[test]
    fn flags_are_parsed_strictly() {
        assert_eq!(OpenFlags::parse(0), Some(OpenFlags::READ_ONLY));
        assert_eq!(
            OpenFlags::parse(2 | 4 | 16),
            Some(OpenFlags::READ_WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE)
        );
        assert_eq!(OpenFlags::parse(3), None);
        assert_eq!(OpenFlags::parse(8), None);
        assert_eq!(OpenFlags::parse(1 << 12), None);
    }

    #[test]
    fn access_modes() {
        assert!(AccessMode::ReadOnly.readable() && !AccessMode::ReadOnly.writable());
        assert!(!AccessMode::WriteOnly.readable() && AccessMode::WriteOnly.writable());
        assert!(AccessMode::ReadWrite.readable() && AccessMode::ReadWrite.writable());
    }

    #[test]
    fn offsets_never_go_negative() {
        assert_eq!(Offset(10).checked_move(-10), Some(Offset(0)));
        assert_eq!(Offset(10).checked_move(-11), None);
        assert_eq!(Offset(10).checked_move(5), Some(Offset(15)));
        assert_eq!(Offset::MAX.checked_move(1), None);
    }

    #[test]
    fn whence_values() {
        assert_eq!(Whence::try_from(0), Ok(Whence::Start));
        assert_eq!(Whence::try_from(1), Ok(Whence::Current));
        assert_eq!(Whence::try_from(2), Ok(Whence::End));
        assert_eq!(Whence::try_from(3), Err(()));
    }

    #[test]
    fn seek_checks_bounds_against_cursor_and_size() {
        let node = MemoryNode::with_content(b"0123456789");
        let file = OpenFile::new(node.open(), OpenFlags::READ_ONLY).unwrap();

        assert_eq!(file.seek(4, 0), Ok(Offset(4)));
        assert_eq!(file.seek(-5, 1), Err(SeekError::InvalidOffset));
        assert_eq!(file.seek(-4, 1), Ok(Offset(0)));
        assert_eq!(file.seek(-11, 2), Err(SeekError::InvalidOffset));
        assert_eq!(file.seek(-10, 2), Ok(Offset(0)));
        assert_eq!(file.seek(-1, 0), Err(SeekError::InvalidOffset));
        assert_eq!(file.seek(0, 7), Err(SeekError::InvalidWhence));
        assert_eq!(file.state().lock().offset, Offset(0));

        // Seeking after the end of the file is allowed
        assert_eq!(file.seek(90, 2), Ok(Offset(100)));
        assert_eq!(file.state().lock().offset, Offset(100));
    }

    #[test]
    fn seek_never_goes_beyond_the_greatest_offset() {
        let node = MemoryNode::with_content(b"0123456789");
        let file = OpenFile::new(node.open(), OpenFlags::READ_ONLY).unwrap();
        let max = i64::try_from(Offset::MAX.0).unwrap();

        assert_eq!(file.seek(max, 0), Ok(Offset::MAX));
        assert_eq!(file.seek(1, 1), Err(SeekError::InvalidOffset));
        assert_eq!(file.seek(max, 2), Err(SeekError::InvalidOffset));
        assert_eq!(file.state().lock().offset, Offset::MAX);

        // Every accepted offset can be returned to the task
        assert!(usize::try_from(Offset::MAX.0).is_ok());
    }

    #[test]
    fn dropping_the_file_closes_the_node() {
        let node = MemoryNode::with_content(b"");
        let file = OpenFile::new(node.open(), OpenFlags::WRITE_ONLY).unwrap();
        assert_eq!(node.opened(), 1);
        drop(file);
        assert_eq!(node.opened(), 0);
    }

    #[test]
    fn invalid_access_mode_closes_the_node() {
        let node = MemoryNode::with_content(b"");
        let flags = OpenFlags::WRITE_ONLY | OpenFlags::READ_WRITE;
        assert_eq!(OpenFile::new(node.open(), flags).unwrap_err(), InvalidFlags);
        assert_eq!(node.opened(), 0);
    }
}
