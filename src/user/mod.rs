use self::pointer::Pointer;

pub mod buffer;
pub mod pointer;
pub mod string;
pub mod task;

/// The memory of a task, seen from the kernel. This is the only way the kernel accesses
/// the memory of a task: each copy checks that the accessed range is mapped with the
/// right permissions, and reports a [`Fault`] otherwise.
///
/// Multiple threads of a task may modify their memory while the kernel copies it. This
/// is not undefined behavior for the kernel, which only ever works on its own copy, but
/// the content copied may be inconsistent: preventing this is the responsibility of the
/// task.
pub trait UserMemory: Send + Sync {
    /// Copies `dst.len()` bytes from the memory of the task, starting at `src`.
    ///
    /// # Errors
    /// Returns [`Fault`] if any byte of the range is not readable by the task. The
    /// content of `dst` is unspecified in this case.
    fn copy_in(&self, src: Pointer, dst: &mut [u8]) -> Result<(), Fault>;

    /// Copies `src` into the memory of the task, starting at `dst`.
    ///
    /// # Errors
    /// Returns [`Fault`] if any byte of the range is not writable by the task. A part of
    /// the range may have been written in this case.
    fn copy_out(&self, src: &[u8], dst: Pointer) -> Result<(), Fault>;

    /// Returns true if the `len` bytes starting at `dst` are all writable by the task.
    /// The range may be unmapped by another thread of the task right after, so a
    /// later copy out can still fault.
    fn is_writable(&self, dst: Pointer, len: usize) -> bool;

    /// Copies a null-terminated string from the memory of the task into `dst`, including
    /// the terminator, and returns the length of the string without the terminator.
    ///
    /// # Errors
    /// Returns [`StrCopyError::Fault`] if a byte before the terminator is not readable,
    /// and [`StrCopyError::TooLong`] if no terminator was found in the first
    /// `dst.len()` bytes.
    fn copy_in_str(&self, src: Pointer, dst: &mut [u8]) -> Result<usize, StrCopyError>;
}

/// An access to the memory of a task touched an address that is not mapped, or mapped
/// without the permission needed by the access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fault;

/// The error returned by [`UserMemory::copy_in_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrCopyError {
    /// The string is not entirely readable by the task.
    Fault,

    /// The string does not fit in the destination buffer.
    TooLong,
}

impl From<Fault> for StrCopyError {
    fn from(_: Fault) -> Self {
        Self::Fault
    }
}
