use super::{pointer::Pointer, UserMemory};
use crate::prelude::*;

/// Allocates a zeroed buffer of `len` bytes in the kernel heap. Userland controls the
/// length, so the allocation is allowed to fail instead of aborting the kernel.
///
/// # Errors
/// Returns [`BufferError::OutOfMemory`] if the buffer could not be allocated.
pub fn zeroed(len: usize) -> Result<Vec<u8>, BufferError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| BufferError::OutOfMemory)?;
    buffer.resize(len, 0);
    Ok(buffer)
}

/// Copies `len` bytes from the memory of the task into a new kernel buffer. All
/// modifications made to the returned buffer do not affect the memory of the task.
///
/// # Errors
/// See [`BufferError`] for more details.
pub fn fetch(memory: &dyn UserMemory, src: Pointer, len: usize) -> Result<Vec<u8>, BufferError> {
    let mut buffer = zeroed(len)?;
    memory
        .copy_in(src, &mut buffer)
        .map_err(|_| BufferError::BadAddress)?;
    Ok(buffer)
}

/// Copies the given kernel buffer into the memory of the task, starting at `dst`.
///
/// # Errors
/// Returns [`BufferError::BadAddress`] if the destination is not writable by the task.
pub fn store(memory: &dyn UserMemory, src: &[u8], dst: Pointer) -> Result<(), BufferError> {
    memory
        .copy_out(src, dst)
        .map_err(|_| BufferError::BadAddress)
}

/// Represent an error that can occur when copying a buffer between the kernel and the
/// memory of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferError {
    /// The buffer is not entirely accessible by the task.
    BadAddress,

    /// The kernel could not allocate a buffer large enough.
    OutOfMemory,
}
