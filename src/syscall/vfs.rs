use super::SyscallError;
use crate::{
    prelude::*,
    user::{self, pointer::Pointer, task::Task},
    vfs::{
        fd::Descriptor,
        file::{Mode, OpenFile, OpenFlags},
    },
};
use scopeguard::ScopeGuard;

/// Open the file designated by the null-terminated path at `path` with the given
/// `flags`, and return the lowest free descriptor of the task, now bound to the new
/// open file. The `mode` is only used if the file is created.
///
/// # Errors
/// Unknown flags are rejected with [`SyscallError::InvalidArgument`] before anything
/// else is done. See [`open_path`] for the other errors.
pub fn open(task: &Task, path: usize, flags: usize, mode: usize) -> Result<usize, SyscallError> {
    let flags = OpenFlags::parse(flags).ok_or(SyscallError::InvalidArgument)?;
    let ptr = Pointer::new(path).ok_or(SyscallError::BadAddress)?;
    let path = user::string::fetch(task.memory(), ptr, task.kernel().config().max_path)?;
    let fd = open_path(task, &path, flags, Mode::from_raw(mode))?;
    Ok(fd.0)
}

/// Open a path that is already in the kernel memory. This is used by [`open`] once the
/// path has been copied from the task, and when a task is created to open its standard
/// descriptors.
///
/// Either the file is fully opened and bound to a descriptor, or nothing has changed:
/// each step undoes the previous ones if it fails.
///
/// # Errors
/// - Any error of the storage layer is returned unchanged.
/// - [`SyscallError::InvalidArgument`]: the access mode of the flags is invalid.
/// - [`SyscallError::TooManyOpenFilesInSystem`]: the global open file table is full.
/// - [`SyscallError::TooManyOpenFilesInProcess`]: the descriptor table of the task is
///   full.
pub fn open_path(
    task: &Task,
    path: &str,
    flags: OpenFlags,
    mode: Mode,
) -> Result<Descriptor, SyscallError> {
    let table = task.kernel().files();
    let node = task.kernel().fs().open(path, flags, mode)?;
    let file = OpenFile::new(node, flags)?;
    let index = table.insert(file)?;

    // If no descriptor can be allocated, the open file is removed from the table,
    // which closes the node.
    let guard = scopeguard::guard(index, |index| {
        table.release(index);
    });

    let fd = task.files().lock().allocate(index).ok_or_else(|| {
        log::warn!("Descriptor table of task {} is full", task.id());
        SyscallError::TooManyOpenFilesInProcess
    })?;

    ScopeGuard::into_inner(guard);
    log::debug!("Task {} opened {:?} on descriptor {}", task.id(), path, fd);
    Ok(fd)
}

/// Close a file descriptor. The open file it refers to is destroyed, and its node
/// closed, only if no other descriptor refers to it.
///
/// # Errors
/// Returns [`SyscallError::BadDescriptor`] if the descriptor is out of range, free or
/// does not refer to an open file. Nothing is changed in this case.
pub fn close(task: &Task, fd: usize) -> Result<usize, SyscallError> {
    let fd = Descriptor(fd);
    let release = task
        .files()
        .lock()
        .close(fd, task.kernel().files())
        .ok_or(SyscallError::BadDescriptor)?;

    log::debug!("Task {} closed descriptor {} ({:?})", task.id(), fd, release);
    Ok(0)
}

/// Read up to `len` bytes from the file descriptor `fd` into the buffer at `buf`, starting
/// at the current offset of the open file. The offset is advanced by the number of bytes
/// read, which is returned. It may be less than `len`, and is 0 at the end of the file.
///
/// # Errors
/// - [`SyscallError::BadDescriptor`]: the descriptor does not refer to an open file.
/// - [`SyscallError::InvalidArgument`]: the file was not opened for reading.
/// - [`SyscallError::BadAddress`]: the buffer is not writable by the task.
/// - [`SyscallError::OutOfMemory`]: the kernel could not allocate a buffer of `len` bytes.
/// - Any error of the storage layer is returned unchanged.
///
/// On error, the offset of the file is left unchanged.
pub fn read(task: &Task, fd: usize, buf: usize, len: usize) -> Result<usize, SyscallError> {
    let file = task.file(Descriptor(fd))?;
    if !file.access_mode().readable() {
        return Err(SyscallError::InvalidArgument);
    }

    // Bytes read from a stream cannot be put back, so the destination is checked
    // before anything is consumed from the node.
    let dst = Pointer::new(buf)
        .filter(|&dst| task.memory().is_writable(dst, len))
        .ok_or(SyscallError::BadAddress)?;
    let mut buffer = user::buffer::zeroed(len)?;

    // The state stays locked until the offset is updated, so that reads and writes
    // through descriptors sharing this file are serialized.
    let mut state = file.state().lock();
    let transfer = file.node().read(&mut buffer, state.offset)?;
    buffer.truncate(transfer.bytes);
    user::buffer::store(task.memory(), &buffer, dst)?;

    log::trace!(
        "Task {} read {} bytes from descriptor {} at offset {}",
        task.id(),
        transfer.bytes,
        fd,
        state.offset.0
    );
    state.offset = transfer.offset;
    Ok(transfer.bytes)
}

/// Write `len` bytes from the buffer at `buf` to the file descriptor `fd`, at the current
/// offset of the open file or at its end if it was opened with [`OpenFlags::APPEND`]. The
/// offset is set right after the last byte written and the number of bytes written is
/// returned.
///
/// # Errors
/// - [`SyscallError::BadDescriptor`]: the descriptor does not refer to an open file.
/// - [`SyscallError::InvalidArgument`]: the file was not opened for writing.
/// - [`SyscallError::BadAddress`]: the buffer is not readable by the task.
/// - [`SyscallError::OutOfMemory`]: the kernel could not allocate a buffer of `len` bytes.
/// - Any error of the storage layer is returned unchanged.
///
/// On error, the offset of the file is left unchanged.
pub fn write(task: &Task, fd: usize, buf: usize, len: usize) -> Result<usize, SyscallError> {
    let file = task.file(Descriptor(fd))?;
    if !file.access_mode().writable() {
        return Err(SyscallError::InvalidArgument);
    }

    let src = Pointer::new(buf).ok_or(SyscallError::BadAddress)?;
    let buffer = user::buffer::fetch(task.memory(), src, len)?;

    let mut state = file.state().lock();
    let transfer = if file.flags().contains(OpenFlags::APPEND) {
        file.node().append(&buffer)?
    } else {
        file.node().write(&buffer, state.offset)?
    };

    log::trace!(
        "Task {} wrote {} bytes to descriptor {}, now at offset {}",
        task.id(),
        transfer.bytes,
        fd,
        transfer.offset.0
    );
    state.offset = transfer.offset;
    Ok(transfer.bytes)
}

/// Repositions the offset of the open file associated with the file descriptor `fd` to
/// the argument `offset`, interpreted as a signed value, according to `whence`:
///  - 0: The offset is set to `offset` bytes.
///  - 1: The offset is set to its current location plus `offset` bytes.
///  - 2: The offset is set to the size of the file plus `offset` bytes.
///
/// The new offset is returned. It can be past the end of the file.
///
/// # Errors
/// - [`SyscallError::BadDescriptor`]: the descriptor does not refer to an open file.
/// - [`SyscallError::IllegalSeek`]: the file does not support seeking.
/// - Any error of the storage layer while retrieving the size of the file.
/// - [`SyscallError::InvalidArgument`]: the whence is unknown, or the resulting offset
///   would be negative or would not fit in the return register.
pub fn seek(task: &Task, fd: usize, offset: usize, whence: usize) -> Result<usize, SyscallError> {
    let file = task.file(Descriptor(fd))?;

    #[allow(clippy::cast_possible_wrap)]
    let position = file.seek(offset as isize as i64, whence)?;
    log::trace!("Task {} moved descriptor {} to offset {}", task.id(), fd, position.0);

    // Never fails: the offset is bounded by `Offset::MAX`
    usize::try_from(position.0).map_err(|_| SyscallError::InvalidArgument)
}

/// Make `new` refer to the same open file as `old`, and return `new`. If `new` was bound
/// to another open file, it is closed first. Both descriptors then share the same
/// offset and access mode.
///
/// # Errors
/// Returns [`SyscallError::BadDescriptor`] if one of the descriptors is out of range, if
/// `old` does not refer to an open file or if `new` could not be closed.
pub fn dup2(task: &Task, old: usize, new: usize) -> Result<usize, SyscallError> {
    let (old, new) = (Descriptor(old), Descriptor(new));
    if !old.in_range() || !new.in_range() {
        return Err(SyscallError::BadDescriptor);
    }

    let table = task.kernel().files();
    let mut files = task.files().lock();
    let index = files.lookup(old, table).ok_or(SyscallError::BadDescriptor)?;
    if old == new {
        return Ok(new.0);
    }

    if files.get(new).is_some() {
        files.close(new, table).ok_or(SyscallError::BadDescriptor)?;
    }

    table.acquire(index).ok_or(SyscallError::BadDescriptor)?;
    files.bind(new, index);

    log::debug!("Task {} duplicated descriptor {} on {}", task.id(), old, new);
    Ok(new.0)
}
