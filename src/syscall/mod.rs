use crate::user::{self, task::Task};

pub mod vfs;

/// The syscall numbers handled by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Syscall {
    Open = 0,
    Close = 1,
    Read = 2,
    Write = 3,
    Seek = 4,
    Dup2 = 5,
}

impl Syscall {
    /// Create a new Syscall from a raw syscall number. If the number is not a valid
    /// syscall number, it returns None.
    #[must_use]
    pub const fn from(id: usize) -> Option<Syscall> {
        match id {
            0 => Some(Self::Open),
            1 => Some(Self::Close),
            2 => Some(Self::Read),
            3 => Some(Self::Write),
            4 => Some(Self::Seek),
            5 => Some(Self::Dup2),
            _ => None,
        }
    }
}

/// Handle a syscall made by `task`. This is the entry point of the descriptor layer: it
/// dispatches the syscall to the appropriate handler and converts its result into the
/// value returned to the task. A negative value between -1 and -4095 indicates an error
/// and is the opposite of its errno value, any other value is a success.
pub fn dispatch(task: &Task, id: usize, a: usize, b: usize, c: usize) -> isize {
    let result = match Syscall::from(id) {
        Some(Syscall::Open) => vfs::open(task, a, b, c),
        Some(Syscall::Close) => vfs::close(task, a),
        Some(Syscall::Read) => vfs::read(task, a, b, c),
        Some(Syscall::Write) => vfs::write(task, a, b, c),
        Some(Syscall::Seek) => vfs::seek(task, a, b, c),
        Some(Syscall::Dup2) => vfs::dup2(task, a, b),
        None => Err(SyscallError::NoSuchSyscall),
    };

    match result {
        #[allow(clippy::cast_possible_wrap)]
        Ok(value) => value as isize,
        Err(error) => {
            log::trace!("Syscall {id} of task {} failed: {error:?}", task.id());
            isize::from(error)
        }
    }
}

/// The errno values returned to userland.
pub mod errno {
    pub const ENOENT: isize = 2;
    pub const EIO: isize = 5;
    pub const EBADF: isize = 9;
    pub const ENOMEM: isize = 12;
    pub const EACCES: isize = 13;
    pub const EFAULT: isize = 14;
    pub const ENOTDIR: isize = 20;
    pub const EISDIR: isize = 21;
    pub const EINVAL: isize = 22;
    pub const ENFILE: isize = 23;
    pub const EMFILE: isize = 24;
    pub const ENOSPC: isize = 28;
    pub const ESPIPE: isize = 29;
    pub const ENAMETOOLONG: isize = 36;
    pub const ENOSYS: isize = 38;
}

/// All the errors a syscall of the descriptor layer can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyscallError {
    /// The syscall number is invalid.
    NoSuchSyscall,

    /// An invalid flag, access mode, whence or offset was passed to the syscall.
    InvalidArgument,

    /// The descriptor is out of range, free, or does not refer to an open file.
    BadDescriptor,

    /// A pointer passed to the syscall is not accessible by the task.
    BadAddress,

    /// The path has no terminator within the maximal path length.
    NameTooLong,

    /// The descriptor table of the task is full.
    TooManyOpenFilesInProcess,

    /// The global open file table is full.
    TooManyOpenFilesInSystem,

    /// The kernel could not allocate memory to complete the syscall.
    OutOfMemory,

    /// The file does not support seeking.
    IllegalSeek,

    /// The storage layer failed. The error is reported unchanged.
    Storage(crate::vfs::Error),
}

impl SyscallError {
    /// Return the errno value of the error, always positive.
    #[must_use]
    pub const fn errno(&self) -> isize {
        match self {
            Self::NoSuchSyscall => errno::ENOSYS,
            Self::InvalidArgument => errno::EINVAL,
            Self::BadDescriptor => errno::EBADF,
            Self::BadAddress => errno::EFAULT,
            Self::NameTooLong => errno::ENAMETOOLONG,
            Self::TooManyOpenFilesInProcess => errno::EMFILE,
            Self::TooManyOpenFilesInSystem => errno::ENFILE,
            Self::OutOfMemory => errno::ENOMEM,
            Self::IllegalSeek => errno::ESPIPE,
            Self::Storage(error) => match error {
                crate::vfs::Error::NoSuchFile => errno::ENOENT,
                crate::vfs::Error::PermissionDenied => errno::EACCES,
                crate::vfs::Error::IsADirectory => errno::EISDIR,
                crate::vfs::Error::NotADirectory => errno::ENOTDIR,
                crate::vfs::Error::NoSpace => errno::ENOSPC,
                crate::vfs::Error::IoError => errno::EIO,
            },
        }
    }
}

impl From<SyscallError> for isize {
    fn from(error: SyscallError) -> Self {
        -error.errno()
    }
}

impl From<crate::vfs::Error> for SyscallError {
    fn from(error: crate::vfs::Error) -> Self {
        Self::Storage(error)
    }
}

impl From<crate::vfs::file::InvalidFlags> for SyscallError {
    fn from(_: crate::vfs::file::InvalidFlags) -> Self {
        Self::InvalidArgument
    }
}

impl From<crate::vfs::table::TableFull> for SyscallError {
    fn from(_: crate::vfs::table::TableFull) -> Self {
        Self::TooManyOpenFilesInSystem
    }
}

impl From<crate::vfs::file::SeekError> for SyscallError {
    fn from(error: crate::vfs::file::SeekError) -> Self {
        match error {
            crate::vfs::file::SeekError::NotSeekable => Self::IllegalSeek,
            crate::vfs::file::SeekError::InvalidWhence
            | crate::vfs::file::SeekError::InvalidOffset => Self::InvalidArgument,
            crate::vfs::file::SeekError::Node(error) => Self::Storage(error),
        }
    }
}

impl From<user::buffer::BufferError> for SyscallError {
    fn from(error: user::buffer::BufferError) -> Self {
        match error {
            user::buffer::BufferError::BadAddress => Self::BadAddress,
            user::buffer::BufferError::OutOfMemory => Self::OutOfMemory,
        }
    }
}

impl From<user::string::FetchError> for SyscallError {
    fn from(error: user::string::FetchError) -> Self {
        match error {
            user::string::FetchError::InvalidMemory => Self::BadAddress,
            user::string::FetchError::StringTooLong => Self::NameTooLong,
            user::string::FetchError::StringNotUtf8 => Self::InvalidArgument,
            user::string::FetchError::OutOfMemory => Self::OutOfMemory,
        }
    }
}
