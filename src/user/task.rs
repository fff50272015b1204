use super::UserMemory;
use crate::{
    kernel::Kernel,
    prelude::*,
    syscall::{self, SyscallError},
    vfs::{
        fd::{Descriptor, Descriptors},
        file::{Mode, OpenFile, OpenFlags},
    },
};
use core::sync::atomic::{AtomicU64, Ordering};
use scopeguard::ScopeGuard;

/// A unique identifier for a task. The algorithm used to generate the identifier is very
/// simple: it is a counter that is incremented every time a new task is created, so the
/// identifier is unique for each task and monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(pub u64);

impl Identifier {
    #[must_use]
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A task, as seen by the descriptor layer: an address space and a table of descriptors
/// referring to open files of the kernel.
pub struct Task {
    id: Identifier,
    kernel: Arc<Kernel>,
    memory: Arc<dyn UserMemory>,
    files: Spinlock<Descriptors>,
}

impl Task {
    /// Create a new task with no descriptor bound.
    #[must_use]
    pub fn new(kernel: Arc<Kernel>, memory: Arc<dyn UserMemory>) -> Arc<Task> {
        Self::with_files(kernel, memory, Descriptors::empty())
    }

    fn with_files(
        kernel: Arc<Kernel>,
        memory: Arc<dyn UserMemory>,
        files: Descriptors,
    ) -> Arc<Task> {
        let task = Arc::new(Self {
            id: Identifier::generate(),
            kernel,
            memory,
            files: Spinlock::new(files),
        });
        log::debug!(
            "Task {} created with {} descriptors",
            task.id,
            task.files.lock().len()
        );
        task
    }

    /// Create a new task whose standard input, output and error descriptors (0, 1 and
    /// 2) are each bound to a new open file on the console, opened write-only.
    ///
    /// # Errors
    /// If any of the standard descriptors could not be opened, the descriptors already
    /// opened are closed, the task is destroyed and the error is returned. If a console
    /// file was not bound to the expected descriptor,
    /// [`SyscallError::TooManyOpenFilesInProcess`] is returned.
    pub fn spawn(
        kernel: Arc<Kernel>,
        memory: Arc<dyn UserMemory>,
    ) -> Result<Arc<Task>, SyscallError> {
        let task = Self::new(kernel, memory);
        let guard = scopeguard::guard(&task, |task| {
            log::warn!("Failed to open the standard descriptors of task {}", task.id);
            task.files.lock().destroy(task.kernel.files());
        });

        let console = guard.kernel.config().console.clone();
        for expected in [Descriptor::STDIN, Descriptor::STDOUT, Descriptor::STDERR] {
            let fd = syscall::vfs::open_path(&guard, &console, OpenFlags::WRITE_ONLY, Mode(0))?;
            if fd != expected {
                return Err(SyscallError::TooManyOpenFilesInProcess);
            }
        }

        ScopeGuard::into_inner(guard);
        Ok(task)
    }

    /// Create a child of this task running in the given address space. The child
    /// inherits a copy of the descriptor table: each of its descriptors refers to the
    /// same open file as in this task, and shares its offset.
    #[must_use]
    pub fn fork(&self, memory: Arc<dyn UserMemory>) -> Arc<Task> {
        let files = self.files.lock().duplicate(self.kernel.files());
        let child = Self::with_files(Arc::clone(&self.kernel), memory, files);
        log::debug!("Task {} forked into task {}", self.id, child.id);
        child
    }

    /// Return the identifier of the task. The identifier of a task is unique and will
    /// never change during the lifetime of the task.
    #[must_use]
    pub fn id(&self) -> Identifier {
        self.id
    }

    #[must_use]
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    #[must_use]
    pub fn memory(&self) -> &dyn UserMemory {
        &*self.memory
    }

    /// Return the descriptor table of the task. It must be locked before the global open
    /// file table when both are needed.
    #[must_use]
    pub fn files(&self) -> &Spinlock<Descriptors> {
        &self.files
    }

    /// Return the open file the given descriptor refers to.
    ///
    /// # Errors
    /// Returns [`SyscallError::BadDescriptor`] if the descriptor is out of range, free
    /// or does not refer to an open file.
    pub fn file(&self, fd: Descriptor) -> Result<Arc<OpenFile>, SyscallError> {
        let table = self.kernel.files();
        self.files
            .lock()
            .lookup(fd, table)
            .and_then(|index| table.get(index))
            .ok_or(SyscallError::BadDescriptor)
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        log::debug!("Destroying task {}", self.id);
        self.files.get_mut().destroy(self.kernel.files());
    }
}

impl core::fmt::Debug for Task {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("files", &*self.files.lock())
            .finish_non_exhaustive()
    }
}
