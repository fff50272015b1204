/// An address in the memory of a task, as passed by the task to a syscall. The kernel
/// never dereferences it: every access goes through the [`super::UserMemory`] of the
/// task, which reports a fault instead of crashing if the address is not mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer {
    addr: usize,
}

impl Pointer {
    /// Creates a new user pointer. Returns `None` if the address is null.
    #[must_use]
    pub const fn new(addr: usize) -> Option<Self> {
        match addr {
            0 => None,
            _ => Some(Self { addr }),
        }
    }

    /// Returns the address of the pointer in the address space of the task.
    #[must_use]
    pub const fn addr(&self) -> usize {
        self.addr
    }
}

impl core::fmt::Display for Pointer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "0x{:016x}", self.addr)
    }
}
