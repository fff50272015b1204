//! Helpers shared by the tests of the crate.
use crate::{
    config::Config,
    device::{console::Console, console::Terminal, Device},
    fs::{ramfs::RamFs, Namespace},
    kernel::Kernel,
    prelude::*,
    syscall::{self, SyscallError},
    user::{pointer::Pointer, task::Task, Fault, StrCopyError, UserMemory},
    vfs::{
        fd::Descriptor,
        file::{Offset, OpenFlags},
        node::{Error, Filesystem, Kind, Node, NodeRef, Stat, Transfer},
        table::Index,
    },
};
use core::{
    ops::Range,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// A seekable node backed by a vector, that counts how many times it is open and can
/// be switched to fail every operation.
#[derive(Default)]
pub struct MemoryNode {
    content: Spinlock<Vec<u8>>,
    opened: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryNode {
    pub fn with_content(content: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            content: Spinlock::new(content.to_vec()),
            ..Self::default()
        })
    }

    /// Open the node, as a filesystem would.
    pub fn open(self: &Arc<Self>) -> NodeRef {
        self.opened.fetch_add(1, Ordering::Relaxed);
        NodeRef::new(Arc::clone(self) as Arc<dyn Node>)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    fn write_at(content: &mut Vec<u8>, buf: &[u8], start: usize) -> Transfer {
        let end = start + buf.len();
        if end > content.len() {
            content.resize(end, 0);
        }
        content[start..end].copy_from_slice(buf);
        Transfer {
            bytes: buf.len(),
            offset: Offset(end as u64),
        }
    }

    fn check(&self) -> Result<(), Error> {
        match self.failing.load(Ordering::Relaxed) {
            true => Err(Error::IoError),
            false => Ok(()),
        }
    }
}

impl Device for MemoryNode {
    fn open(self: Arc<Self>, _: OpenFlags) -> Result<NodeRef, Error> {
        Ok(MemoryNode::open(&self))
    }
}

impl Node for MemoryNode {
    fn read(&self, buf: &mut [u8], offset: Offset) -> Result<Transfer, Error> {
        self.check()?;
        let content = self.content.lock();
        let start = (offset.0 as usize).min(content.len());
        let len = buf.len().min(content.len() - start);
        buf[..len].copy_from_slice(&content[start..start + len]);
        Ok(Transfer {
            bytes: len,
            offset: Offset(offset.0 + len as u64),
        })
    }

    fn write(&self, buf: &[u8], offset: Offset) -> Result<Transfer, Error> {
        self.check()?;
        Ok(Self::write_at(&mut self.content.lock(), buf, offset.0 as usize))
    }

    fn append(&self, buf: &[u8]) -> Result<Transfer, Error> {
        self.check()?;
        let mut content = self.content.lock();
        let end = content.len();
        Ok(Self::write_at(&mut content, buf, end))
    }

    fn stat(&self) -> Result<Stat, Error> {
        self.check()?;
        Ok(Stat {
            kind: Kind::File,
            size: self.content.lock().len() as u64,
        })
    }

    fn is_seekable(&self) -> bool {
        true
    }

    fn close(&self) {
        self.opened.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A terminal that keeps everything written to it.
#[derive(Default)]
pub struct Recorder {
    output: Spinlock<Vec<u8>>,
}

impl Recorder {
    pub fn output(&self) -> Vec<u8> {
        self.output.lock().clone()
    }
}

impl Terminal for Recorder {
    fn write(&self, bytes: &[u8]) {
        self.output.lock().extend_from_slice(bytes);
    }
}

/// The memory of a task, as a single contiguous range of addresses starting at
/// [`FlatMemory::BASE`]. Every address outside this range faults.
pub struct FlatMemory {
    bytes: Spinlock<Vec<u8>>,
    next: AtomicUsize,
}

impl FlatMemory {
    pub const BASE: usize = 0x1000;

    pub fn new(size: usize) -> Self {
        Self {
            bytes: Spinlock::new(vec![0; size]),
            next: AtomicUsize::new(0),
        }
    }

    /// Reserve `len` zeroed bytes and return their address.
    pub fn reserve(&self, len: usize) -> Pointer {
        let start = self.next.fetch_add(len, Ordering::Relaxed);
        assert!(start + len <= self.bytes.lock().len(), "flat memory exhausted");
        Pointer::new(Self::BASE + start).unwrap()
    }

    /// Copy the bytes into a newly reserved range and return its address.
    pub fn place(&self, bytes: &[u8]) -> Pointer {
        let ptr = self.reserve(bytes.len());
        self.copy_out(bytes, ptr).unwrap();
        ptr
    }

    pub fn read(&self, ptr: Pointer, len: usize) -> Vec<u8> {
        let range = self.range(ptr, len).unwrap();
        self.bytes.lock()[range].to_vec()
    }

    fn range(&self, ptr: Pointer, len: usize) -> Result<Range<usize>, Fault> {
        let start = ptr.addr().checked_sub(Self::BASE).ok_or(Fault)?;
        let end = start.checked_add(len).ok_or(Fault)?;
        match end <= self.bytes.lock().len() {
            true => Ok(start..end),
            false => Err(Fault),
        }
    }
}

impl UserMemory for FlatMemory {
    fn copy_in(&self, src: Pointer, dst: &mut [u8]) -> Result<(), Fault> {
        let range = self.range(src, dst.len())?;
        dst.copy_from_slice(&self.bytes.lock()[range]);
        Ok(())
    }

    fn copy_out(&self, src: &[u8], dst: Pointer) -> Result<(), Fault> {
        let range = self.range(dst, src.len())?;
        self.bytes.lock()[range].copy_from_slice(src);
        Ok(())
    }

    fn is_writable(&self, dst: Pointer, len: usize) -> bool {
        self.range(dst, len).is_ok()
    }

    fn copy_in_str(&self, src: Pointer, dst: &mut [u8]) -> Result<usize, StrCopyError> {
        let start = src.addr().checked_sub(Self::BASE).ok_or(Fault)?;
        let bytes = self.bytes.lock();
        for (i, slot) in dst.iter_mut().enumerate() {
            let byte = *bytes.get(start + i).ok_or(Fault)?;
            *slot = byte;
            if byte == 0 {
                return Ok(i);
            }
        }
        Err(StrCopyError::TooLong)
    }
}

/// A kernel with a ramfs root and a console registered as `con`, and a task spawned on
/// it with its standard descriptors open.
pub struct Fixture {
    pub kernel: Arc<Kernel>,
    pub fs: Arc<RamFs>,
    pub namespace: Arc<Namespace>,
    pub console: Arc<Console>,
    pub terminal: Arc<Recorder>,
    pub memory: Arc<FlatMemory>,
    pub task: Arc<Task>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut fixture = Self::without_task(config);
        let memory = Arc::clone(&fixture.memory) as Arc<dyn UserMemory>;
        fixture.task = Task::spawn(Arc::clone(&fixture.kernel), memory).unwrap();
        fixture
    }

    /// Build the fixture with a task that has no descriptor bound.
    pub fn without_task(config: Config) -> Self {
        let fs = Arc::new(RamFs::new());
        let namespace = Arc::new(Namespace::new(Arc::clone(&fs) as Arc<dyn Filesystem>));
        let terminal = Arc::new(Recorder::default());
        let console = Arc::new(Console::new(Arc::clone(&terminal) as Arc<dyn Terminal>));
        namespace
            .devices()
            .register("con", Arc::clone(&console) as Arc<dyn Device>)
            .unwrap();

        let kernel = Kernel::new(config, Arc::clone(&namespace) as Arc<dyn Filesystem>);
        let memory = Arc::new(FlatMemory::new(4096));
        let task = Task::new(
            Arc::clone(&kernel),
            Arc::clone(&memory) as Arc<dyn UserMemory>,
        );

        Self {
            kernel,
            fs,
            namespace,
            console,
            terminal,
            memory,
            task,
        }
    }

    /// Place a null-terminated path in the memory of the task.
    pub fn path(&self, path: &str) -> usize {
        let mut bytes = path.as_bytes().to_vec();
        bytes.push(0);
        self.bytes(&bytes)
    }

    pub fn bytes(&self, bytes: &[u8]) -> usize {
        self.memory.place(bytes).addr()
    }

    pub fn buffer(&self, len: usize) -> usize {
        self.memory.reserve(len).addr()
    }

    /// Read back `len` bytes from the memory of the task.
    pub fn load(&self, addr: usize, len: usize) -> Vec<u8> {
        self.memory.read(Pointer::new(addr).unwrap(), len)
    }

    /// Return the index of the open file the descriptor is bound to.
    pub fn index(&self, fd: usize) -> Index {
        self.task.files().lock().get(Descriptor(fd)).unwrap()
    }

    pub fn open(&self, path: &str, flags: usize) -> Result<usize, SyscallError> {
        syscall::vfs::open(&self.task, self.path(path), flags, 0o644)
    }

    pub fn write(&self, fd: usize, bytes: &[u8]) -> Result<usize, SyscallError> {
        syscall::vfs::write(&self.task, fd, self.bytes(bytes), bytes.len())
    }

    pub fn read(&self, fd: usize, len: usize) -> Result<Vec<u8>, SyscallError> {
        let buf = self.buffer(len);
        let read = syscall::vfs::read(&self.task, fd, buf, len)?;
        Ok(self.load(buf, read))
    }
}
