//! A filesystem stored in the kernel memory. It has a single flat directory: a path
//! names a file of this directory, with an optional leading `/`.
use crate::{
    prelude::*,
    vfs::{
        file::{Mode, Offset, OpenFlags},
        node::{Error, Filesystem, Kind, Node, NodeRef, Stat, Transfer},
    },
};
use core::sync::atomic::{AtomicUsize, Ordering};
use hashbrown::HashMap;

/// The default maximal size of a file, in bytes.
pub const MAX_FILE_SIZE: usize = 16 * 1024 * 1024;

pub struct RamFs {
    files: Spinlock<HashMap<String, Arc<RamFile>>>,
    max_file_size: usize,
}

impl RamFs {
    /// Create a new empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_file_size(MAX_FILE_SIZE)
    }

    /// Create a new empty filesystem where files cannot grow beyond `max` bytes.
    #[must_use]
    pub fn with_max_file_size(max: usize) -> Self {
        Self {
            files: Spinlock::new(HashMap::new()),
            max_file_size: max,
        }
    }

    /// Create a file with the given content and mode, replacing any existing file
    /// with the same name.
    pub fn insert(&self, name: &str, content: &[u8], mode: Mode) -> Arc<RamFile> {
        let file = Arc::new(RamFile::new(content.to_vec(), mode, self.max_file_size));
        self.files
            .lock()
            .insert(String::from(name), Arc::clone(&file));
        file
    }

    /// Returns the file with the given name, if it exists.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<RamFile>> {
        self.files.lock().get(name.trim_start_matches('/')).cloned()
    }
}

impl Default for RamFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for RamFs {
    fn open(&self, path: &str, flags: OpenFlags, mode: Mode) -> Result<NodeRef, Error> {
        let name = path.trim_start_matches('/');
        if name.is_empty() || name.ends_with('/') {
            return Err(Error::IsADirectory);
        }

        let access = flags.access_mode().ok_or(Error::PermissionDenied)?;
        let mut files = self.files.lock();

        // There are no directories: a path with a '/' either uses a file as a
        // directory, or goes through a directory that does not exist.
        if let Some((parent, _)) = name.rsplit_once('/') {
            let mut prefix = String::new();
            for component in parent.split('/') {
                prefix.push_str(component);
                if files.contains_key(prefix.as_str()) {
                    return Err(Error::NotADirectory);
                }
                prefix.push('/');
            }
            return Err(Error::NoSuchFile);
        }

        let file = match files.get(name) {
            Some(file) => {
                if (access.readable() && !file.mode.owner_can_read())
                    || (access.writable() && !file.mode.owner_can_write())
                {
                    return Err(Error::PermissionDenied);
                }
                if flags.contains(OpenFlags::TRUNCATE) && access.writable() {
                    file.content.lock().clear();
                }
                Arc::clone(file)
            }
            None if flags.contains(OpenFlags::CREATE) => {
                log::debug!("ramfs: creating {name:?} with mode {:o}", mode.0);
                let file = Arc::new(RamFile::new(Vec::new(), mode, self.max_file_size));
                files.insert(String::from(name), Arc::clone(&file));
                file
            }
            None => return Err(Error::NoSuchFile),
        };

        file.opened.fetch_add(1, Ordering::Relaxed);
        Ok(NodeRef::new(file))
    }
}

/// A regular file of a [`RamFs`].
pub struct RamFile {
    content: Spinlock<Vec<u8>>,
    mode: Mode,
    opened: AtomicUsize,
    max_size: usize,
}

impl RamFile {
    fn new(content: Vec<u8>, mode: Mode, max_size: usize) -> Self {
        Self {
            content: Spinlock::new(content),
            mode,
            opened: AtomicUsize::new(0),
            max_size,
        }
    }

    /// Returns a copy of the content of the file.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.content.lock().clone()
    }

    /// Returns the number of times the file is currently open.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }

    /// Writes `buf` into the locked content at `start`, extending the file with zeros
    /// if the write goes beyond its end.
    fn write_at(
        &self,
        content: &mut Vec<u8>,
        buf: &[u8],
        start: usize,
    ) -> Result<Transfer, Error> {
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.max_size)
            .ok_or(Error::NoSpace)?;

        if end > content.len() {
            let grow = end - content.len();
            content.try_reserve(grow).map_err(|_| Error::NoSpace)?;
            content.resize(end, 0);
        }

        content[start..end].copy_from_slice(buf);
        Ok(Transfer {
            bytes: buf.len(),
            offset: Offset(end as u64),
        })
    }
}

impl Node for RamFile {
    fn read(&self, buf: &mut [u8], offset: Offset) -> Result<Transfer, Error> {
        let content = self.content.lock();

        // If the read goes beyond the end of the file, the buffer is only partially
        // filled. Reading after the end of the file reads nothing.
        let start = usize::try_from(offset.0).map_or(content.len(), |o| o.min(content.len()));
        let len = core::cmp::min(buf.len(), content.len() - start);
        buf[..len].copy_from_slice(&content[start..start + len]);

        Ok(Transfer {
            bytes: len,
            offset: Offset(offset.0 + len as u64),
        })
    }

    fn write(&self, buf: &[u8], offset: Offset) -> Result<Transfer, Error> {
        let start = usize::try_from(offset.0).map_err(|_| Error::NoSpace)?;
        self.write_at(&mut self.content.lock(), buf, start)
    }

    fn append(&self, buf: &[u8]) -> Result<Transfer, Error> {
        let mut content = self.content.lock();
        let end = content.len();
        self.write_at(&mut content, buf, end)
    }

    fn stat(&self) -> Result<Stat, Error> {
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
