use super::Device;
use crate::{
    prelude::*,
    vfs::{
        file::{Offset, OpenFlags},
        node::{Error, Kind, Node, NodeRef, Stat, Transfer},
    },
};
use alloc::collections::VecDeque;
use core::sync::atomic::{AtomicUsize, Ordering};

/// The hardware behind the console, typically a serial port or a screen.
pub trait Terminal: Send + Sync {
    /// Write the bytes to the terminal. This cannot fail: bytes that cannot be
    /// displayed are silently dropped.
    fn write(&self, bytes: &[u8]);
}

/// The console device. Everything written to it is sent to the terminal, and reads
/// consume the bytes typed on the terminal. It is a stream of bytes, so it is not
/// seekable and the offset passed to reads and writes is ignored.
pub struct Console {
    terminal: Arc<dyn Terminal>,
    input: Spinlock<VecDeque<u8>>,
    opened: AtomicUsize,
}

impl Console {
    #[must_use]
    pub fn new(terminal: Arc<dyn Terminal>) -> Self {
        Self {
            terminal,
            input: Spinlock::new(VecDeque::new()),
            opened: AtomicUsize::new(0),
        }
    }

    /// Queue bytes received from the terminal. They will be returned by the next
    /// reads on the console.
    pub fn receive(&self, bytes: &[u8]) {
        self.input.lock().extend(bytes);
    }

    /// Returns the number of times the console is currently open.
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Relaxed)
    }
}

impl Device for Console {
    fn open(self: Arc<Self>, _: OpenFlags) -> Result<NodeRef, Error> {
        self.opened.fetch_add(1, Ordering::Relaxed);
        Ok(NodeRef::new(self))
    }
}

impl Node for Console {
    /// Read the bytes already received from the terminal, without waiting for more.
    fn read(&self, buf: &mut [u8], offset: Offset) -> Result<Transfer, Error> {
        let mut input = self.input.lock();
        let len = core::cmp::min(buf.len(), input.len());
        for (dst, src) in buf.iter_mut().zip(input.drain(..len)) {
            *dst = src;
        }

        Ok(Transfer {
            bytes: len,
            offset: Offset(offset.0.saturating_add(len as u64)),
        })
    }

    fn write(&self, buf: &[u8], offset: Offset) -> Result<Transfer, Error> {
        self.terminal.write(buf);
        Ok(Transfer {
            bytes: buf.len(),
            offset: Offset(offset.0.saturating_add(buf.len() as u64)),
        })
    }

    /// The console has no end: appending is writing at its only position.
    fn append(&self, buf: &[u8]) -> Result<Transfer, Error> {
        self.write(buf, Offset(0))
    }

    fn stat(&self) -> Result<Stat, Error> {
        Ok(Stat {
            kind: Kind::CharDevice,
            size: 0,
        })
    }

    fn is_seekable(&self) -> bool {
        false
    }

    fn close(&self) {
        self.opened.fetch_sub(1, Ordering::Relaxed);
    }
}
