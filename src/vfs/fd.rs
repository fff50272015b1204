use super::table::{Index, OpenFileTable, Release};
use crate::config::OPEN_MAX;

/// A file descriptor. This is an identifier for an open file, unique to the task. It
/// is an index in the descriptor table of the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Descriptor(pub usize);

impl Descriptor {
    pub const STDIN: Self = Self(0);
    pub const STDOUT: Self = Self(1);
    pub const STDERR: Self = Self(2);

    /// Returns true if the descriptor fits in a descriptor table.
    #[must_use]
    pub const fn in_range(self) -> bool {
        self.0 < OPEN_MAX
    }
}

impl core::fmt::Display for Descriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The descriptor table of a task. Each slot is either free or bound to an entry of
/// the global open file table. The bound slots are also tracked in a bitmap, so that
/// finding the first free slot does not require scanning the whole table.
#[derive(Debug, PartialEq, Eq)]
pub struct Descriptors {
    slots: [Option<Index>; OPEN_MAX],
    bound: u64,
}

impl Descriptors {
    /// The bits of the bitmap that correspond to a slot of the table.
    const MASK: u64 = u64::MAX >> (64 - OPEN_MAX);

    /// Creates a table where every slot is free.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            slots: [None; OPEN_MAX],
            bound: 0,
        }
    }

    /// Returns the number of bound descriptors.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bound.count_ones() as usize
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bound == 0
    }

    /// Binds the lowest free descriptor to the given index and returns it, or returns
    /// `None` if every descriptor is already bound. The reference count of the index
    /// is left untouched.
    pub fn allocate(&mut self, index: Index) -> Option<Descriptor> {
        let free = !self.bound & Self::MASK;
        if free == 0 {
            return None;
        }

        let fd = Descriptor(free.trailing_zeros() as usize);
        self.bind(fd, index);
        Some(fd)
    }

    /// Binds the given descriptor to an index, replacing any previous binding without
    /// releasing it. Returns `None` if the descriptor is out of range.
    pub fn bind(&mut self, fd: Descriptor, index: Index) -> Option<()> {
        let slot = self.slots.get_mut(fd.0)?;
        *slot = Some(index);
        self.bound |= 1 << fd.0;
        Some(())
    }

    /// Frees the given descriptor and returns the index it was bound to. The reference
    /// count of the index is left untouched.
    pub fn unbind(&mut self, fd: Descriptor) -> Option<Index> {
        let index = self.slots.get_mut(fd.0)?.take()?;
        self.bound &= !(1 << fd.0);
        Some(index)
    }

    /// Returns the index the descriptor is bound to, or `None` if the descriptor is
    /// free or out of range.
    #[must_use]
    pub fn get(&self, fd: Descriptor) -> Option<Index> {
        *self.slots.get(fd.0)?
    }

    /// Resolves a descriptor into the index of a live open file. Returns `None` if the
    /// descriptor is out of range, free, or bound to an empty slot of the table.
    #[must_use]
    pub fn lookup(&self, fd: Descriptor, table: &OpenFileTable) -> Option<Index> {
        self.get(fd).filter(|&index| table.contains(index))
    }

    /// Closes the given descriptor: the reference it holds on the open file is
    /// released and the descriptor is freed. Returns `None` without changing anything
    /// if the descriptor cannot be resolved.
    pub fn close(&mut self, fd: Descriptor, table: &OpenFileTable) -> Option<Release> {
        let index = self.lookup(fd, table)?;
        let release = table.release(index)?;
        self.unbind(fd);
        Some(release)
    }

    /// Closes every bound descriptor. The table is empty afterwards, so calling this
    /// function again does nothing.
    pub fn destroy(&mut self, table: &OpenFileTable) {
        let mut bound = self.bound;
        while bound != 0 {
            let fd = Descriptor(bound.trailing_zeros() as usize);
            bound &= bound - 1;
            if self.close(fd, table).is_none() {
                // The slot points to a file that is no longer in the table.
                self.unbind(fd);
            }
        }
    }

    /// Creates a copy of this table for a new task. Every bound descriptor of the copy
    /// holds its own reference on the same open file as the original.
    #[must_use]
    pub fn duplicate(&self, table: &OpenFileTable) -> Self {
        let mut copy = Self::empty();
        for (fd, index) in self.iter() {
            if table.acquire(index).is_some() {
                copy.bind(fd, index);
            }
        }
        copy
    }

    /// Returns an iterator over the bound descriptors and their indexes, in increasing
    /// descriptor order.
    pub fn iter(&self) -> impl Iterator<Item = (Descriptor, Index)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|index| (Descriptor(i), index)))
    }
}

impl Default for Descriptors {
    fn default() -> Self {
        Self::empty()
    }
}
