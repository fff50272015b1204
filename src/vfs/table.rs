use super::file::OpenFile;
use crate::prelude::*;

/// The index of an open file in the global open file table. It is never visible to
/// userland, which only sees descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Index(pub usize);

/// An entry of the global open file table: an open file and the number of descriptors
/// bound to it across all tasks. The reference count is only modified while the table
/// is locked, so an increment or a decrement and the comparison to zero that follows
/// always happen in the same critical section.
struct Entry {
    file: Arc<OpenFile>,
    references: usize,
}

/// The table of every open file in the system. It has a fixed capacity, chosen when the
/// kernel starts, and an open file stays in the table as long as at least one descriptor
/// is bound to it.
pub struct OpenFileTable {
    entries: Spinlock<Vec<Option<Entry>>>,
}

impl OpenFileTable {
    /// Creates an empty table that can hold up to `capacity` open files.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let entries = core::iter::repeat_with(|| None).take(capacity).collect();
        Self {
            entries: Spinlock::new(entries),
        }
    }

    /// Returns the maximal number of open files the table can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns the number of open files currently in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().iter().filter(|e| e.is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts the open file in the first empty slot of the table, with a reference
    /// count of 1, and returns its index.
    ///
    /// # Errors
    /// Returns [`TableFull`] if there is no empty slot left. In this case, the open
    /// file is dropped before returning, which closes its node.
    pub fn insert(&self, file: OpenFile) -> Result<Index, TableFull> {
        let mut entries = self.entries.lock();
        match entries.iter().position(Option::is_none) {
            Some(i) => {
                entries[i] = Some(Entry {
                    file: Arc::new(file),
                    references: 1,
                });
                Ok(Index(i))
            }
            None => {
                drop(entries);
                log::warn!("Global open file table is full");
                Err(TableFull)
            }
        }
    }

    /// Returns the open file at the given index, or `None` if the slot is empty or out
    /// of the table.
    #[must_use]
    pub fn get(&self, index: Index) -> Option<Arc<OpenFile>> {
        self.entries
            .lock()
            .get(index.0)?
            .as_ref()
            .map(|entry| Arc::clone(&entry.file))
    }

    /// Returns true if an open file lives at the given index.
    #[must_use]
    pub fn contains(&self, index: Index) -> bool {
        matches!(self.entries.lock().get(index.0), Some(Some(_)))
    }

    /// Returns the reference count of the open file at the given index.
    #[must_use]
    pub fn references(&self, index: Index) -> Option<usize> {
        self.entries
            .lock()
            .get(index.0)?
            .as_ref()
            .map(|entry| entry.references)
    }

    /// Adds a reference to the open file at the given index and returns the new count,
    /// or `None` if there is no open file at this index.
    pub fn acquire(&self, index: Index) -> Option<usize> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(index.0)?.as_mut()?;
        entry.references += 1;
        Some(entry.references)
    }

    /// Removes a reference to the open file at the given index. When the last reference
    /// is removed, the slot is emptied and the open file is dropped, closing its node.
    /// Returns `None` if there is no open file at this index.
    pub fn release(&self, index: Index) -> Option<Release> {
        let mut entries = self.entries.lock();
        let slot = entries.get_mut(index.0)?;
        let entry = slot.as_mut()?;
        entry.references -= 1;
        if entry.references > 0 {
            return Some(Release::Shared(entry.references));
        }

        // Drop the file once the table is unlocked: closing the node is done by the
        // storage layer and must not be done with the table locked.
        let removed = slot.take();
        drop(entries);
        drop(removed);
        Some(Release::Destroyed)
    }
}

impl core::fmt::Debug for OpenFileTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OpenFileTable")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// What happened to an open file after a reference to it was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Release {
    /// The open file is still referenced, by this number of descriptors.
    Shared(usize),

    /// The last reference was released: the open file was removed from the table.
    Destroyed,
}

/// The global open file table has no empty slot left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableFull;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing::MemoryNode, vfs::file::OpenFlags};

    fn open(node: &Arc<MemoryNode>) -> OpenFile {
        OpenFile::new(node.open(), OpenFlags::READ_WRITE).unwrap()
    }

    #[test]
    fn insert_uses_first_empty_slot() {
        let node = MemoryNode::with_content(b"");
        let table = OpenFileTable::new(4);
        assert_eq!(table.insert(open(&node)), Ok(Index(0)));
        assert_eq!(table.insert(open(&node)), Ok(Index(1)));
        assert_eq!(table.insert(open(&node)), Ok(Index(2)));

        assert_eq!(table.release(Index(1)), Some(Release::Destroyed));
        assert_eq!(table.insert(open(&node)), Ok(Index(1)));
        assert_eq!(table.len(), 3);
        assert_eq!(table.capacity(), 4);
    }

    #[test]
    fn full_table_closes_the_rejected_node() {
        let node = MemoryNode::with_content(b"");
        let table = OpenFileTable::new(1);
        assert_eq!(table.insert(open(&node)), Ok(Index(0)));
        assert_eq!(node.opened(), 1);

        assert_eq!(table.insert(open(&node)), Err(TableFull));
        assert_eq!(node.opened(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn node_is_closed_with_the_last_reference() {
        let node = MemoryNode::with_content(b"");
        let table = OpenFileTable::new(2);
        let index = table.insert(open(&node)).unwrap();

        assert_eq!(table.acquire(index), Some(2));
        assert_eq!(table.release(index), Some(Release::Shared(1)));
        assert_eq!(node.opened(), 1);
        assert!(table.contains(index));

        assert_eq!(table.release(index), Some(Release::Destroyed));
        assert_eq!(node.opened(), 0);
        assert!(!table.contains(index));
        assert!(table.is_empty());
    }

    #[test]
    fn empty_or_out_of_range_slots() {
        let table = OpenFileTable::new(2);
        assert!(table.get(Index(0)).is_none());
        assert!(table.get(Index(7)).is_none());
        assert_eq!(table.acquire(Index(1)), None);
        assert_eq!(table.release(Index(7)), None);
        assert_eq!(table.references(Index(0)), None);
    }

    #[test]
    fn in_flight_reference_keeps_the_file_alive() {
        let node = MemoryNode::with_content(b"");
        let table = OpenFileTable::new(2);
        let index = table.insert(open(&node)).unwrap();

        let file = table.get(index).unwrap();
        assert_eq!(table.release(index), Some(Release::Destroyed));
        assert!(!table.contains(index));
        assert_eq!(node.opened(), 1);

        drop(file);
        assert_eq!(node.opened(), 0);
    }
}
