//! Slice store abstraction
//!
//! A store maps an [`EntryName`] to an ordered sequence of encoded slices. The
//! cache depends only on this trait; backends decide how entries are kept.

mod fs;
mod memory;

pub use fs::{parse_slice_file_name, slice_file_name, FsSliceStore};
pub use memory::MemorySliceStore;

use crate::{EntryName, StoreError};

/// Persistent home for encoded slice sequences.
///
/// Implementations must make [`replace`](SliceStore::replace) atomic from a
/// reader's point of view: a reader sees either the old sequence, the new one,
/// or no entry at all, never a mix or a prefix.
pub trait SliceStore: Send + Sync {
    /// Number of slices stored under `name`, or `None` if there is no entry.
    ///
    /// Returns [`StoreError::Malformed`] if the entry exists but its slice
    /// indices are not exactly `0..n`.
    fn slice_count(&self, name: &EntryName) -> Result<Option<usize>, StoreError>;

    /// Encoded bytes of slice `index`.
    fn read_slice(&self, name: &EntryName, index: usize) -> Result<Vec<u8>, StoreError>;

    /// Replace the entry with `slices` (index order), creating it if needed.
    fn replace(&self, name: &EntryName, slices: &[Vec<u8>]) -> Result<(), StoreError>;

    /// Delete the entry. Returns whether it existed.
    fn remove(&self, name: &EntryName) -> Result<bool, StoreError>;
}
