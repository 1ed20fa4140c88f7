//! In-memory slice store

use std::sync::{Arc, PoisonError, RwLock};

use hashbrown::HashMap;

use super::SliceStore;
use crate::{EntryName, StoreError};

/// Keeps entries in a map of immutable slice sequences.
///
/// `replace` swaps a single map value, so readers never see a partial entry.
#[derive(Debug, Default)]
pub struct MemorySliceStore {
    entries: RwLock<HashMap<String, Arc<[Vec<u8>]>>>,
}

impl MemorySliceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored entries, sorted
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    fn entry(&self, name: &EntryName) -> Option<Arc<[Vec<u8>]>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name.as_str()).cloned()
    }
}

impl SliceStore for MemorySliceStore {
    fn slice_count(&self, name: &EntryName) -> Result<Option<usize>, StoreError> {
        Ok(self.entry(name).map(|slices| slices.len()))
    }

    fn read_slice(&self, name: &EntryName, index: usize) -> Result<Vec<u8>, StoreError> {
        self.entry(name)
            .and_then(|slices| slices.get(index).cloned())
            .ok_or_else(|| StoreError::MissingSlice {
                name: name.to_string(),
                index,
            })
    }

    fn replace(&self, name: &EntryName, slices: &[Vec<u8>]) -> Result<(), StoreError> {
        let slices: Arc<[Vec<u8>]> = slices.to_vec().into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(name.to_string(), slices);
        Ok(())
    }

    fn remove(&self, name: &EntryName) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.remove(name.as_str()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> EntryName {
        EntryName::new(s).unwrap()
    }

    #[test]
    fn test_replace_and_read() {
        let store = MemorySliceStore::new();
        assert_eq!(store.slice_count(&name("a")).unwrap(), None);

        store.replace(&name("a"), &[vec![1], vec![2, 3]]).unwrap();
        assert_eq!(store.slice_count(&name("a")).unwrap(), Some(2));
        assert_eq!(store.read_slice(&name("a"), 1).unwrap(), vec![2, 3]);
        assert!(matches!(
            store.read_slice(&name("a"), 2),
            Err(StoreError::MissingSlice { index: 2, .. })
        ));
    }

    #[test]
    fn test_replace_overwrites_whole_entry() {
        let store = MemorySliceStore::new();
        store.replace(&name("a"), &[vec![1], vec![2], vec![3]]).unwrap();
        store.replace(&name("a"), &[vec![9]]).unwrap();
        assert_eq!(store.slice_count(&name("a")).unwrap(), Some(1));
        assert_eq!(store.read_slice(&name("a"), 0).unwrap(), vec![9]);
    }

    #[test]
    fn test_remove() {
        let store = MemorySliceStore::new();
        store.replace(&name("b"), &[vec![0]]).unwrap();
        store.replace(&name("a"), &[]).unwrap();
        assert_eq!(store.names(), vec!["a".to_string(), "b".to_string()]);
        assert!(store.remove(&name("b")).unwrap());
        assert!(!store.remove(&name("b")).unwrap());
        assert_eq!(store.names(), vec!["a".to_string()]);
    }
}
