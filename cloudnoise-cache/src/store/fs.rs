//! Filesystem slice store: one directory per entry, one PNG per slice

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::SliceStore;
use crate::{EntryName, StoreError};

const SLICE_PREFIX: &str = "ZSlice_";
const SLICE_SUFFIX: &str = ".png";
const INDEX_DIGITS: usize = 4;

/// Markers for hidden working directories next to entries
const STAGING_MARKER: &str = ".staging-";
const RETIRED_MARKER: &str = ".retired-";

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File name of slice `index` (`ZSlice_0000.png`, `ZSlice_0001.png`, ...).
///
/// The fixed-width index keeps lexicographic and numeric order identical.
pub fn slice_file_name(index: usize) -> String {
    format!(
        "{}{:0width$}{}",
        SLICE_PREFIX,
        index,
        SLICE_SUFFIX,
        width = INDEX_DIGITS
    )
}

/// Inverse of [`slice_file_name`]. Returns `None` for any other file name.
pub fn parse_slice_file_name(file_name: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(SLICE_PREFIX)?
        .strip_suffix(SLICE_SUFFIX)?;
    if digits.len() != INDEX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Stores each entry as `<root>/<name>/ZSlice_NNNN.png`.
///
/// `replace` writes into a hidden staging directory and renames it into place,
/// so an interrupted write never leaves a short entry under the real name.
/// Files in an entry directory that are not slice files are ignored.
#[derive(Debug, Clone)]
pub struct FsSliceStore {
    root: PathBuf,
}

impl FsSliceStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// Staging and retired directories left behind by interrupted writes are
    /// removed. Scratch directories of this process are kept, since another
    /// handle may be writing through them. A root is meant to have a single
    /// owning process; one process cannot tell whether another is still alive.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        let store = Self { root };
        store.purge_scratch()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding entry `name`
    pub fn entry_dir(&self, name: &EntryName) -> PathBuf {
        self.root.join(name.as_str())
    }

    fn scratch_dir(&self, name: &EntryName, marker: &str) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".{name}{marker}{}-{n}", std::process::id()))
    }

    fn purge_scratch(&self) -> Result<(), StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(pid) = scratch_owner(file_name) else {
                continue;
            };
            if pid != std::process::id() {
                tracing::warn!(path = %entry.path().display(), "Removing leftover scratch directory");
                fs::remove_dir_all(entry.path()).map_err(|e| StoreError::io(entry.path(), e))?;
            }
        }
        Ok(())
    }

    fn write_staging(&self, staging: &Path, slices: &[Vec<u8>]) -> Result<(), StoreError> {
        fs::create_dir(staging).map_err(|e| StoreError::io(staging, e))?;
        for (index, bytes) in slices.iter().enumerate() {
            let path = staging.join(slice_file_name(index));
            fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(())
    }

    fn swap_into_place(&self, name: &EntryName, staging: &Path) -> Result<(), StoreError> {
        let target = self.entry_dir(name);
        let retired = if target.exists() {
            let retired = self.scratch_dir(name, RETIRED_MARKER);
            fs::rename(&target, &retired).map_err(|e| StoreError::io(&target, e))?;
            Some(retired)
        } else {
            None
        };

        if let Err(e) = fs::rename(staging, &target) {
            // Put the previous entry back so the failed write is invisible.
            if let Some(retired) = &retired {
                restore_retired(retired, &target);
            }
            return Err(StoreError::io(&target, e));
        }

        if let Some(retired) = retired {
            if let Err(e) = fs::remove_dir_all(&retired) {
                tracing::warn!(path = %retired.display(), error = %e, "Failed to remove retired entry");
            }
        }
        Ok(())
    }
}

/// Process id embedded in a scratch directory name (`.<name><marker><pid>-<n>`)
fn scratch_owner(file_name: &str) -> Option<u32> {
    if !file_name.starts_with('.') {
        return None;
    }
    let tail = [STAGING_MARKER, RETIRED_MARKER]
        .iter()
        .filter_map(|marker| file_name.rfind(marker).map(|at| &file_name[at + marker.len()..]))
        .min_by_key(|tail| tail.len())?;
    let (pid, counter) = tail.split_once('-')?;
    counter.parse::<u64>().ok()?;
    pid.parse().ok()
}

/// Rename a retired entry back over `target`. Returns whether it succeeded.
fn restore_retired(retired: &Path, target: &Path) -> bool {
    match fs::rename(retired, target) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                retired = %retired.display(),
                target = %target.display(),
                error = %e,
                "Failed to restore previous entry; it remains in the retired directory"
            );
            false
        }
    }
}

impl SliceStore for FsSliceStore {
    fn slice_count(&self, name: &EntryName) -> Result<Option<usize>, StoreError> {
        let dir = self.entry_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            if let Some(index) = entry.file_name().to_str().and_then(parse_slice_file_name) {
                indices.push(index);
            }
        }
        indices.sort_unstable();

        if let Some(position) = indices.iter().enumerate().position(|(i, &index)| i != index) {
            return Err(StoreError::Malformed {
                name: name.to_string(),
                reason: format!(
                    "slice indices are not contiguous: expected {}, found {}",
                    position, indices[position]
                ),
            });
        }
        Ok(Some(indices.len()))
    }

    fn read_slice(&self, name: &EntryName, index: usize) -> Result<Vec<u8>, StoreError> {
        let path = self.entry_dir(name).join(slice_file_name(index));
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::MissingSlice {
                name: name.to_string(),
                index,
            },
            _ => StoreError::io(&path, e),
        })
    }

    fn replace(&self, name: &EntryName, slices: &[Vec<u8>]) -> Result<(), StoreError> {
        let staging = self.scratch_dir(name, STAGING_MARKER);
        let result = self
            .write_staging(&staging, slices)
            .and_then(|()| self.swap_into_place(name, &staging));
        if result.is_err() && staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    fn remove(&self, name: &EntryName) -> Result<bool, StoreError> {
        let dir = self.entry_dir(name);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn name(s: &str) -> EntryName {
        EntryName::new(s).unwrap()
    }

    #[test]
    fn test_slice_file_names() {
        assert_eq!(slice_file_name(0), "ZSlice_0000.png");
        assert_eq!(slice_file_name(42), "ZSlice_0042.png");
        assert_eq!(slice_file_name(9999), "ZSlice_9999.png");
        assert_eq!(parse_slice_file_name("ZSlice_0042.png"), Some(42));
        assert_eq!(parse_slice_file_name("ZSlice_42.png"), None);
        assert_eq!(parse_slice_file_name("ZSlice_0042.png.meta"), None);
        assert_eq!(parse_slice_file_name("ZSlice_00a2.png"), None);
        assert!(slice_file_name(9) < slice_file_name(10));
    }

    #[test]
    fn test_missing_entry() {
        let dir = TempDir::new().unwrap();
        let store = FsSliceStore::open(dir.path()).unwrap();
        assert_eq!(store.slice_count(&name("clouds")).unwrap(), None);
        assert!(!store.remove(&name("clouds")).unwrap());
    }

    #[test]
    fn test_replace_writes_numbered_files() {
        let dir = TempDir::new().unwrap();
        let store = FsSliceStore::open(dir.path()).unwrap();
        store
            .replace(&name("clouds"), &[vec![0], vec![1], vec![2]])
            .unwrap();

        let entry = dir.path().join("clouds");
        for i in 0..3 {
            assert_eq!(fs::read(entry.join(slice_file_name(i))).unwrap(), vec![i as u8]);
        }
        assert_eq!(store.slice_count(&name("clouds")).unwrap(), Some(3));
        assert_eq!(store.read_slice(&name("clouds"), 2).unwrap(), vec![2]);
    }

    #[test]
    fn test_replace_drops_old_slices() {
        let dir = TempDir::new().unwrap();
        let store = FsSliceStore::open(dir.path()).unwrap();
        store
            .replace(&name("clouds"), &[vec![0], vec![1], vec![2], vec![3]])
            .unwrap();
        store.replace(&name("clouds"), &[vec![7], vec![8]]).unwrap();

        assert_eq!(store.slice_count(&name("clouds")).unwrap(), Some(2));
        assert!(!dir.path().join("clouds").join(slice_file_name(3)).exists());

        // No scratch directories are left next to the entry.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
    }

    #[test]
    fn test_gap_is_malformed() {
        let dir = TempDir::new().unwrap();
        let entry = dir.path().join("clouds");
        fs::create_dir_all(&entry).unwrap();
        fs::write(entry.join(slice_file_name(0)), b"a").unwrap();
        fs::write(entry.join(slice_file_name(2)), b"c").unwrap();

        let store = FsSliceStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.slice_count(&name("clouds")),
            Err(StoreError::Malformed { .. })
        ));
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let entry = dir.path().join("clouds");
        fs::create_dir_all(&entry).unwrap();
        fs::write(entry.join(slice_file_name(0)), b"a").unwrap();
        fs::write(entry.join("ZSlice_0000.png.meta"), b"meta").unwrap();
        fs::write(entry.join("notes.txt"), b"hi").unwrap();

        let store = FsSliceStore::open(dir.path()).unwrap();
        assert_eq!(store.slice_count(&name("clouds")).unwrap(), Some(1));
    }

    #[test]
    fn test_open_purges_interrupted_writes() {
        let dir = TempDir::new().unwrap();
        let other = std::process::id().wrapping_add(1);
        let staging = dir.path().join(format!(".clouds.staging-{other}-0"));
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join(slice_file_name(0)), b"partial").unwrap();
        let retired = dir.path().join(format!(".clouds.retired-{other}-1"));
        fs::create_dir_all(&retired).unwrap();

        let store = FsSliceStore::open(dir.path()).unwrap();
        assert!(!staging.exists());
        assert!(!retired.exists());
        assert_eq!(store.slice_count(&name("clouds")).unwrap(), None);
    }

    #[test]
    fn test_reopen_keeps_own_scratch_directories() {
        let dir = TempDir::new().unwrap();
        let store = FsSliceStore::open(dir.path()).unwrap();
        let staging = store.scratch_dir(&name("clouds"), STAGING_MARKER);
        fs::create_dir_all(&staging).unwrap();

        FsSliceStore::open(dir.path()).unwrap();
        assert!(staging.exists());

        // The in-flight write can still complete.
        fs::write(staging.join(slice_file_name(0)), b"a").unwrap();
        store.swap_into_place(&name("clouds"), &staging).unwrap();
        assert_eq!(store.slice_count(&name("clouds")).unwrap(), Some(1));
    }

    #[test]
    fn test_scratch_owner() {
        assert_eq!(scratch_owner(".clouds.staging-42-7"), Some(42));
        assert_eq!(scratch_owner(".clouds.retired-9-0"), Some(9));
        assert_eq!(scratch_owner(".a.staging-b.retired-5-1"), Some(5));
        assert_eq!(scratch_owner("clouds.staging-42-7"), None);
        assert_eq!(scratch_owner(".clouds.staging-x-7"), None);
        assert_eq!(scratch_owner(".clouds"), None);
    }

    #[test]
    fn test_restore_retired_reports_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("clouds");
        let retired = dir.path().join(".clouds.retired-1-0");
        assert!(!restore_retired(&retired, &target));

        fs::create_dir_all(&retired).unwrap();
        assert!(restore_retired(&retired, &target));
        assert!(target.exists());
        assert!(!retired.exists());
    }

    #[test]
    fn test_remove_entry() {
        let dir = TempDir::new().unwrap();
        let store = FsSliceStore::open(dir.path()).unwrap();
        store.replace(&name("clouds"), &[vec![0]]).unwrap();
        assert!(store.remove(&name("clouds")).unwrap());
        assert_eq!(store.slice_count(&name("clouds")).unwrap(), None);
    }
}
