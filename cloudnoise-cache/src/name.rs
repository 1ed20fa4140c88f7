//! Validated store entry names

use std::fmt;

use crate::CacheError;

/// Maximum entry name length in bytes
pub const MAX_NAME_LEN: usize = 128;

/// A store key that is safe to use as a single path component
///
/// Names are non-empty ASCII made of alphanumerics, `-`, `_` and `.`, and never
/// start with `.` (so `..`, hidden files and staging directories are unreachable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryName(String);

impl EntryName {
    pub fn new(name: &str) -> Result<Self, CacheError> {
        let invalid = |reason| CacheError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name is longer than 128 bytes"));
        }
        if name.starts_with('.') {
            return Err(invalid("name starts with '.'"));
        }
        if !name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            return Err(invalid("only ASCII letters, digits, '-', '_' and '.' are allowed"));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
