//! File payloads exchanged with the browser
//!
//! The harness reads raw bytes from disk while the page hands back byte arrays
//! as JSON number lists. Both end up in a [`FileSet`].

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors converting browser byte arrays
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FileSetError {
    #[error("File {filename}: byte {index} has value {value}, outside 0-255")]
    ByteOutOfRange {
        filename: String,
        index: usize,
        value: i64,
    },
}

/// Filename to content mapping
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<String, Vec<u8>>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, filename: impl Into<String>, content: Vec<u8>) {
        self.files.insert(filename.into(), content);
    }

    pub fn get(&self, filename: &str) -> Option<&[u8]> {
        self.files.get(filename).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.files
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_slice()))
    }

    /// Total payload size in bytes
    pub fn total_bytes(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    /// Build from integer arrays as returned by the page, rejecting any value
    /// that does not fit in a byte.
    pub fn from_byte_arrays(
        arrays: impl IntoIterator<Item = (String, Vec<i64>)>,
    ) -> Result<Self, FileSetError> {
        let mut set = FileSet::new();
        for (filename, values) in arrays {
            let content = to_bytes(&filename, &values)?;
            set.files.insert(filename, content);
        }
        Ok(set)
    }
}

fn to_bytes(filename: &str, values: &[i64]) -> Result<Vec<u8>, FileSetError> {
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            u8::try_from(value).map_err(|_| FileSetError::ByteOutOfRange {
                filename: filename.to_string(),
                index,
                value,
            })
        })
        .collect()
}

impl FromIterator<(String, Vec<u8>)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// Serializes as `{"name": [byte, ...]}`, the shape the page's `runTransfer`
/// expects.
impl Serialize for FileSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.files.serialize(serializer)
    }
}
