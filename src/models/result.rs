//! Invocation results returned by the test page

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use super::files::{FileSet, FileSetError};
use super::testcase::TestCase;

/// Errors interpreting the value a page entry point resolved with
#[derive(Error, Debug)]
pub enum ResultError {
    #[error("Malformed result from {entry_point}: {source}")]
    Malformed {
        entry_point: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entry_point} returned no files for {testcase}")]
    MissingFiles {
        entry_point: &'static str,
        testcase: TestCase,
    },

    #[error(transparent)]
    InvalidBytes(#[from] FileSetError),
}

#[derive(Deserialize)]
struct RawResult {
    protocol: String,
    #[serde(default)]
    files: Option<BTreeMap<String, Vec<i64>>>,
}

/// Outcome of one remote call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationResult {
    /// Protocol the browser session negotiated
    pub protocol: String,
    /// Downloaded files, present for receive test cases
    pub files: Option<FileSet>,
}

impl InvocationResult {
    #[cfg(test)]
    pub fn handshake(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            files: None,
        }
    }

    #[cfg(test)]
    pub fn with_files(mut self, files: FileSet) -> Self {
        self.files = Some(files);
        self
    }

    /// Interpret the JSON value a page function resolved with.
    ///
    /// Receive test cases must carry `files`; for the others the field is
    /// ignored if present.
    pub fn from_value(testcase: TestCase, value: serde_json::Value) -> Result<Self, ResultError> {
        let entry_point = testcase.entry_point();
        let raw: RawResult = serde_json::from_value(value)
            .map_err(|source| ResultError::Malformed { entry_point, source })?;

        let files = if testcase.is_receive() {
            let arrays = raw.files.ok_or(ResultError::MissingFiles {
                entry_point,
                testcase,
            })?;
            Some(FileSet::from_byte_arrays(arrays)?)
        } else {
            None
        };

        Ok(Self {
            protocol: raw.protocol,
            files,
        })
    }
}
