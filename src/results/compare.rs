//! Download verification
//!
//! Compares what a receive test case downloaded with what the server serves,
//! and checks the negotiated protocol against the offered list.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use tracing::warn;

use super::storage::NEGOTIATED_PROTOCOL_FILE;
use crate::models::FileSet;

/// Outcome for one file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileCheck {
    /// Byte-identical
    Match,
    /// Served but not downloaded
    Missing,
    /// Content differs
    Mismatch { expected: usize, actual: usize },
    /// Downloaded but not served
    Unexpected,
}

impl FileCheck {
    pub fn symbol(&self) -> &'static str {
        match self {
            FileCheck::Match => "✓",
            FileCheck::Missing | FileCheck::Mismatch { .. } => "✗",
            FileCheck::Unexpected => "?",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FileCheck::Match)
    }
}

impl fmt::Display for FileCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCheck::Match => write!(f, "match"),
            FileCheck::Missing => write!(f, "missing"),
            FileCheck::Mismatch { expected, actual } => {
                write!(f, "content differs ({expected} bytes served, {actual} downloaded)")
            }
            FileCheck::Unexpected => write!(f, "not served by the endpoint"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub name: String,
    pub check: FileCheck,
}

/// Verification result for one endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub endpoint: String,
    /// Content of the negotiated protocol file, if present
    pub protocol: Option<String>,
    /// Whether the negotiated protocol is one of those offered
    pub protocol_accepted: bool,
    pub files: Vec<FileOutcome>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.protocol_accepted && self.files.iter().all(|f| f.check.is_ok())
    }

    pub fn print(&self) {
        match &self.protocol {
            Some(protocol) if self.protocol_accepted => {
                println!("✓ negotiated protocol: {protocol:?}")
            }
            Some(protocol) => println!("✗ negotiated protocol {protocol:?} was not offered"),
            None => println!("✗ {NEGOTIATED_PROTOCOL_FILE} not found"),
        }
        for outcome in &self.files {
            println!("{} {}: {}", outcome.check.symbol(), outcome.name, outcome.check);
        }
        let status = if self.passed() { "PASS" } else { "FAIL" };
        println!("{status} ({} file(s) checked for /{})", self.files.len(), self.endpoint);
    }
}

/// Compare `<downloads_root>/<endpoint>` with `<www_root>/<endpoint>`.
///
/// An empty protocol entry is accepted when nothing was offered.
pub fn verify_downloads(
    www_root: &Path,
    downloads_root: &Path,
    endpoint: &str,
    protocols: &[String],
) -> Result<VerifyReport> {
    let served = load_tree(&www_root.join(endpoint))
        .with_context(|| format!("Failed to read served files for {endpoint}"))?;
    let downloaded = load_tree(&downloads_root.join(endpoint))
        .with_context(|| format!("Failed to read downloaded files for {endpoint}"))?;

    let mut files = Vec::new();
    for (name, expected) in served.iter() {
        let check = match downloaded.get(name) {
            None => FileCheck::Missing,
            Some(actual) if actual == expected => FileCheck::Match,
            Some(actual) => FileCheck::Mismatch {
                expected: expected.len(),
                actual: actual.len(),
            },
        };
        files.push(FileOutcome {
            name: name.to_string(),
            check,
        });
    }
    for name in downloaded.filenames() {
        if served.get(name).is_none() {
            files.push(FileOutcome {
                name: name.to_string(),
                check: FileCheck::Unexpected,
            });
        }
    }

    let protocol_path = downloads_root.join(NEGOTIATED_PROTOCOL_FILE);
    let protocol = match fs::read(&protocol_path) {
        Ok(bytes) => Some(
            String::from_utf8(bytes)
                .with_context(|| format!("{} is not UTF-8", protocol_path.display()))?,
        ),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", protocol_path.display()))
        }
    };

    let protocol_accepted = match &protocol {
        Some(p) if protocols.is_empty() => p.is_empty(),
        Some(p) => protocols.iter().any(|offered| offered == p),
        None => false,
    };

    Ok(VerifyReport {
        endpoint: endpoint.to_string(),
        protocol,
        protocol_accepted,
        files,
    })
}

/// Every file below `dir`, keyed by its `/`-separated relative path.
///
/// A missing directory yields an empty set.
fn load_tree(dir: &Path) -> io::Result<FileSet> {
    let mut files = FileSet::new();
    if dir.is_dir() {
        walk(dir, "", &mut files)?;
    }
    Ok(files)
}

fn walk(dir: &Path, prefix: &str, files: &mut FileSet) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            warn!("Skipping non UTF-8 filename in {}", dir.display());
            continue;
        };
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        if path.is_dir() {
            walk(&path, &relative, files)?;
        } else if path.is_file() {
            files.insert(relative, fs::read(&path)?);
        }
    }
    Ok(())
}
