//! Result persistence
//!
//! Writes the negotiated protocol and downloaded files where the interop
//! runner collects them.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::models::InvocationResult;

/// Default output root
pub const DEFAULT_DOWNLOADS_ROOT: &str = "/downloads";

/// File holding the negotiated protocol, relative to the output root
pub const NEGOTIATED_PROTOCOL_FILE: &str = "negotiated_protocol.txt";

/// Writes invocation results under an output root
#[derive(Clone, Debug)]
pub struct ResultPersister {
    output_root: PathBuf,
}

impl ResultPersister {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn protocol_path(&self) -> PathBuf {
        self.output_root.join(NEGOTIATED_PROTOCOL_FILE)
    }

    /// Persist `result`, returning every path written.
    ///
    /// Receive test cases also get their files written to
    /// `<output_root>/<endpoint>/<filename>`.
    pub fn persist(&self, result: &InvocationResult, config: &Config) -> Result<Vec<PathBuf>> {
        let downloads = if config.testcase.is_receive() {
            let endpoint = config
                .endpoint
                .as_deref()
                .with_context(|| format!("{} config has no endpoint", config.testcase))?;
            let files = result
                .files
                .as_ref()
                .with_context(|| format!("{} result has no files", config.testcase))?;
            // Reject bad names before anything touches the disk
            let entries = files
                .iter()
                .map(|(name, content)| {
                    let relative = safe_relative_path(name)?;
                    Ok::<_, anyhow::Error>((name, relative, content))
                })
                .collect::<Result<Vec<_>>>()?;
            Some((self.output_root.join(endpoint), entries))
        } else {
            None
        };

        fs::create_dir_all(&self.output_root).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_root.display()
            )
        })?;

        let protocol_path = self.protocol_path();
        fs::write(&protocol_path, result.protocol.as_bytes())
            .with_context(|| format!("Failed to write {}", protocol_path.display()))?;
        let mut written = vec![protocol_path];

        let Some((download_dir, entries)) = downloads else {
            return Ok(written);
        };

        fs::create_dir_all(&download_dir).with_context(|| {
            format!("Failed to create directory: {}", download_dir.display())
        })?;

        for (filename, relative, content) in entries {
            info!("downloaded file: {}, size: {}", filename, content.len());

            let path = download_dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::write(&path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }

        Ok(written)
    }
}

/// Accept only plain relative names so downloads stay under the endpoint dir
fn safe_relative_path(filename: &str) -> Result<&Path> {
    let path = Path::new(filename);
    let plain = !filename.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if !plain {
        anyhow::bail!("Refusing to write downloaded file with unsafe name: {filename:?}");
    }
    Ok(path)
}
