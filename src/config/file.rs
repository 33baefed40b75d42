//! Harness settings file
//!
//! Optional YAML or JSON file overriding browser and driver defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings file locations (in order of precedence)
const SETTINGS_LOCATIONS: &[&str] = &[
    "./wt-interop.yaml",
    "./wt-interop.yml",
    "./wt-interop.json",
    "~/.config/wt-interop/settings.yaml",
];

/// Full settings file structure
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// Chrome overrides
    #[serde(default)]
    pub chrome: BrowserSettings,

    /// Firefox overrides
    #[serde(default)]
    pub firefox: BrowserSettings,

    /// Page holding the test entry points
    #[serde(default)]
    pub page_url: Option<String>,

    /// Remote call timeout in seconds
    #[serde(default)]
    pub script_timeout_secs: Option<u64>,

    /// Session teardown timeout in seconds
    #[serde(default)]
    pub quit_timeout_secs: Option<u64>,

    /// Driver startup timeout in seconds
    #[serde(default)]
    pub startup_timeout_secs: Option<u64>,
}

/// Per-browser overrides
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// WebDriver executable
    #[serde(default)]
    pub driver_path: Option<PathBuf>,

    /// Browser executable
    #[serde(default)]
    pub binary: Option<PathBuf>,

    /// Arguments appended to the built-in ones
    #[serde(default)]
    pub args: Vec<String>,

    /// Browser preferences (Firefox only)
    #[serde(default)]
    pub prefs: BTreeMap<String, serde_json::Value>,

    /// Chrome net-log output; `None` keeps the default
    #[serde(default)]
    pub net_log: Option<PathBuf>,
}

impl HarnessSettings {
    /// Find a settings file in the standard locations
    pub fn find() -> Option<PathBuf> {
        SETTINGS_LOCATIONS
            .iter()
            .map(|location| expand_path(location))
            .find(|path| path.exists())
    }

    /// Load from `path`, or from the first standard location, or defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::find() {
                Some(found) => Self::load(&found),
                None => Ok(Self::default()),
            },
        }
    }

    /// Load settings from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML settings: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON settings: {}", path.display()))?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("script_timeout_secs", self.script_timeout_secs),
            ("quit_timeout_secs", self.quit_timeout_secs),
            ("startup_timeout_secs", self.startup_timeout_secs),
        ] {
            if value == Some(0) {
                anyhow::bail!("{name} must be greater than zero");
            }
        }

        for (key, value) in &self.firefox.prefs {
            if !(value.is_boolean() || value.is_number() || value.is_string()) {
                anyhow::bail!("Firefox pref '{key}' must be a boolean, number or string");
            }
        }

        Ok(())
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Check if file is YAML based on extension
fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_default() {
        let settings = HarnessSettings::default();
        assert!(settings.chrome.driver_path.is_none());
        assert!(settings.page_url.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(
            &path,
            r#"
chrome:
  binary: /opt/chrome/chrome
  args: ["--v=1"]
firefox:
  prefs:
    network.http.http3.enabled: true
script_timeout_secs: 60
"#,
        )
        .unwrap();

        let settings = HarnessSettings::load(&path).unwrap();
        assert_eq!(
            settings.chrome.binary.as_deref(),
            Some(Path::new("/opt/chrome/chrome"))
        );
        assert_eq!(settings.chrome.args, vec!["--v=1"]);
        assert_eq!(
            settings.firefox.prefs.get("network.http.http3.enabled"),
            Some(&serde_json::Value::Bool(true))
        );
        assert_eq!(settings.script_timeout_secs, Some(60));
    }

    #[test]
    fn test_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"page_url": "http://localhost:8000/index.html"}"#).unwrap();

        let settings = HarnessSettings::load_or_default(Some(&path)).unwrap();
        assert_eq!(
            settings.page_url.as_deref(),
            Some("http://localhost:8000/index.html")
        );
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let settings = HarnessSettings {
            quit_timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nested_pref() {
        let mut settings = HarnessSettings::default();
        settings
            .firefox
            .prefs
            .insert("x".to_string(), serde_json::json!({ "a": 1 }));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(HarnessSettings::load(dir.path().join("none.yaml")).is_err());
    }

    #[test]
    fn test_expand_path() {
        let path = expand_path("./test.yaml");
        assert_eq!(path, PathBuf::from("./test.yaml"));
    }
}
