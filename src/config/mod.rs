//! Run configuration
//!
//! Validates the environment inputs and assembles the [`Config`] every other
//! component works from. Validation happens before any browser is started.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig, CERTHASH, PROTOCOLS};
pub use file::{BrowserSettings, HarnessSettings};

#[cfg(test)]
pub(crate) use env::{EnvBuilder, ENV_LOCK};

use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::files::load_files;
use crate::models::{FileSet, TestCase};
use crate::request::{parse_requests, resolve_endpoint, RequestMap};

/// Exit code telling the interop runner a test case is not supported
pub const EXIT_UNSUPPORTED: i32 = 127;

/// Exit code for invalid configuration and failed runs
pub const EXIT_FAILURE: i32 = 1;

/// Configuration errors, detected before any browser interaction
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown TESTCASE: '{0}'. TESTCASE must be one of: {}", TestCase::known_names())]
    UnsupportedTestcase(String),

    #[error("REQUESTS must contain at least one URL")]
    MissingRequests,

    #[error("{name} must be set for {testcase}")]
    MissingInput {
        name: &'static str,
        testcase: TestCase,
    },

    #[error("{testcase} test requires at least one request URL with endpoint path")]
    MissingEndpoint { testcase: TestCase },

    #[error("Failed to load files for endpoint '{endpoint}': {source}")]
    FileLoad {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::UnsupportedTestcase(_) => EXIT_UNSUPPORTED,
            _ => EXIT_FAILURE,
        }
    }
}

/// Resolved configuration for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub testcase: TestCase,
    /// First request URL; the session is opened against it
    pub url: String,
    /// Offered protocols in preference order
    pub protocols: Vec<String>,
    /// Certificate hash, passed to the page unmodified
    pub certhash: String,
    pub request_map: RequestMap,
    /// Path tails the page should request (receive test cases)
    pub filenames: Vec<String>,
    /// Endpoint namespace, set for every test case except handshake
    pub endpoint: Option<String>,
    /// Files to upload, set for transfer
    pub files_by_filename: Option<FileSet>,
}

impl Config {
    /// Validate `vars` and build the configuration.
    ///
    /// Send files for `transfer` are read from `<www_root>/<endpoint>/`.
    pub fn resolve(vars: &EnvConfig, www_root: &Path) -> Result<Self, ConfigError> {
        let testcase = check_testcase(vars)?;

        let requests = vars.requests.as_deref().unwrap_or_default();
        let url = requests
            .split_whitespace()
            .next()
            .ok_or(ConfigError::MissingRequests)?
            .to_string();

        let protocols = vars
            .protocols
            .as_deref()
            .map(parse_protocols)
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingInput {
                name: PROTOCOLS,
                testcase,
            })?;

        let certhash = vars
            .certhash
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or(ConfigError::MissingInput {
                name: CERTHASH,
                testcase,
            })?;

        let request_map = parse_requests(requests);
        let filenames = request_map.primary_tails();

        let mut config = Config {
            testcase,
            url,
            protocols,
            certhash,
            request_map,
            filenames,
            endpoint: None,
            files_by_filename: None,
        };

        if testcase.requires_endpoint() {
            let endpoint =
                resolve_endpoint(requests).ok_or(ConfigError::MissingEndpoint { testcase })?;

            if testcase == TestCase::Transfer {
                let files = load_files(www_root, &endpoint).map_err(|source| {
                    ConfigError::FileLoad {
                        endpoint: endpoint.clone(),
                        source,
                    }
                })?;
                if files.is_empty() {
                    warn!("No send files under {}", www_root.join(&endpoint).display());
                } else {
                    info!(
                        "Loaded {} file(s), {} bytes, from {}",
                        files.len(),
                        files.total_bytes(),
                        www_root.join(&endpoint).display()
                    );
                }
                config.files_by_filename = Some(files);
            }

            config.endpoint = Some(endpoint);
        }

        debug!("Resolved config: {:?}", config);
        Ok(config)
    }

    /// Print a human-readable summary
    pub fn print_summary(&self) {
        println!("Test case:  {} ({})", self.testcase, self.testcase.entry_point());
        println!("URL:        {}", self.url);
        println!("Protocols:  {}", self.protocols.join(", "));
        println!("Cert hash:  {}", self.certhash);
        if let Some(endpoint) = &self.endpoint {
            println!("Endpoint:   {endpoint}");
        }
        println!("Requests:");
        for (key, tails) in self.request_map.iter() {
            println!("  {key}: {}", tails.join(" "));
        }
        if let Some(files) = &self.files_by_filename {
            println!("Send files:");
            for (name, content) in files.iter() {
                println!("  {name} ({} bytes)", content.len());
            }
        }
    }
}

/// Check only the test case.
///
/// Run before launching a browser so unsupported test cases exit with
/// [`EXIT_UNSUPPORTED`] without any setup cost.
pub fn check_testcase(env: &EnvConfig) -> Result<TestCase, ConfigError> {
    let name = env.testcase.as_deref().unwrap_or_default();
    TestCase::from_name(name).ok_or_else(|| ConfigError::UnsupportedTestcase(name.to_string()))
}

/// Split a protocol list on spaces and commas, keeping order and duplicates
pub fn parse_protocols(s: &str) -> Vec<String> {
    s.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn env(testcase: &str, requests: &str) -> EnvConfig {
        EnvConfig {
            testcase: Some(testcase.to_string()),
            requests: Some(requests.to_string()),
            protocols: Some("moq-00 moq-01".to_string()),
            certhash: Some("q4Tb7CqUmJZRtD2nBkSV4xU8W1gWq4Fh3mAlQyYyD6w=".to_string()),
        }
    }

    #[test]
    fn test_unknown_testcase_checked_first() {
        let root = tempdir().unwrap();
        let env = EnvConfig {
            testcase: Some("resumption".to_string()),
            ..Default::default()
        };
        let err = Config::resolve(&env, root.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedTestcase(ref t) if t == "resumption"));
        assert_eq!(err.exit_code(), EXIT_UNSUPPORTED);

        let err = Config::resolve(&EnvConfig::default(), root.path()).unwrap_err();
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_missing_requests() {
        let root = tempdir().unwrap();
        let err = Config::resolve(&env("handshake", "   "), root.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequests));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_missing_protocols_and_certhash() {
        let root = tempdir().unwrap();

        let mut e = env("handshake", "https://h/files/a");
        e.protocols = None;
        let err = Config::resolve(&e, root.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingInput { name: "PROTOCOLS", .. }));
        assert!(err.to_string().contains("handshake"));

        let mut e = env("handshake", "https://h/files/a");
        e.protocols = Some(" , ".to_string());
        assert!(Config::resolve(&e, root.path()).is_err());

        let mut e = env("handshake", "https://h/files/a");
        e.certhash = Some(String::new());
        let err = Config::resolve(&e, root.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingInput { name: "CERTHASH", .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_handshake_config() {
        let root = tempdir().unwrap();
        let config = Config::resolve(
            &env("handshake", "https://server:443/files/a.bin https://server:443/files/b.bin"),
            root.path(),
        )
        .unwrap();

        assert_eq!(config.testcase, TestCase::Handshake);
        assert_eq!(config.url, "https://server:443/files/a.bin");
        assert_eq!(config.protocols, vec!["moq-00", "moq-01"]);
        assert_eq!(config.filenames, vec!["a.bin", "b.bin"]);
        assert!(config.endpoint.is_none());
        assert!(config.files_by_filename.is_none());
    }

    #[test]
    fn test_transfer_loads_files() {
        let root = tempdir().unwrap();
        let dir = root.path().join("files");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("y.bin"), [9u8, 8, 7]).unwrap();
        fs::write(dir.join("x.txt"), b"text").unwrap();

        let config = Config::resolve(&env("transfer", "http://h/files/a.bin"), root.path()).unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("files"));
        let files = config.files_by_filename.unwrap();
        assert_eq!(files.filenames().collect::<Vec<_>>(), vec!["x.txt", "y.bin"]);
        assert_eq!(files.get("x.txt"), Some(&b"text"[..]));
        assert_eq!(files.get("y.bin"), Some(&[9u8, 8, 7][..]));
    }

    #[test]
    fn test_transfer_without_directory() {
        let root = tempdir().unwrap();
        let config = Config::resolve(&env("transfer", "http://h/files/a.bin"), root.path()).unwrap();
        assert!(config.files_by_filename.unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_required() {
        let root = tempdir().unwrap();
        for testcase in ["transfer", "transfer-unidirectional-receive", "transfer-datagram-receive"]
        {
            let err = Config::resolve(&env(testcase, "https://h/ https://h/files/a"), root.path())
                .unwrap_err();
            assert!(matches!(err, ConfigError::MissingEndpoint { .. }));
            assert!(err.to_string().starts_with(testcase));
            assert_eq!(err.exit_code(), 1);
        }
    }

    #[test]
    fn test_receive_config() {
        let root = tempdir().unwrap();
        let config = Config::resolve(
            &env(
                "transfer-bidirectional-receive",
                "https://h:4433/files/a.bin https://h:4433/files/b.bin",
            ),
            root.path(),
        )
        .unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("files"));
        assert_eq!(config.filenames, vec!["a.bin", "b.bin"]);
        assert!(config.files_by_filename.is_none());
    }

    #[test]
    fn test_receive_filenames_from_first_url_with_tail() {
        let root = tempdir().unwrap();
        let config = Config::resolve(
            &env(
                "transfer-unidirectional-receive",
                "https://h/files https://h/echo/a.bin",
            ),
            root.path(),
        )
        .unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("files"));
        assert_eq!(config.filenames, vec!["a.bin"]);
    }

    #[test]
    fn test_parse_protocols() {
        assert_eq!(parse_protocols("a b c"), vec!["a", "b", "c"]);
        assert_eq!(parse_protocols("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_protocols("b, a  b"), vec!["b", "a", "b"]);
        assert!(parse_protocols("").is_empty());
    }

    #[test]
    fn test_resolve_from_process_env() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvBuilder::new()
            .testcase("transfer-unidirectional-receive")
            .requests("https://server/files/f1 https://server/files/f2")
            .protocols("moq-00")
            .certhash("abc=")
            .apply_scoped();

        let root = tempdir().unwrap();
        let config = Config::resolve(&EnvConfig::load(), root.path()).unwrap();
        assert_eq!(config.testcase, TestCase::UnidirectionalReceive);
        assert_eq!(config.filenames, vec!["f1", "f2"]);
    }
}
