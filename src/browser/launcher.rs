//! Browser and driver launch
//!
//! Builds session capabilities for the interop browser images and spawns the
//! matching WebDriver executable.

use serde_json::{json, Map, Value};
use std::fmt;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::webdriver::{WebDriverClient, WebDriverError, WebDriverResult};

/// Supported browsers
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

impl BrowserKind {
    pub fn name(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Firefox => "firefox",
        }
    }

    pub fn default_driver_path(&self) -> &'static str {
        match self {
            BrowserKind::Chrome => "/usr/bin/chromedriver",
            BrowserKind::Firefox => "/usr/bin/geckodriver",
        }
    }

    pub fn default_binary(&self) -> Option<&'static str> {
        match self {
            BrowserKind::Chrome => Some("/usr/bin/google-chrome-beta"),
            BrowserKind::Firefox => None,
        }
    }

    fn port_args(&self, port: u16) -> Vec<String> {
        match self {
            BrowserKind::Chrome => vec![format!("--port={port}")],
            BrowserKind::Firefox => vec!["--port".to_string(), port.to_string()],
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything needed to start one browser session
#[derive(Clone, Debug)]
pub struct LaunchOptions {
    pub browser: BrowserKind,
    pub driver_path: PathBuf,
    pub binary: Option<PathBuf>,
    pub extra_args: Vec<String>,
    pub prefs: Map<String, Value>,
    pub net_log: PathBuf,
}

impl LaunchOptions {
    /// Defaults for `browser`, with settings-file overrides applied
    pub fn new(browser: BrowserKind, settings: &BrowserSettings) -> Self {
        let driver_path = settings
            .driver_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(browser.default_driver_path()));
        let binary = settings
            .binary
            .clone()
            .or_else(|| browser.default_binary().map(PathBuf::from));

        let mut prefs = Map::new();
        if browser == BrowserKind::Firefox {
            prefs.insert("network.http.http3.enabled".to_string(), json!(true));
            prefs.insert("network.http.http3.enable_0rtt".to_string(), json!(true));
        }
        for (key, value) in &settings.prefs {
            prefs.insert(key.clone(), value.clone());
        }

        Self {
            browser,
            driver_path,
            binary,
            extra_args: settings.args.clone(),
            prefs,
            net_log: settings
                .net_log
                .clone()
                .unwrap_or_else(|| PathBuf::from("/logs/chrome.json")),
        }
    }

    pub fn with_driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver_path = path.into();
        self
    }

    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Browser command-line arguments
    pub fn browser_args(&self) -> Vec<String> {
        let mut args: Vec<String> = match self.browser {
            BrowserKind::Chrome => vec![
                "--no-sandbox".to_string(),
                "--headless".to_string(),
                "--enable-quic".to_string(),
                "--disable-gpu".to_string(),
                "--disable-setuid-sandbox".to_string(),
                format!("--log-net-log={}", self.net_log.display()),
                "--net-log-capture-mode=IncludeSensitive".to_string(),
            ],
            BrowserKind::Firefox => vec!["--headless".to_string()],
        };
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// `alwaysMatch` capabilities for a new session
    pub fn capabilities(&self) -> Value {
        let mut options = Map::new();
        options.insert("args".to_string(), json!(self.browser_args()));
        if let Some(binary) = &self.binary {
            options.insert("binary".to_string(), json!(binary.display().to_string()));
        }

        match self.browser {
            BrowserKind::Chrome => json!({
                "browserName": "chrome",
                "goog:chromeOptions": options,
                "goog:loggingPrefs": { "browser": "ALL" },
            }),
            BrowserKind::Firefox => {
                options.insert("prefs".to_string(), Value::Object(self.prefs.clone()));
                json!({
                    "browserName": "firefox",
                    "moz:firefoxOptions": options,
                })
            }
        }
    }
}

/// A running WebDriver executable, killed on drop
pub struct DriverProcess {
    child: Child,
    url: String,
}

impl DriverProcess {
    /// Spawn the driver on a free local port and wait until it accepts sessions
    pub async fn spawn(options: &LaunchOptions, startup_timeout: Duration) -> WebDriverResult<Self> {
        let port = find_free_port()?;
        let url = format!("http://127.0.0.1:{port}");

        info!(
            "Starting {} on port {}",
            options.driver_path.display(),
            port
        );

        let child = Command::new(&options.driver_path)
            .args(options.browser.port_args(port))
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                WebDriverError::DriverStartup(format!(
                    "Failed to spawn {}: {}",
                    options.driver_path.display(),
                    e
                ))
            })?;

        let process = Self { child, url };
        wait_until_ready(&process.url, startup_timeout).await?;
        info!("Driver ready at {}", process.url);
        Ok(process)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Kill the driver and reap it
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!("Driver already exited: {}", e);
        }
    }
}

/// Poll `GET /status` until the driver is ready; no request outlives `timeout`
async fn wait_until_ready(url: &str, timeout: Duration) -> WebDriverResult<()> {
    let client = WebDriverClient::new(url)?;
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }
        attempts += 1;
        match client.is_ready(remaining).await {
            Ok(true) => return Ok(()),
            Ok(false) => debug!("Driver not ready yet"),
            // Connection refused is expected while the driver starts
            Err(WebDriverError::Http(e)) if e.is_connect() => {}
            Err(e) => warn!("Driver status check failed: {}", e),
        }
        sleep(Duration::from_millis(100).min(timeout.saturating_sub(start.elapsed())))
            .await;
    }

    Err(WebDriverError::DriverStartup(format!(
        "not ready after {attempts} attempts in {}ms",
        timeout.as_millis()
    )))
}

fn find_free_port() -> WebDriverResult<u16> {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .map_err(|e| WebDriverError::DriverStartup(format!("no free port: {e}")))
}
