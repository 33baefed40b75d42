//! WebDriver-backed browser sessions
//!
//! Spawns the driver on first use (unless an external one is given), opens a
//! session with the launch capabilities and loads the test page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::launcher::{DriverProcess, LaunchOptions};
use crate::executor::{SessionFactory, DEFAULT_SCRIPT_TIMEOUT};
use crate::webdriver::{WebDriverClient, WebDriverSession};

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_QUIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens sessions in the browser described by [`LaunchOptions`]
pub struct BrowserSessions {
    options: LaunchOptions,
    webdriver_url: Option<String>,
    page_url: String,
    script_timeout: Duration,
    startup_timeout: Duration,
    quit_timeout: Duration,
    driver: Option<DriverProcess>,
}

impl BrowserSessions {
    pub fn new(options: LaunchOptions, page_url: impl Into<String>) -> Self {
        Self {
            options,
            webdriver_url: None,
            page_url: page_url.into(),
            script_timeout: DEFAULT_SCRIPT_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            quit_timeout: DEFAULT_QUIT_TIMEOUT,
            driver: None,
        }
    }

    /// Use an already running WebDriver server instead of spawning one
    pub fn with_webdriver_url(mut self, url: Option<String>) -> Self {
        self.webdriver_url = url;
        self
    }

    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_quit_timeout(mut self, timeout: Duration) -> Self {
        self.quit_timeout = timeout;
        self
    }

    /// Stop the driver this factory spawned, if any
    pub async fn shutdown(self) {
        if let Some(driver) = self.driver {
            driver.stop().await;
        }
    }

    async fn driver_url(&mut self) -> Result<String> {
        if let Some(url) = &self.webdriver_url {
            return Ok(url.clone());
        }
        if let Some(driver) = &self.driver {
            return Ok(driver.url().to_string());
        }

        let driver = DriverProcess::spawn(&self.options, self.startup_timeout)
            .await
            .with_context(|| format!("Failed to start {} driver", self.options.browser))?;
        let url = driver.url().to_string();
        self.driver = Some(driver);
        Ok(url)
    }

    async fn prepare(&self, session: &mut WebDriverSession) -> Result<()> {
        session
            .set_script_timeout(self.script_timeout)
            .await
            .context("Failed to set script timeout")?;
        session
            .navigate(&self.page_url)
            .await
            .with_context(|| format!("Failed to load {}", self.page_url))?;
        debug!("Loaded {}", self.page_url);
        Ok(())
    }

    async fn quit(&self, session: WebDriverSession) {
        match tokio::time::timeout(self.quit_timeout, session.quit()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to close browser session: {}", e),
            Err(_) => warn!(
                "Browser did not close within {} seconds, forcing exit",
                self.quit_timeout.as_secs()
            ),
        }
    }
}

#[async_trait]
impl SessionFactory for BrowserSessions {
    type Session = WebDriverSession;

    async fn open(&mut self) -> Result<WebDriverSession> {
        let base_url = self.driver_url().await?;
        let client = WebDriverClient::new(&base_url)?;
        let mut session = client
            .new_session(self.options.capabilities())
            .await
            .with_context(|| {
                format!(
                    "Failed to start {} through {}",
                    self.options.browser, base_url
                )
            })?;
        info!("Started {} session {}", self.options.browser, session.id());

        if let Err(e) = self.prepare(&mut session).await {
            self.quit(session).await;
            return Err(e);
        }
        Ok(session)
    }

    async fn close(&mut self, session: WebDriverSession) {
        self.quit(session).await;
    }
}
