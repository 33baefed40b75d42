//! W3C WebDriver client
//!
//! Speaks just enough of the WebDriver wire protocol to open a session, load
//! the test page, run one script and read the console log.

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Timeout for commands other than script execution
const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Slack on top of the script timeout before the HTTP request gives up
const SCRIPT_REQUEST_SLACK: Duration = Duration::from_secs(30);

/// WebDriver client errors
#[derive(Error, Debug)]
pub enum WebDriverError {
    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error '{error}': {message}")]
    Protocol { error: String, message: String },

    #[error("Script timed out after {0} seconds")]
    ScriptTimeout(u64),

    #[error("Malformed WebDriver response: {0}")]
    MalformedResponse(String),

    #[error("Driver failed to start: {0}")]
    DriverStartup(String),
}

pub type WebDriverResult<T> = Result<T, WebDriverError>;

/// One browser console entry
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LogEntry {
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Connection to a WebDriver server
#[derive(Clone)]
pub struct WebDriverClient {
    client: Client,
    base_url: String,
}

impl WebDriverClient {
    pub fn new(base_url: impl Into<String>) -> WebDriverResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the server reports itself ready for new sessions, waiting at
    /// most `timeout` for the reply
    pub async fn is_ready(&self, timeout: Duration) -> WebDriverResult<bool> {
        let value = self
            .command(Method::GET, "/status", None, Some(timeout))
            .await?;
        Ok(value.get("ready").and_then(Value::as_bool).unwrap_or(false))
    }

    /// Start a session with the given `alwaysMatch` capabilities
    pub async fn new_session(&self, capabilities: Value) -> WebDriverResult<WebDriverSession> {
        let body = json!({ "capabilities": { "alwaysMatch": capabilities } });
        let value = self
            .command(Method::POST, "/session", Some(body), None)
            .await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::MalformedResponse("missing sessionId".to_string()))?
            .to_string();

        debug!("Started WebDriver session {}", id);
        Ok(WebDriverSession {
            client: self.clone(),
            id,
            script_timeout: None,
        })
    }

    /// Send a command and unwrap the `value` member of the reply
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        timeout: Option<Duration>,
    ) -> WebDriverResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!("WebDriver {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .timeout(timeout.unwrap_or(COMMAND_TIMEOUT));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).map_err(|e| {
            WebDriverError::MalformedResponse(format!("{status}: {e}: {}", truncate(&text)))
        })?;

        unwrap_value(status, body)
    }
}

/// An open browser session
pub struct WebDriverSession {
    client: WebDriverClient,
    id: String,
    script_timeout: Option<Duration>,
}

impl WebDriverSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    fn path(&self, suffix: &str) -> String {
        format!("/session/{}{}", self.id, suffix)
    }

    /// Bound script execution time on the browser side
    pub async fn set_script_timeout(&mut self, timeout: Duration) -> WebDriverResult<()> {
        let body = json!({ "script": timeout.as_millis() as u64 });
        self.client
            .command(Method::POST, &self.path("/timeouts"), Some(body), None)
            .await?;
        self.script_timeout = Some(timeout);
        Ok(())
    }

    pub async fn navigate(&self, url: &str) -> WebDriverResult<()> {
        self.client
            .command(
                Method::POST,
                &self.path("/url"),
                Some(json!({ "url": url })),
                None,
            )
            .await?;
        Ok(())
    }

    /// Run `script` in the page with `args`; a returned promise is awaited
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> WebDriverResult<Value> {
        let body = json!({ "script": script, "args": args });
        let request_timeout = self.script_timeout.map(|t| t + SCRIPT_REQUEST_SLACK);
        let secs = self.script_timeout.map(|t| t.as_secs()).unwrap_or_default();

        match self
            .client
            .command(
                Method::POST,
                &self.path("/execute/sync"),
                Some(body),
                request_timeout,
            )
            .await
        {
            Err(WebDriverError::Protocol { error, .. }) if error == "script timeout" => {
                Err(WebDriverError::ScriptTimeout(secs))
            }
            Err(WebDriverError::Http(e)) if e.is_timeout() => {
                Err(WebDriverError::ScriptTimeout(secs))
            }
            other => other,
        }
    }

    /// Browser console entries; not every driver implements this
    pub async fn browser_log(&self) -> WebDriverResult<Vec<LogEntry>> {
        let value = self
            .client
            .command(
                Method::POST,
                &self.path("/se/log"),
                Some(json!({ "type": "browser" })),
                None,
            )
            .await?;
        serde_json::from_value(value).map_err(|e| WebDriverError::MalformedResponse(e.to_string()))
    }

    /// End the session and close the browser
    pub async fn quit(self) -> WebDriverResult<()> {
        self.client
            .command(Method::DELETE, &self.path(""), None, None)
            .await?;
        debug!("Closed WebDriver session {}", self.id);
        Ok(())
    }
}

/// Extract `value` from a WebDriver reply, turning error payloads into errors
fn unwrap_value(status: StatusCode, mut body: Value) -> WebDriverResult<Value> {
    let value = body
        .get_mut("value")
        .map(Value::take)
        .ok_or_else(|| WebDriverError::MalformedResponse(format!("{status}: missing value")))?;

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(WebDriverError::Protocol {
            error: error.to_string(),
            message,
        });
    }

    if !status.is_success() {
        return Err(WebDriverError::Protocol {
            error: status.to_string(),
            message: value.to_string(),
        });
    }

    Ok(value)
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
