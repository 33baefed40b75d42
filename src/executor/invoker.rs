//! Remote test invocation
//!
//! Resolves a [`Config`] into one typed call against a page entry point and
//! interprets what comes back.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::models::{FileSet, InvocationResult, ResultError, TestCase};
use crate::webdriver::{LogEntry, WebDriverError, WebDriverResult, WebDriverSession};

/// Browser-side call timeout used by the interop runner
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Something that can call a named function in the test page
#[async_trait]
pub trait ScriptExecutor: Send + Sync {
    /// Call `entry_point(...args)` and return the value its promise resolves with
    async fn call(&self, entry_point: &str, args: Vec<Value>) -> WebDriverResult<Value>;

    /// Browser console entries; not every browser can provide them
    async fn browser_log(&self) -> WebDriverResult<Vec<LogEntry>>;
}

#[async_trait]
impl ScriptExecutor for WebDriverSession {
    async fn call(&self, entry_point: &str, args: Vec<Value>) -> WebDriverResult<Value> {
        let script = format!("return {entry_point}(...arguments);");
        self.execute(&script, args).await
    }

    async fn browser_log(&self) -> WebDriverResult<Vec<LogEntry>> {
        WebDriverSession::browser_log(self).await
    }
}

/// Invocation errors
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("{entry_point} failed: {source}")]
    Remote {
        entry_point: &'static str,
        #[source]
        source: WebDriverError,
    },

    #[error("{entry_point} did not finish within {secs} seconds")]
    Timeout { entry_point: &'static str, secs: u64 },

    #[error("{0} configuration carries no send files")]
    MissingSendFiles(TestCase),

    #[error("Failed to encode call arguments: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Result(#[from] ResultError),
}

/// Test-case specific last argument
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Files the page uploads (transfer)
    Files(&'a FileSet),
    /// Names the page requests (everything else)
    Filenames(&'a [String]),
}

/// A fully resolved call: `entry_point(url, certhash, protocols, payload)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvocationRequest<'a> {
    pub testcase: TestCase,
    pub url: &'a str,
    pub certhash: &'a str,
    pub protocols: &'a [String],
    pub payload: Payload<'a>,
}

impl<'a> InvocationRequest<'a> {
    pub fn from_config(config: &'a Config) -> Result<Self, InvokeError> {
        let payload = match config.testcase {
            TestCase::Transfer => Payload::Files(
                config
                    .files_by_filename
                    .as_ref()
                    .ok_or(InvokeError::MissingSendFiles(config.testcase))?,
            ),
            TestCase::Handshake
            | TestCase::UnidirectionalReceive
            | TestCase::BidirectionalReceive
            | TestCase::DatagramReceive => Payload::Filenames(&config.filenames),
        };

        Ok(Self {
            testcase: config.testcase,
            url: &config.url,
            certhash: &config.certhash,
            protocols: &config.protocols,
            payload,
        })
    }

    pub fn entry_point(&self) -> &'static str {
        self.testcase.entry_point()
    }

    /// Positional arguments in the order the page functions declare them
    pub fn args(&self) -> Result<Vec<Value>, InvokeError> {
        let last = match self.payload {
            Payload::Files(files) => serde_json::to_value(files)?,
            Payload::Filenames(names) => json!(names),
        };
        Ok(vec![
            json!(self.url),
            json!(self.certhash),
            json!(self.protocols),
            last,
        ])
    }
}

/// Runs the configured test case through a [`ScriptExecutor`]
pub struct TestInvoker<'a, E: ScriptExecutor + ?Sized> {
    executor: &'a E,
    timeout: Duration,
}

impl<'a, E: ScriptExecutor + ?Sized> TestInvoker<'a, E> {
    pub fn new(executor: &'a E) -> Self {
        Self {
            executor,
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    /// Upper bound for the call, on top of the executor's own limit
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn invoke(&self, config: &Config) -> Result<InvocationResult, InvokeError> {
        let request = InvocationRequest::from_config(config)?;
        let entry_point = request.entry_point();
        let args = request.args()?;

        info!("Calling {} against {}", entry_point, request.url);
        let start = Instant::now();

        let value = match tokio::time::timeout(self.timeout, self.executor.call(entry_point, args))
            .await
        {
            Ok(Ok(value)) => value,
            Ok(Err(WebDriverError::ScriptTimeout(secs))) => {
                let err = InvokeError::Timeout { entry_point, secs };
                error!("{}", err);
                return Err(err);
            }
            Err(_) => {
                let err = InvokeError::Timeout {
                    entry_point,
                    secs: self.timeout.as_secs(),
                };
                error!("{}", err);
                return Err(err);
            }
            Ok(Err(source)) => {
                error!("{} raised: {}", entry_point, source);
                return Err(InvokeError::Remote {
                    entry_point,
                    source,
                });
            }
        };

        info!(
            "{} returned after {}ms",
            entry_point,
            start.elapsed().as_millis()
        );

        let result = InvocationResult::from_value(config.testcase, value)?;

        if config.testcase != TestCase::Transfer {
            println!(
                "session established, negotiated protocol: {}",
                result.protocol
            );
        }

        Ok(result)
    }
}
