//! Test execution runner
//!
//! Drives one test case from resolved config to persisted results.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::invoker::{ScriptExecutor, TestInvoker, DEFAULT_SCRIPT_TIMEOUT};
use crate::config::Config;
use crate::models::InvocationResult;
use crate::results::ResultPersister;

/// What a completed run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub result: InvocationResult,
    pub written: Vec<PathBuf>,
}

/// Runs a test case against a browser session and persists the outcome
pub struct TestRunner<'a> {
    config: &'a Config,
    persister: ResultPersister,
    timeout: Duration,
}

impl<'a> TestRunner<'a> {
    pub fn new(config: &'a Config, persister: ResultPersister) -> Self {
        Self {
            config,
            persister,
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Invoke the page entry point and write the results.
    ///
    /// Nothing is written unless the call succeeded and its result is valid.
    pub async fn run<E: ScriptExecutor + ?Sized>(&self, executor: &E) -> Result<RunOutcome> {
        info!("Running {}", self.config.testcase);

        let result = TestInvoker::new(executor)
            .with_timeout(self.timeout)
            .invoke(self.config)
            .await
            .with_context(|| format!("{} test failed", self.config.testcase))?;

        let written = self.persister.persist(&result, self.config)?;
        info!(
            "Wrote {} result file(s) under {}",
            written.len(),
            self.persister.output_root().display()
        );

        Ok(RunOutcome { result, written })
    }
}
