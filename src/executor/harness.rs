//! Run orchestration
//!
//! One run resolves the configuration, opens a browser session, invokes the
//! test case, dumps the console log and closes the session again.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use super::invoker::{ScriptExecutor, DEFAULT_SCRIPT_TIMEOUT};
use super::runner::TestRunner;
use crate::config::{Config, EnvConfig, EXIT_FAILURE};
use crate::results::ResultPersister;

/// Opens and closes the browser sessions a run needs
#[async_trait]
pub trait SessionFactory: Send {
    type Session: ScriptExecutor;

    /// Start a browser with the test page loaded
    async fn open(&mut self) -> Result<Self::Session>;

    /// End `session`; must return even if the browser does not
    async fn close(&mut self, session: Self::Session);
}

/// Drives one test case from environment to exit code
pub struct Harness {
    www_root: PathBuf,
    persister: ResultPersister,
    timeout: Duration,
}

impl Harness {
    pub fn new(www_root: impl Into<PathBuf>, persister: ResultPersister) -> Self {
        Self {
            www_root: www_root.into(),
            persister,
            timeout: DEFAULT_SCRIPT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the test case described by `vars` and return the process exit code.
    ///
    /// Configuration errors are reported before `factory` is asked for a
    /// session.
    pub async fn run<F: SessionFactory>(&self, vars: &EnvConfig, factory: &mut F) -> i32 {
        let config = match Config::resolve(vars, &self.www_root) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return e.exit_code();
            }
        };

        let session = match factory.open().await {
            Ok(session) => session,
            Err(e) => {
                error!("{:#}", e);
                return EXIT_FAILURE;
            }
        };

        let code = match TestRunner::new(&config, self.persister.clone())
            .with_timeout(self.timeout)
            .run(&session)
            .await
        {
            Ok(outcome) => {
                info!(
                    "{} passed, negotiated protocol {:?}, {} file(s) written",
                    config.testcase,
                    outcome.result.protocol,
                    outcome.written.len()
                );
                0
            }
            Err(e) => {
                error!("{:#}", e);
                EXIT_FAILURE
            }
        };

        dump_console_log(&session).await;
        factory.close(session).await;
        code
    }
}

/// Log the browser console; a missing log endpoint never changes the outcome
async fn dump_console_log<E: ScriptExecutor + ?Sized>(session: &E) {
    match session.browser_log().await {
        Ok(entries) => {
            for entry in entries {
                info!(
                    "[browser {} {}] {}",
                    entry.level, entry.timestamp, entry.message
                );
            }
        }
        Err(e) => debug!("Browser console log unavailable: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EXIT_UNSUPPORTED;
    use crate::executor::invoker::fake::FakeExecutor;
    use crate::webdriver::{LogEntry, WebDriverError};
    use anyhow::Context;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    /// Hands out one prepared session and records the lifecycle calls
    struct FakeSessions {
        session: Option<FakeExecutor>,
        opened: usize,
        closed: Vec<FakeExecutor>,
    }

    impl FakeSessions {
        fn with(session: FakeExecutor) -> Self {
            Self {
                session: Some(session),
                opened: 0,
                closed: Vec::new(),
            }
        }

        fn unavailable() -> Self {
            Self {
                session: None,
                opened: 0,
                closed: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SessionFactory for FakeSessions {
        type Session = FakeExecutor;

        async fn open(&mut self) -> Result<FakeExecutor> {
            self.opened += 1;
            self.session.take().context("browser failed to start")
        }

        async fn close(&mut self, session: FakeExecutor) {
            self.closed.push(session);
        }
    }

    fn env(testcase: &str, requests: &str) -> EnvConfig {
        EnvConfig {
            testcase: Some(testcase.to_string()),
            requests: Some(requests.to_string()),
            protocols: Some("moq-00".to_string()),
            certhash: Some("hash".to_string()),
        }
    }

    #[tokio::test]
    async fn test_unsupported_testcase_exits_before_launch() {
        let www = tempdir().unwrap();
        let downloads = tempdir().unwrap();
        let mut sessions = FakeSessions::with(FakeExecutor::returning(json!({ "protocol": "p" })));

        let code = Harness::new(www.path(), ResultPersister::new(downloads.path()))
            .run(&env("zerortt", ""), &mut sessions)
            .await;

        assert_eq!(code, EXIT_UNSUPPORTED);
        assert_eq!(sessions.opened, 0);
    }

    #[tokio::test]
    async fn test_config_error_exits_before_launch() {
        let www = tempdir().unwrap();
        let downloads = tempdir().unwrap();
        let mut sessions = FakeSessions::with(FakeExecutor::returning(json!({ "protocol": "p" })));

        let code = Harness::new(www.path(), ResultPersister::new(downloads.path()))
            .run(
                &env("transfer-datagram-receive", "https://h/"),
                &mut sessions,
            )
            .await;

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(sessions.opened, 0);
    }

    #[tokio::test]
    async fn test_missing_console_log_keeps_success() {
        let www = tempdir().unwrap();
        let downloads = tempdir().unwrap();
        let mut sessions = FakeSessions::with(FakeExecutor::returning(json!({ "protocol": "moq-00" })));

        let code = Harness::new(www.path(), ResultPersister::new(downloads.path()))
            .run(&env("handshake", "https://h/files/a"), &mut sessions)
            .await;

        assert_eq!(code, 0);
        assert_eq!(sessions.closed.len(), 1);
        assert_eq!(
            fs::read_to_string(downloads.path().join("negotiated_protocol.txt")).unwrap(),
            "moq-00"
        );
    }

    #[tokio::test]
    async fn test_console_log_read_after_call() {
        let www = tempdir().unwrap();
        let downloads = tempdir().unwrap();
        let executor = FakeExecutor::returning(json!({ "protocol": "moq-00" })).with_log(vec![
            LogEntry {
                level: "INFO".to_string(),
                message: "session ready".to_string(),
                timestamp: 1,
            },
        ]);
        let mut sessions = FakeSessions::with(executor);

        let code = Harness::new(www.path(), ResultPersister::new(downloads.path()))
            .run(&env("handshake", "https://h/files/a"), &mut sessions)
            .await;

        assert_eq!(code, 0);
        assert_eq!(sessions.closed[0].recorded()[0].0, "runHandshake");
    }

    #[tokio::test]
    async fn test_failed_call_still_closes_session() {
        let www = tempdir().unwrap();
        let downloads = tempdir().unwrap();
        let mut sessions = FakeSessions::with(FakeExecutor::failing(WebDriverError::Protocol {
            error: "javascript error".to_string(),
            message: "connection refused".to_string(),
        }));

        let code = Harness::new(www.path(), ResultPersister::new(downloads.path()))
            .run(
                &env("transfer-unidirectional-receive", "https://h/files/a"),
                &mut sessions,
            )
            .await;

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(sessions.closed.len(), 1);
        assert!(!downloads.path().join("negotiated_protocol.txt").exists());
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let www = tempdir().unwrap();
        let downloads = tempdir().unwrap();
        let mut sessions = FakeSessions::unavailable();

        let code = Harness::new(www.path(), ResultPersister::new(downloads.path()))
            .run(&env("handshake", "https://h/files/a"), &mut sessions)
            .await;

        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(sessions.opened, 1);
        assert!(sessions.closed.is_empty());
    }
}
