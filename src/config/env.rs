//! Environment variable inputs
//!
//! The interop runner passes the test parameters through the environment.
//! This is the only place the harness reads them.

use std::env;

pub const TESTCASE: &str = "TESTCASE";
pub const REQUESTS: &str = "REQUESTS";
pub const PROTOCOLS: &str = "PROTOCOLS";
pub const CERTHASH: &str = "CERTHASH";

/// Raw values of the harness environment variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// Test case name from TESTCASE
    pub testcase: Option<String>,
    /// Whitespace-separated URLs from REQUESTS
    pub requests: Option<String>,
    /// Offered protocols from PROTOCOLS
    pub protocols: Option<String>,
    /// Server certificate hash from CERTHASH
    pub certhash: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            testcase: env::var(TESTCASE).ok(),
            requests: env::var(REQUESTS).ok(),
            protocols: env::var(PROTOCOLS).ok(),
            certhash: env::var(CERTHASH).ok(),
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment:");
        println!("  {TESTCASE}:  {:?}", self.testcase);
        println!("  {REQUESTS}:  {:?}", self.requests);
        println!("  {PROTOCOLS}: {:?}", self.protocols);
        println!("  {CERTHASH}:  {:?}", self.certhash);
    }
}

/// Builder for setting environment variables in tests
#[cfg(test)]
pub struct EnvBuilder {
    vars: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl EnvBuilder {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn testcase(self, testcase: impl Into<String>) -> Self {
        self.set(TESTCASE, testcase)
    }

    pub fn requests(self, requests: impl Into<String>) -> Self {
        self.set(REQUESTS, requests)
    }

    pub fn protocols(self, protocols: impl Into<String>) -> Self {
        self.set(PROTOCOLS, protocols)
    }

    pub fn certhash(self, certhash: impl Into<String>) -> Self {
        self.set(CERTHASH, certhash)
    }

    /// Ensure a variable is unset
    pub fn unset(mut self, key: &str) -> Self {
        self.vars.push((key.to_string(), None));
        self
    }

    fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.push((key.to_string(), Some(value.into())));
        self
    }

    /// Apply environment variables
    pub fn apply(self) {
        for (key, value) in self.vars {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }

    /// Apply and return guard that restores on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous: Vec<_> = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

#[cfg(test)]
impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that restores environment variables on drop
#[cfg(test)]
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

#[cfg(test)]
impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.iter().rev() {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

/// Print the variables the harness reads
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {TESTCASE}    Test case (handshake, transfer, transfer-*-receive)");
    println!("  {REQUESTS}    Whitespace-separated request URLs");
    println!("  {PROTOCOLS}   Offered protocols, space or comma separated");
    println!("  {CERTHASH}    Base64 SHA-256 hash of the server certificate");
}

#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_config_default() {
        let config = EnvConfig::default();
        assert!(config.testcase.is_none());
        assert!(config.requests.is_none());
    }

    #[test]
    fn test_env_builder() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guard = EnvBuilder::new()
            .testcase("handshake")
            .requests("https://h/files/a")
            .protocols("a b")
            .unset(CERTHASH)
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.testcase.as_deref(), Some("handshake"));
        assert_eq!(config.requests.as_deref(), Some("https://h/files/a"));
        assert_eq!(config.protocols.as_deref(), Some("a b"));
        assert!(config.certhash.is_none());
    }

    #[test]
    fn test_guard_restores() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _outer = EnvBuilder::new().unset(TESTCASE).apply_scoped();
        {
            let _guard = EnvBuilder::new().testcase("transfer").apply_scoped();
            assert_eq!(env::var(TESTCASE).ok().as_deref(), Some("transfer"));
        }
        assert!(env::var(TESTCASE).is_err());
    }
}
