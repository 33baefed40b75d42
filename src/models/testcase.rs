//! Interop test case definitions
//!
//! Each test case selects a page entry point and an expected result shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five interop scenarios the browser client takes part in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestCase {
    Handshake,
    Transfer,
    #[serde(rename = "transfer-unidirectional-receive")]
    UnidirectionalReceive,
    #[serde(rename = "transfer-bidirectional-receive")]
    BidirectionalReceive,
    #[serde(rename = "transfer-datagram-receive")]
    DatagramReceive,
}

impl TestCase {
    /// Name as used in the `TESTCASE` variable
    pub fn name(&self) -> &'static str {
        match self {
            TestCase::Handshake => "handshake",
            TestCase::Transfer => "transfer",
            TestCase::UnidirectionalReceive => "transfer-unidirectional-receive",
            TestCase::BidirectionalReceive => "transfer-bidirectional-receive",
            TestCase::DatagramReceive => "transfer-datagram-receive",
        }
    }

    /// Function the test page exposes for this scenario
    pub fn entry_point(&self) -> &'static str {
        match self {
            TestCase::Handshake => "runHandshake",
            TestCase::Transfer => "runTransfer",
            TestCase::UnidirectionalReceive => "runTransferUnidirectional",
            TestCase::BidirectionalReceive => "runTransferBidirectional",
            TestCase::DatagramReceive => "runTransferDatagram",
        }
    }

    /// Whether the browser returns downloaded files for this scenario
    pub fn is_receive(&self) -> bool {
        matches!(
            self,
            TestCase::UnidirectionalReceive
                | TestCase::BidirectionalReceive
                | TestCase::DatagramReceive
        )
    }

    /// Whether the scenario needs an endpoint resolved from the requests
    pub fn requires_endpoint(&self) -> bool {
        !matches!(self, TestCase::Handshake)
    }

    pub fn all() -> Vec<TestCase> {
        vec![
            TestCase::Handshake,
            TestCase::Transfer,
            TestCase::UnidirectionalReceive,
            TestCase::BidirectionalReceive,
            TestCase::DatagramReceive,
        ]
    }

    /// Parse from a `TESTCASE` value (exact match)
    pub fn from_name(s: &str) -> Option<TestCase> {
        TestCase::all().into_iter().find(|tc| tc.name() == s)
    }

    /// Comma-separated list of known names, for error messages
    pub fn known_names() -> String {
        TestCase::all()
            .iter()
            .map(|tc| tc.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(TestCase::from_name("handshake"), Some(TestCase::Handshake));
        assert_eq!(
            TestCase::from_name("transfer-datagram-receive"),
            Some(TestCase::DatagramReceive)
        );
        assert_eq!(TestCase::from_name("Handshake"), None);
        assert_eq!(TestCase::from_name(""), None);
        assert_eq!(TestCase::from_name("chacha20"), None);
    }

    #[test]
    fn test_entry_points() {
        assert_eq!(TestCase::Handshake.entry_point(), "runHandshake");
        assert_eq!(TestCase::Transfer.entry_point(), "runTransfer");
        assert_eq!(
            TestCase::UnidirectionalReceive.entry_point(),
            "runTransferUnidirectional"
        );
        assert_eq!(
            TestCase::BidirectionalReceive.entry_point(),
            "runTransferBidirectional"
        );
        assert_eq!(TestCase::DatagramReceive.entry_point(), "runTransferDatagram");
    }

    #[test]
    fn test_receive_variants() {
        let receive: Vec<_> = TestCase::all()
            .into_iter()
            .filter(|tc| tc.is_receive())
            .collect();
        assert_eq!(receive.len(), 3);
        assert!(!TestCase::Transfer.is_receive());
        assert!(TestCase::Transfer.requires_endpoint());
        assert!(!TestCase::Handshake.requires_endpoint());
    }

    #[test]
    fn test_serde_names_match() {
        for tc in TestCase::all() {
            let json = serde_json::to_string(&tc).unwrap();
            assert_eq!(json, format!("\"{}\"", tc.name()));
        }
    }
}
