//! WebDriver module
//!
//! Remote control of the browser over the W3C WebDriver HTTP protocol.

mod client;

pub use client::{LogEntry, WebDriverClient, WebDriverError, WebDriverResult, WebDriverSession};
