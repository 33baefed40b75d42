//! Browser launch module
//!
//! Starts the WebDriver executable and opens sessions in the browser it drives.

mod launcher;
mod session;

pub use launcher::{BrowserKind, LaunchOptions};
pub use session::BrowserSessions;
