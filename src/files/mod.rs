//! Local file access for send test cases

mod loader;

pub use loader::{load_files, DEFAULT_WWW_ROOT};
