//! Results module
//!
//! Persists invocation results and verifies downloads against served files.

mod compare;
mod storage;

pub use compare::verify_downloads;
pub use storage::{ResultPersister, DEFAULT_DOWNLOADS_ROOT};
