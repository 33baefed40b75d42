//! Data models for the interop harness
//!
//! Test cases, file payloads and invocation results shared across modules.

mod files;
mod result;
mod testcase;

pub use files::FileSet;
pub use result::{InvocationResult, ResultError};
pub use testcase::TestCase;
