//! Test execution engine
//!
//! Turns a resolved configuration into one remote call and persisted results.

mod harness;
mod invoker;
mod runner;

pub use harness::{Harness, SessionFactory};
pub use invoker::DEFAULT_SCRIPT_TIMEOUT;
