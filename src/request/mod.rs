//! Request URL handling
//!
//! Turns the `REQUESTS` URL list into grouped path tails and an endpoint name.

mod parser;

pub use parser::{parse_requests, resolve_endpoint, RequestMap};
