//! Tool-dispatch boundary.
//!
//! The bridge is driven over newline-delimited JSON-RPC on stdio: the
//! client lists the registered tools, then invokes them by name. The
//! dispatcher stays thin: argument unpacking and envelope handling
//! only; all behavior lives in the translators and the pool.

pub mod catalog;
pub mod dispatcher;

pub use dispatcher::Dispatcher;
