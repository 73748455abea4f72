//! Language-server supervision layer.
//!
//! Everything that talks to the Ada language server lives here: the framed
//! codec, the async client, bootstrap and handshake, health monitoring, and
//! the instance pool.

pub mod bootstrap;
pub mod client;
pub mod framing;
pub mod monitor;
pub mod pool;
pub mod types;
