pub mod als;
pub mod config;
pub mod error;
pub mod project;
pub mod server;
pub mod tools;
pub mod utils;

// Re-export the types most callers need
pub use als::client::AlsClient;
pub use als::pool::{AlsPool, PoolConfig};
pub use config::BridgeSettings;
pub use error::{BridgeError, BridgeResult};
pub use server::dispatcher::Dispatcher;
