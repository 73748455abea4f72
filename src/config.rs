//! Bridge configuration.
//!
//! Runtime behavior is driven by environment variables plus a few CLI
//! flags; there is no config file. `BridgeSettings` captures the
//! environment once at startup so the rest of the core never reads env
//! vars mid-request.

use std::path::PathBuf;
use std::time::Duration;

use crate::als::client::DEFAULT_REQUEST_TIMEOUT;

/// Environment variable forcing a specific project root.
pub const PROJECT_ROOT_ENV: &str = "ADA_PROJECT_ROOT";

/// Environment variable controlling log verbosity
/// (`DEBUG|INFO|WARNING|ERROR`).
pub const LOG_LEVEL_ENV: &str = "ADA_BRIDGE_LOG_LEVEL";

/// Static settings resolved at bridge start.
#[derive(Debug, Clone, Default)]
pub struct BridgeSettings {
    /// Language-server executable override (`LS_PATH`)
    pub ls_path: Option<PathBuf>,
    /// Forced project root (`ADA_PROJECT_ROOT`); when set, incoming file
    /// paths never influence project selection
    pub project_root: Option<PathBuf>,
    /// Project definition file relative to the project root
    /// (`ADA_PROJECT_FILE`)
    pub project_file: Option<PathBuf>,
    /// Per-request timeout for language-server calls
    pub request_timeout: Option<Duration>,
}

impl BridgeSettings {
    /// Capture the relevant environment variables.
    pub fn from_env() -> Self {
        Self {
            ls_path: std::env::var_os(crate::als::bootstrap::LS_PATH_ENV).map(PathBuf::from),
            project_root: std::env::var_os(PROJECT_ROOT_ENV).map(PathBuf::from),
            project_file: std::env::var_os(crate::als::bootstrap::PROJECT_FILE_ENV)
                .map(PathBuf::from),
            request_timeout: None,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Map the bridge's log-level variable to a `log` filter.
///
/// Unknown values keep env_logger's own default so `RUST_LOG` still works.
pub fn log_level_filter() -> Option<log::LevelFilter> {
    let level = std::env::var(LOG_LEVEL_ENV).ok()?;
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => Some(log::LevelFilter::Debug),
        "INFO" => Some(log::LevelFilter::Info),
        "WARNING" => Some(log::LevelFilter::Warn),
        "ERROR" => Some(log::LevelFilter::Error),
        other => {
            eprintln!("unknown {LOG_LEVEL_ENV} value '{other}', ignoring");
            None
        }
    }
}
