use std::time::Duration;

use clap::Parser;

use adabridge::als::pool::PoolConfig;
use adabridge::config::{BridgeSettings, log_level_filter};
use adabridge::server::Dispatcher;
use adabridge::AlsPool;

/// Code-intelligence bridge for Ada projects.
///
/// Speaks newline-delimited JSON-RPC tool calls on stdio and drives an
/// Ada language server per project behind the scenes.
#[derive(Parser)]
#[command(name = "adabridge")]
#[command(version)]
#[command(about = "Tool-call bridge to the Ada language server")]
struct Cli {
    /// Maximum number of concurrently pooled language servers
    #[arg(long, default_value_t = 3)]
    max_instances: usize,

    /// Seconds of inactivity before an idle language server is shut down
    #[arg(long, default_value_t = 300)]
    idle_timeout: u64,

    /// Per-request timeout in seconds for language-server calls
    #[arg(long, default_value_t = 30)]
    request_timeout: u64,
}

fn main() {
    let cli = Cli::parse();

    // Logging goes to stderr; stdout carries the JSON-RPC dialect
    let mut builder = env_logger::Builder::from_default_env();
    builder.target(env_logger::Target::Stderr);
    if let Some(level) = log_level_filter() {
        builder.filter_level(level);
    }
    builder.init();

    run_bridge(cli);
}

#[tokio::main]
async fn run_bridge(cli: Cli) {
    let mut settings = BridgeSettings::from_env();
    settings.request_timeout = Some(Duration::from_secs(cli.request_timeout));

    let config = PoolConfig {
        max_instances: cli.max_instances,
        idle_timeout: Duration::from_secs(cli.idle_timeout),
        ..PoolConfig::default()
    };

    let pool = AlsPool::new(settings, config);
    log::info!(target: "adabridge", "bridge starting (max {} language servers)", cli.max_instances);

    let dispatcher = Dispatcher::new(std::sync::Arc::clone(&pool));
    if let Err(e) = dispatcher
        .run(tokio::io::BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
    {
        log::error!(target: "adabridge", "dispatch loop failed: {e}");
    }

    // stdin closed: tear down every pooled language server
    pool.shutdown_all().await;
    log::info!(target: "adabridge", "bridge stopped");
}
