//! Health monitoring and automatic restart for a language-server instance.
//!
//! A monitor polls its client's liveness in the background. When the
//! subprocess dies without a requested shutdown, the monitor re-bootstraps
//! it with exponential backoff and swaps the new client into the shared
//! slot. After too many attempts it gives up until `reset()` is called.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::als::bootstrap::{BootstrapOptions, start_als};
use crate::als::client::AlsClient;

/// Observable monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Watching a live client
    Monitoring,
    /// Crash observed, restart not yet attempted
    Crashed,
    /// Sleeping out the backoff or bootstrapping a replacement
    Restarting,
    /// Restart budget exhausted; only `reset()` re-arms the monitor
    GivenUp,
    /// `stop()` was called; terminal
    Stopped,
}

/// Tuning knobs for the monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub max_restart_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
    /// After a restart, how long the client must stay alive before the
    /// restart counter is zeroed
    pub stable_reset_interval: Duration,
    /// Liveness poll cadence
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_restart_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            stable_reset_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Callback invoked with each replacement client.
pub type RestartCallback = Box<dyn Fn(&Arc<AlsClient>) + Send + Sync>;

/// Shared slot holding an instance's current client.
///
/// Translators load the client through this indirection; the monitor
/// stores replacements into it atomically.
pub type ClientSlot = Arc<ArcSwap<AlsClient>>;

/// Create the slot for a freshly bootstrapped client.
pub fn new_client_slot(client: Arc<AlsClient>) -> ClientSlot {
    Arc::new(ArcSwap::new(client))
}

/// Background watcher that restarts a dead language server.
pub struct HealthMonitor {
    state: StdMutex<MonitorState>,
    restart_count: AtomicU32,
    cancel: CancellationToken,
    reset_notify: tokio::sync::Notify,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Start monitoring the client held in `slot`.
    ///
    /// The slot is the single source of truth for the instance's current
    /// client: storing a replacement there *is* the restart swap, and
    /// translators picking up the old `Arc` see their in-flight requests
    /// fail with a connection-lost error rather than being re-sent.
    pub fn start(
        bootstrap: BootstrapOptions,
        slot: Arc<ArcSwap<AlsClient>>,
        config: MonitorConfig,
        on_restart: Option<RestartCallback>,
    ) -> Arc<Self> {
        let monitor = Arc::new(Self {
            state: StdMutex::new(MonitorState::Monitoring),
            restart_count: AtomicU32::new(0),
            cancel: CancellationToken::new(),
            reset_notify: tokio::sync::Notify::new(),
            task: StdMutex::new(None),
        });

        let handle = tokio::spawn(Arc::clone(&monitor).run(bootstrap, slot, config, on_restart));
        *monitor.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        monitor
    }

    /// Stop monitoring; the monitor never restarts anything afterwards.
    pub fn stop(&self) {
        self.set_state(MonitorState::Stopped);
        self.cancel.cancel();
    }

    /// Zero the restart counter and re-arm a given-up monitor.
    pub fn reset(&self) {
        self.restart_count.store(0, Ordering::SeqCst);
        self.reset_notify.notify_one();
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> MonitorState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: MonitorState) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // Stopped is terminal
        if *guard != MonitorState::Stopped {
            *guard = state;
        }
    }

    async fn run(
        self: Arc<Self>,
        bootstrap: BootstrapOptions,
        slot: Arc<ArcSwap<AlsClient>>,
        config: MonitorConfig,
        on_restart: Option<RestartCallback>,
    ) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(config.poll_interval) => {}
            }

            let client = slot.load_full();
            if client.is_alive().await {
                continue;
            }
            if client.shutdown_was_requested() {
                log::debug!(target: "adabridge::als::monitor", "client shut down on request, monitor exiting");
                return;
            }

            self.set_state(MonitorState::Crashed);
            log::warn!(
                target: "adabridge::als::monitor",
                "language server for {} exited unexpectedly",
                bootstrap.project_root.display()
            );

            if !Self::restart_until_alive(&self, &bootstrap, &slot, &config, &on_restart).await {
                return;
            }
        }
    }

    /// Drive restart attempts until one sticks or the budget runs out.
    ///
    /// Returns false when the monitor should exit (cancellation).
    async fn restart_until_alive(
        this: &Arc<Self>,
        bootstrap: &BootstrapOptions,
        slot: &Arc<ArcSwap<AlsClient>>,
        config: &MonitorConfig,
        on_restart: &Option<RestartCallback>,
    ) -> bool {
        loop {
            let attempts = this.restart_count();
            if attempts >= config.max_restart_attempts {
                this.set_state(MonitorState::GivenUp);
                log::error!(
                    target: "adabridge::als::monitor",
                    "giving up on {} after {attempts} restart attempts",
                    bootstrap.project_root.display()
                );
                tokio::select! {
                    _ = this.cancel.cancelled() => return false,
                    _ = this.reset_notify.notified() => {
                        this.set_state(MonitorState::Monitoring);
                        continue;
                    }
                }
            }

            let delay = backoff_delay(config, attempts);
            this.set_state(MonitorState::Restarting);
            log::info!(
                target: "adabridge::als::monitor",
                "restarting in {:.1}s (attempt {})",
                delay.as_secs_f64(),
                attempts + 1
            );
            tokio::select! {
                _ = this.cancel.cancelled() => return false,
                _ = tokio::time::sleep(delay) => {}
            }

            this.restart_count.fetch_add(1, Ordering::SeqCst);
            match start_als(bootstrap).await {
                Ok(new_client) => {
                    slot.store(Arc::clone(&new_client));
                    if let Some(callback) = on_restart {
                        callback(&new_client);
                    }
                    this.set_state(MonitorState::Monitoring);
                    log::info!(
                        target: "adabridge::als::monitor",
                        "language server restarted for {}",
                        bootstrap.project_root.display()
                    );
                    Self::schedule_stable_reset(this, slot, config);
                    return true;
                }
                Err(e) => {
                    log::warn!(target: "adabridge::als::monitor", "restart attempt failed: {e}");
                }
            }
        }
    }

    /// After a stable interval of liveness, forget past restarts.
    fn schedule_stable_reset(this: &Arc<Self>, slot: &Arc<ArcSwap<AlsClient>>, config: &MonitorConfig) {
        let monitor = Arc::clone(this);
        let slot = Arc::clone(slot);
        let interval = config.stable_reset_interval;
        tokio::spawn(async move {
            tokio::select! {
                _ = monitor.cancel.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            if slot.load_full().is_alive().await {
                monitor.restart_count.store(0, Ordering::SeqCst);
                log::debug!(target: "adabridge::als::monitor", "client stable, restart counter cleared");
            }
        });
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

/// Exponential backoff: `min(initial · multiplier^attempt, max)`.
fn backoff_delay(config: &MonitorConfig, attempt: u32) -> Duration {
    let raw = config.initial_backoff.as_secs_f64() * config.backoff_multiplier.powi(attempt as i32);
    Duration::from_secs_f64(raw.min(config.max_backoff.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_sequence_doubles_then_caps() {
        let config = MonitorConfig {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            ..MonitorConfig::default()
        };
        let expected = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 60.0, 60.0];
        for (attempt, seconds) in expected.iter().enumerate() {
            assert_eq!(
                backoff_delay(&config, attempt as u32).as_secs_f64(),
                *seconds,
                "attempt {attempt}"
            );
        }
    }

    #[test]
    fn backoff_respects_custom_multiplier() {
        let config = MonitorConfig {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
            backoff_multiplier: 3.0,
            ..MonitorConfig::default()
        };
        assert_eq!(backoff_delay(&config, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(&config, 1), Duration::from_millis(300));
        assert_eq!(backoff_delay(&config, 2), Duration::from_millis(900));
        assert_eq!(backoff_delay(&config, 3), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn stop_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let mut bootstrap = BootstrapOptions::new(dir.path());
        bootstrap.ls_path = Some("cat".into());
        bootstrap.indexing_wait = Duration::ZERO;

        let client = start_als(&bootstrap).await.unwrap();
        let slot = Arc::new(ArcSwap::new(Arc::clone(&client)));
        let monitor = HealthMonitor::start(
            bootstrap,
            Arc::clone(&slot),
            MonitorConfig {
                poll_interval: Duration::from_millis(20),
                ..MonitorConfig::default()
            },
            None,
        );

        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Stopped);

        // A crash after stop() must not trigger a restart
        client.terminate().await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert_eq!(monitor.restart_count(), 0);

        client.shutdown().await;
    }
}
