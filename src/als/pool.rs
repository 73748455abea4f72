//! Pool of language-server instances keyed by project root.
//!
//! The pool owns every live language server in the bridge. Lookups reuse a
//! healthy instance, replace a dead one, and evict the least-recently-used
//! entry at capacity. A background reaper shuts down instances idle past
//! their timeout and terminates itself once the pool is empty.
//!
//! `get` operations are serialized on the pool mutex; translator work runs
//! outside it so long requests never block other projects.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::als::bootstrap::{BootstrapOptions, start_als};
use crate::als::client::AlsClient;
use crate::als::monitor::{ClientSlot, HealthMonitor, MonitorConfig, new_client_slot};
use crate::config::BridgeSettings;
use crate::error::BridgeResult;
use crate::project::find_project_root;

/// Pool tuning knobs.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_instances: usize,
    pub idle_timeout: Duration,
    /// Pause after inserting a fresh instance so first-query results are not
    /// issued against an empty index
    pub index_grace: Duration,
    /// Pause inside bootstrap after opening the project file
    pub indexing_wait: Duration,
    pub reaper_interval: Duration,
    pub monitor: MonitorConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_instances: 3,
            idle_timeout: Duration::from_secs(300),
            index_grace: Duration::from_secs(1),
            indexing_wait: Duration::from_millis(500),
            reaper_interval: Duration::from_secs(60),
            monitor: MonitorConfig::default(),
        }
    }
}

/// One pooled language server.
///
/// The current client lives behind an `ArcSwap` so the health monitor can
/// replace it atomically while translators keep their own `Arc` to the
/// dying client (whose requests fail with connection-lost).
pub struct AlsInstance {
    client: ClientSlot,
    monitor: Arc<HealthMonitor>,
    project_root: PathBuf,
    last_used: StdMutex<Instant>,
    /// Serializes instance teardown against restart swaps
    lock: tokio::sync::Mutex<()>,
}

impl AlsInstance {
    /// The instance's current client.
    pub fn client(&self) -> Arc<AlsClient> {
        self.client.load_full()
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn touch(&self) {
        *lock(&self.last_used) = Instant::now();
    }

    fn last_used(&self) -> Instant {
        *lock(&self.last_used)
    }
}

type InstanceMap = Arc<tokio::sync::Mutex<HashMap<PathBuf, Arc<AlsInstance>>>>;

/// Map of live language-server instances keyed by project root.
pub struct AlsPool {
    instances: InstanceMap,
    settings: BridgeSettings,
    config: PoolConfig,
    reaper: StdMutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl AlsPool {
    pub fn new(settings: BridgeSettings, config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            instances: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            settings,
            config,
            reaper: StdMutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Get a client for the project owning `file_path`.
    ///
    /// Project selection: configured root override, then marker detection
    /// over the file path, then the process working directory. Creates and
    /// caches an instance when none is live; a bootstrap failure is
    /// propagated and nothing is cached.
    pub async fn get(&self, file_path: Option<&Path>) -> BridgeResult<Arc<AlsClient>> {
        let project_root = self.resolve_project_root(file_path)?;

        let mut instances = self.instances.lock().await;

        if let Some(instance) = instances.get(&project_root) {
            let client = instance.client();
            if client.is_alive().await {
                instance.touch();
                log::debug!(
                    target: "adabridge::als::pool",
                    "reusing instance for {}",
                    project_root.display()
                );
                return Ok(client);
            }
            log::warn!(
                target: "adabridge::als::pool",
                "instance for {} is dead, replacing",
                project_root.display()
            );
            if let Some(dead) = instances.remove(&project_root) {
                shutdown_instance(&dead).await;
            }
        }

        if instances.len() >= self.config.max_instances {
            self.evict_lru(&mut instances).await;
        }

        let mut bootstrap = BootstrapOptions::new(project_root.clone());
        bootstrap.ls_path = self.settings.ls_path.clone();
        bootstrap.project_file = self
            .settings
            .project_file
            .as_ref()
            .map(|file| project_root.join(file));
        bootstrap.request_timeout = self.settings.request_timeout();
        bootstrap.indexing_wait = self.config.indexing_wait;

        let client = start_als(&bootstrap).await?;

        let slot = new_client_slot(Arc::clone(&client));
        let monitor = HealthMonitor::start(
            bootstrap,
            Arc::clone(&slot),
            self.config.monitor.clone(),
            None,
        );

        let instance = Arc::new(AlsInstance {
            client: slot,
            monitor,
            project_root: project_root.clone(),
            last_used: StdMutex::new(Instant::now()),
            lock: tokio::sync::Mutex::new(()),
        });
        instances.insert(project_root.clone(), instance);
        log::info!(
            target: "adabridge::als::pool",
            "instance created for {} ({} active)",
            project_root.display(),
            instances.len()
        );

        self.ensure_reaper();
        drop(instances);

        // Let indexing progress before the first real query
        tokio::time::sleep(self.config.index_grace).await;
        Ok(client)
    }

    fn resolve_project_root(&self, file_path: Option<&Path>) -> BridgeResult<PathBuf> {
        if let Some(root) = &self.settings.project_root {
            return Ok(root.clone());
        }
        if let Some(path) = file_path {
            return Ok(find_project_root(path));
        }
        Ok(std::env::current_dir()?)
    }

    /// Evict the least-recently-used instance with a full shutdown.
    async fn evict_lru(&self, instances: &mut HashMap<PathBuf, Arc<AlsInstance>>) {
        let Some(oldest) = instances
            .iter()
            .min_by_key(|(_, instance)| instance.last_used())
            .map(|(root, _)| root.clone())
        else {
            return;
        };

        if let Some(instance) = instances.remove(&oldest) {
            log::info!(
                target: "adabridge::als::pool",
                "evicting least-recently-used instance for {}",
                oldest.display()
            );
            shutdown_instance(&instance).await;
        }
    }

    /// Start the idle reaper if it is not already running.
    fn ensure_reaper(&self) {
        let mut reaper = lock(&self.reaper);
        if reaper.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let instances = Arc::clone(&self.instances);
        let idle_timeout = self.config.idle_timeout;
        let interval = self.config.reaper_interval;
        let cancel = self.cancel.clone();
        *reaper = Some(tokio::spawn(reaper_loop(
            instances,
            idle_timeout,
            interval,
            cancel,
        )));
    }

    /// Shut down every instance and stop the reaper.
    pub async fn shutdown_all(&self) {
        self.cancel.cancel();
        if let Some(handle) = lock(&self.reaper).take() {
            handle.abort();
        }

        let mut instances = self.instances.lock().await;
        for (root, instance) in instances.drain() {
            log::info!(target: "adabridge::als::pool", "shutting down instance for {}", root.display());
            shutdown_instance(&instance).await;
        }
    }

    /// Pool occupancy snapshot.
    pub async fn stats(&self) -> Value {
        let instances = self.instances.lock().await;
        let mut projects: Vec<String> = instances
            .keys()
            .map(|root| root.display().to_string())
            .collect();
        projects.sort();
        json!({
            "active_instances": instances.len(),
            "max_instances": self.config.max_instances,
            "projects": projects,
        })
    }

    /// Number of live entries (for tests and stats).
    pub async fn len(&self) -> usize {
        self.instances.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.instances.lock().await.is_empty()
    }

    /// Look up the pooled instance for a project root, if any.
    pub async fn instance_for(&self, project_root: &Path) -> Option<Arc<AlsInstance>> {
        self.instances.lock().await.get(project_root).cloned()
    }
}

/// Reap instances idle past their timeout; exits when the pool drains.
async fn reaper_loop(
    instances: InstanceMap,
    idle_timeout: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        let mut instances = instances.lock().await;
        let now = Instant::now();
        let expired: Vec<PathBuf> = instances
            .iter()
            .filter(|(_, instance)| now.duration_since(instance.last_used()) > idle_timeout)
            .map(|(root, _)| root.clone())
            .collect();

        for root in expired {
            if let Some(instance) = instances.remove(&root) {
                log::info!(
                    target: "adabridge::als::pool",
                    "reaping idle instance for {}",
                    root.display()
                );
                shutdown_instance(&instance).await;
            }
        }

        if instances.is_empty() {
            log::debug!(target: "adabridge::als::pool", "pool empty, reaper exiting");
            return;
        }
    }
}

/// Full teardown of one instance: monitor first so the death is not treated
/// as a crash, then the LSP goodbye, then the two-stage process kill.
async fn shutdown_instance(instance: &Arc<AlsInstance>) {
    instance.monitor.stop();
    let _guard = instance.lock.lock().await;
    let client = instance.client();
    client.shutdown().await;
    client.terminate().await;
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
