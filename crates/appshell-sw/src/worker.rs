//! Worker lifecycle: install, activate, and event dispatch.
//!
//! The host drives the worker by awaiting [`AppShellWorker::install`] and
//! [`AppShellWorker::activate`]; each returned future settles only when the
//! whole handler chain has, which is what makes the corresponding lifecycle
//! event "handled".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use appshell_common::{AppShellError, Result};
use appshell_net::{FetchRequest, NetworkFetch};
use futures::future;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::CacheStorage;
use crate::clients::{Client, Clients};
use crate::fetch::{FetchInterceptor, FetchOutcome};

/// Unique identifier for a worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WorkerState {
    /// Initial state, nothing cached yet.
    #[default]
    Parsed,
    /// Install event in flight.
    Installing,
    /// Shell cached; eligible for immediate activation.
    Installed,
    /// Activate event in flight.
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Install failed or version superseded.
    Redundant,
}

impl WorkerState {
    /// Check if active.
    pub fn is_active(&self) -> bool {
        *self == WorkerState::Activated
    }

    /// Check if redundant.
    pub fn is_redundant(&self) -> bool {
        *self == WorkerState::Redundant
    }
}

/// Worker configuration, injected at construction so distinct instances
/// (and tests) never share a cache generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// The worker's own origin; only requests sharing it are intercepted.
    pub origin: Url,

    /// Cache version name. Exactly one store is current at a time; every
    /// other store found at activation is stale.
    pub cache_name: String,

    /// Asset paths pre-cached at install time, resolved against `origin`.
    pub manifest: Vec<String>,
}

impl WorkerConfig {
    /// Create a validated configuration.
    pub fn new(
        origin: Url,
        cache_name: impl Into<String>,
        manifest: Vec<String>,
    ) -> Result<Self> {
        let cache_name = cache_name.into();
        if origin.cannot_be_a_base() {
            return Err(AppShellError::config(format!(
                "origin {origin} cannot be a base URL"
            )));
        }
        if cache_name.is_empty() {
            return Err(AppShellError::config("cache name must not be empty"));
        }

        Ok(Self {
            origin,
            cache_name,
            manifest,
        })
    }
}

/// Worker lifecycle and cache events.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// State changed.
    StateChange {
        worker: WorkerId,
        old_state: WorkerState,
        new_state: WorkerState,
    },
    /// A stale cache generation was deleted.
    CachePurged { name: String },
    /// Existing clients were claimed.
    ControllerChange { claimed: usize },
}

/// The offline app-shell worker.
pub struct AppShellWorker {
    id: WorkerId,
    config: WorkerConfig,
    state: RwLock<WorkerState>,
    caches: Arc<RwLock<CacheStorage>>,
    clients: Arc<RwLock<Clients>>,
    fetcher: Arc<dyn NetworkFetch>,
    interceptor: FetchInterceptor,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
}

impl AppShellWorker {
    /// Create a worker and the receiving end of its event stream.
    pub fn new(
        config: WorkerConfig,
        fetcher: Arc<dyn NetworkFetch>,
    ) -> (Self, mpsc::UnboundedReceiver<WorkerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let caches = Arc::new(RwLock::new(CacheStorage::new()));
        let clients = Arc::new(RwLock::new(Clients::new()));
        let interceptor = FetchInterceptor::new(
            config.origin.clone(),
            config.cache_name.clone(),
            Arc::clone(&caches),
            Arc::clone(&fetcher),
        );

        (
            Self {
                id: WorkerId::new(),
                config,
                state: RwLock::new(WorkerState::Parsed),
                caches,
                clients,
                fetcher,
                interceptor,
                event_tx,
            },
            event_rx,
        )
    }

    /// Worker ID.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Worker configuration.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Shared cache storage, for host inspection.
    pub fn caches(&self) -> Arc<RwLock<CacheStorage>> {
        Arc::clone(&self.caches)
    }

    /// Register an open page with the worker.
    pub async fn register_client(&self, client: Client) {
        self.clients.write().await.add(client);
    }

    /// Remove a page (closed by the user).
    pub async fn remove_client(&self, id: &str) -> Option<Client> {
        self.clients.write().await.remove(id)
    }

    /// Snapshot of a registered client.
    pub async fn client(&self, id: &str) -> Option<Client> {
        self.clients.read().await.get(id).cloned()
    }

    async fn set_state(&self, new_state: WorkerState) {
        let old_state = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, new_state)
        };
        debug!(worker = ?self.id, ?old_state, ?new_state, "state change");
        let _ = self.event_tx.send(WorkerEvent::StateChange {
            worker: self.id,
            old_state,
            new_state,
        });
    }

    async fn ensure_state(&self, expected: WorkerState, event: &str) -> Result<()> {
        let state = *self.state.read().await;
        if state != expected {
            return Err(AppShellError::lifecycle(format!(
                "{event} dispatched in state {state:?}"
            )));
        }
        Ok(())
    }

    /// Install: cache the whole app shell, then request immediate activation
    /// instead of waiting for existing pages to release control.
    pub async fn install(&self) -> Result<()> {
        self.ensure_state(WorkerState::Parsed, "install").await?;
        self.set_state(WorkerState::Installing).await;
        info!(
            cache = %self.config.cache_name,
            assets = self.config.manifest.len(),
            "installing"
        );

        match self.populate_shell().await {
            Ok(cached) => {
                info!(cache = %self.config.cache_name, cached, "app shell cached, skipping waiting");
                self.set_state(WorkerState::Installed).await;
                Ok(())
            }
            Err(e) => {
                error!(cache = %self.config.cache_name, error = %e, "install failed");
                self.set_state(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    /// Fetch every manifest asset as one batch, then commit the batch only
    /// if every fetch succeeded.
    async fn populate_shell(&self) -> Result<usize> {
        let mut requests = Vec::with_capacity(self.config.manifest.len());
        for path in &self.config.manifest {
            let url = self.config.origin.join(path).map_err(|e| {
                AppShellError::InvalidArgument(format!("manifest entry {path:?}: {e}"))
            })?;
            requests.push(FetchRequest::get(url));
        }

        let results = future::join_all(requests.iter().map(|r| self.fetcher.fetch(r))).await;

        let mut fetched = Vec::with_capacity(requests.len());
        for (request, result) in requests.iter().zip(results) {
            match result {
                Ok(response) => fetched.push((request, response)),
                Err(e) => {
                    warn!(url = %request.url, error = %e, "shell asset fetch failed");
                    return Err(AppShellError::network_with_source(
                        format!("failed to cache {}", request.url),
                        e,
                    ));
                }
            }
        }

        let mut caches = self.caches.write().await;
        let cache = caches.open(&self.config.cache_name);
        for (request, response) in &fetched {
            cache.put(request, response);
        }
        Ok(fetched.len())
    }

    /// Activate: purge every stale cache generation, then claim open pages.
    pub async fn activate(&self) -> Result<()> {
        self.ensure_state(WorkerState::Installed, "activate").await?;
        self.set_state(WorkerState::Activating).await;

        let stale: Vec<String> = {
            let caches = self.caches.read().await;
            caches
                .keys()
                .into_iter()
                .filter(|name| name != &self.config.cache_name)
                .collect()
        };

        // Deletions are best-effort and unordered; claiming waits for all.
        let deletions = stale.iter().map(|name| async move {
            let deleted = self.caches.write().await.delete(name);
            (name, deleted)
        });
        for (name, deleted) in future::join_all(deletions).await {
            if deleted {
                info!(cache = %name, "deleted stale cache");
                let _ = self
                    .event_tx
                    .send(WorkerEvent::CachePurged { name: name.clone() });
            } else {
                warn!(cache = %name, "stale cache already gone");
            }
        }

        let claimed = self.clients.write().await.claim();
        if claimed > 0 {
            info!(claimed, "claimed open clients");
        }
        let _ = self.event_tx.send(WorkerEvent::ControllerChange { claimed });

        self.set_state(WorkerState::Activated).await;
        Ok(())
    }

    /// Run install then activate as one lifecycle chain.
    pub async fn start(&self) -> Result<()> {
        self.install().await?;
        self.activate().await
    }

    /// Intercept one request from a controlled page.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> FetchOutcome {
        self.interceptor.intercept(request).await
    }
}
