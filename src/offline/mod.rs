//! Offline cache controller.
//!
//! Pre-fetches a versioned asset manifest into a named cache, evicts caches
//! left behind by older versions, and answers requests cache-first with a
//! navigation fallback. The cache storage is the only state shared between
//! controller generations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::OfflineConfig;

mod cache;
mod machine;
mod network;

pub use cache::{CacheError, CacheResult, CacheStorage, DirCacheStorage, MemoryCacheStorage};
pub use machine::{
    ControllerEvent, ControllerMachine, ControllerState, ControllerStateError, StateTransition,
};
pub use network::{Network, NetworkError, OfflineNetwork, SiteRootNetwork};

const DEFAULT_CACHE_PREFIX: &str = "scenestealer";
const DEFAULT_VERSION: &str = "v2";
const DEFAULT_NAVIGATION_FALLBACK: &str = "./index.html";
const DEFAULT_ASSETS: [&str; 10] = [
    "./",
    "./index.html",
    "./style.css",
    "./app.js",
    "./export.js",
    "./manifest.webmanifest",
    "./presets/default.json",
    "./presets/minimal.json",
    "./presets/vibrant.json",
    "./presets/linear.json",
];

#[derive(Debug, Error)]
pub enum OfflineError {
    #[error(transparent)]
    State(#[from] ControllerStateError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("failed to pre-cache {} asset(s) into {cache}", failed.len())]
    InstallFailed {
        cache: String,
        failed: Vec<AssetFailure>,
    },
}

pub type OfflineResult<T> = std::result::Result<T, OfflineError>;

/// How installation reacts when the all-or-nothing bulk populate fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PopulationStrategy {
    /// The install fails.
    BulkOnly,
    /// Retry every asset on its own and keep whatever succeeds.
    #[default]
    BulkThenPerAsset,
}

/// The asset list and the version tag that names its cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineManifest {
    pub cache_prefix: String,
    pub version: String,
    pub assets: Vec<String>,
    pub navigation_fallback: String,
    pub strategy: PopulationStrategy,
}

impl Default for OfflineManifest {
    fn default() -> Self {
        Self {
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            version: DEFAULT_VERSION.to_string(),
            assets: DEFAULT_ASSETS.iter().map(|asset| asset.to_string()).collect(),
            navigation_fallback: DEFAULT_NAVIGATION_FALLBACK.to_string(),
            strategy: PopulationStrategy::default(),
        }
    }
}

impl OfflineManifest {
    pub fn from_config(config: &OfflineConfig) -> Self {
        let defaults = Self::default();
        Self {
            cache_prefix: config
                .cache_prefix
                .clone()
                .unwrap_or(defaults.cache_prefix),
            version: config.version.clone().unwrap_or(defaults.version),
            assets: config.assets.clone().unwrap_or(defaults.assets),
            navigation_fallback: config
                .navigation_fallback
                .clone()
                .unwrap_or(defaults.navigation_fallback),
            strategy: config.strategy.unwrap_or(defaults.strategy),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Bumping the version is the only migration path for stale caches.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Subresource,
}

/// A request for a site-relative path. `./`, `/` and bare paths name the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    key: String,
    mode: RequestMode,
}

impl Request {
    pub fn new(path: &str, mode: RequestMode) -> Self {
        Self {
            key: normalize_key(path),
            mode,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(path, RequestMode::Subresource)
    }

    pub fn navigate(path: &str) -> Self {
        Self::new(path, RequestMode::Navigate)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

fn normalize_key(path: &str) -> String {
    let mut key = path.trim();
    loop {
        if let Some(rest) = key.strip_prefix("./") {
            key = rest;
        } else if let Some(rest) = key.strip_prefix('/') {
            key = rest;
        } else {
            break;
        }
    }
    if key == "." {
        key = "";
    }
    key.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub asset: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_name: String,
    pub cached: Vec<String>,
    pub failed: Vec<AssetFailure>,
    pub bulk: bool,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub cache_name: String,
    pub deleted: Vec<String>,
    pub clients_claimed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    Cache,
    Network,
    NavigationFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: FetchSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerStatus {
    pub state: ControllerState,
    pub cache_name: String,
    pub caches: Vec<String>,
    pub cached_entries: usize,
}

/// One controller per cache storage. Requests are intercepted only while
/// the controller is active.
#[derive(Debug)]
pub struct CacheController<C: CacheStorage, N: Network> {
    manifest: OfflineManifest,
    caches: C,
    network: N,
    machine: ControllerMachine,
    clients_claimed: bool,
}

impl<C: CacheStorage, N: Network> CacheController<C, N> {
    pub fn new(manifest: OfflineManifest, caches: C, network: N) -> Self {
        Self {
            manifest,
            caches,
            network,
            machine: ControllerMachine::new(),
            clients_claimed: false,
        }
    }

    pub fn manifest(&self) -> &OfflineManifest {
        &self.manifest
    }

    pub fn state(&self) -> ControllerState {
        self.machine.state()
    }

    pub fn history(&self) -> &[StateTransition] {
        self.machine.history()
    }

    pub fn caches(&self) -> &C {
        &self.caches
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    /// Re-attach to storage that already holds a generation. When the
    /// manifest's own cache is absent but exactly one `<prefix>-<version>`
    /// cache exists, that version is adopted. Returns whether the controller
    /// is now active.
    pub fn resume(&mut self) -> OfflineResult<bool> {
        if self.state() != ControllerState::Uninstalled {
            return Ok(self.state().is_controlling());
        }
        let current = self.manifest.cache_name();
        let name = if self.caches.has(&current)? {
            Some(current)
        } else {
            self.installed_generation()?
        };
        let Some(name) = name else {
            return Ok(false);
        };

        if let Some(version) = name.strip_prefix(&format!("{}-", self.manifest.cache_prefix)) {
            if version != self.manifest.version {
                tracing::info!(
                    configured = %self.manifest.version,
                    installed = version,
                    "adopting installed offline cache version"
                );
                self.manifest.version = version.to_string();
            }
        }
        self.machine.transition(ControllerEvent::Resume)?;
        self.clients_claimed = true;
        tracing::debug!(cache = %name, "resumed offline controller");
        Ok(true)
    }

    fn installed_generation(&self) -> OfflineResult<Option<String>> {
        let prefix = format!("{}-", self.manifest.cache_prefix);
        let mut generations: Vec<String> = self
            .caches
            .keys()?
            .into_iter()
            .filter(|name| name.len() > prefix.len() && name.starts_with(&prefix))
            .collect();
        if generations.len() > 1 {
            tracing::warn!(?generations, "several offline caches installed; not resuming");
            return Ok(None);
        }
        Ok(generations.pop())
    }

    /// Pre-populate the current cache. From `Active` this starts an update.
    pub fn install(&mut self) -> OfflineResult<InstallReport> {
        let event = if self.state() == ControllerState::Active {
            ControllerEvent::BeginUpdate
        } else {
            ControllerEvent::BeginInstall
        };
        self.machine.transition(event)?;

        match self.populate() {
            Ok(report) => Ok(report),
            Err(err) => {
                self.machine.transition(ControllerEvent::InstallFailed)?;
                Err(err)
            }
        }
    }

    fn populate(&mut self) -> OfflineResult<InstallReport> {
        let cache_name = self.manifest.cache_name();
        let existed = self.caches.has(&cache_name)?;
        self.caches.open(&cache_name)?;
        tracing::info!(cache = %cache_name, assets = self.manifest.assets.len(), "installing offline cache");

        match self.fetch_all() {
            Ok(entries) => {
                self.caches.put_all(&cache_name, &entries)?;
                return Ok(InstallReport {
                    cache_name,
                    cached: entries.into_iter().map(|(key, _)| key).collect(),
                    failed: Vec::new(),
                    bulk: true,
                });
            }
            Err(failed) if self.manifest.strategy == PopulationStrategy::BulkOnly => {
                if !existed {
                    self.caches.delete(&cache_name)?;
                }
                tracing::warn!(cache = %cache_name, failed = failed.len(), "bulk pre-cache failed");
                return Err(OfflineError::InstallFailed {
                    cache: cache_name,
                    failed,
                });
            }
            Err(failed) => {
                tracing::warn!(
                    cache = %cache_name,
                    failed = failed.len(),
                    "bulk pre-cache failed; caching assets individually"
                );
            }
        }

        let mut report = InstallReport {
            cache_name: cache_name.clone(),
            cached: Vec::new(),
            failed: Vec::new(),
            bulk: false,
        };
        for asset in &self.manifest.assets {
            let request = Request::get(asset);
            let outcome = fetch_for_cache(&self.network, &request).and_then(|response| {
                self.caches
                    .put(&cache_name, request.key(), &response)
                    .map_err(|err| err.to_string())
            });
            match outcome {
                Ok(()) => report.cached.push(request.key().to_string()),
                Err(reason) => {
                    tracing::warn!(asset = %asset, %reason, "asset left uncached");
                    report.failed.push(AssetFailure {
                        asset: asset.clone(),
                        reason,
                    });
                }
            }
        }
        Ok(report)
    }

    fn fetch_all(&self) -> Result<Vec<(String, Response)>, Vec<AssetFailure>> {
        let mut entries = Vec::with_capacity(self.manifest.assets.len());
        let mut failed = Vec::new();
        for asset in &self.manifest.assets {
            let request = Request::get(asset);
            match fetch_for_cache(&self.network, &request) {
                Ok(response) => entries.push((request.key().to_string(), response)),
                Err(reason) => failed.push(AssetFailure {
                    asset: asset.clone(),
                    reason,
                }),
            }
        }
        if failed.is_empty() {
            Ok(entries)
        } else {
            Err(failed)
        }
    }

    /// Evict every cache not named after the current version, then take
    /// control of clients.
    pub fn activate(&mut self) -> OfflineResult<ActivateReport> {
        self.ensure_can(ControllerEvent::Activate)?;

        let current = self.manifest.cache_name();
        let mut deleted = Vec::new();
        for name in self.caches.keys()? {
            if name != current && self.caches.delete(&name)? {
                tracing::info!(cache = %name, "deleted stale offline cache");
                deleted.push(name);
            }
        }

        self.machine.transition(ControllerEvent::Activate)?;
        self.clients_claimed = true;
        Ok(ActivateReport {
            cache_name: current,
            deleted,
            clients_claimed: self.clients_claimed,
        })
    }

    /// Install then activate immediately, without waiting for old clients.
    pub fn install_and_activate(&mut self) -> OfflineResult<(InstallReport, ActivateReport)> {
        let installed = self.install()?;
        let activated = self.activate()?;
        Ok((installed, activated))
    }

    /// Move an active controller to a new manifest. On failure the previous
    /// manifest stays in effect.
    pub fn update(
        &mut self,
        manifest: OfflineManifest,
    ) -> OfflineResult<(InstallReport, ActivateReport)> {
        self.ensure_can(ControllerEvent::BeginUpdate)?;
        let previous = std::mem::replace(&mut self.manifest, manifest);
        match self.install_and_activate() {
            Ok(reports) => Ok(reports),
            Err(err) => {
                self.manifest = previous;
                Err(err)
            }
        }
    }

    /// Cache first, then network, then the cached navigation fallback.
    pub fn fetch(&self, request: &Request) -> OfflineResult<FetchOutcome> {
        if !self.state().is_controlling() {
            let response = self.network.fetch(request)?;
            return Ok(FetchOutcome {
                response,
                source: FetchSource::Network,
            });
        }

        if let Some(response) = self.caches.match_any(request.key())? {
            return Ok(FetchOutcome {
                response,
                source: FetchSource::Cache,
            });
        }

        match self.network.fetch(request) {
            Ok(response) => Ok(FetchOutcome {
                response,
                source: FetchSource::Network,
            }),
            Err(err) if request.is_navigation() => {
                let fallback = Request::get(&self.manifest.navigation_fallback);
                match self.caches.match_any(fallback.key())? {
                    Some(response) => {
                        tracing::debug!(key = request.key(), %err, "serving cached navigation fallback");
                        Ok(FetchOutcome {
                            response,
                            source: FetchSource::NavigationFallback,
                        })
                    }
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    fn ensure_can(&self, event: ControllerEvent) -> OfflineResult<()> {
        if self.machine.can_transition(event) {
            return Ok(());
        }
        tracing::warn!(from = ?self.state(), event = ?event, "controller operation rejected");
        Err(ControllerStateError::InvalidTransition {
            from: self.state(),
            event,
        }
        .into())
    }

    pub fn status(&self) -> OfflineResult<ControllerStatus> {
        let cache_name = self.manifest.cache_name();
        let caches = self.caches.keys()?;
        let cached_entries = if caches.contains(&cache_name) {
            self.caches.entries(&cache_name)?.len()
        } else {
            0
        };
        Ok(ControllerStatus {
            state: self.state(),
            cache_name,
            caches,
            cached_entries,
        })
    }
}

fn fetch_for_cache<N: Network>(network: &N, request: &Request) -> Result<Response, String> {
    match network.fetch(request) {
        Ok(response) if response.is_ok() => Ok(response),
        Ok(response) => Err(format!("status {}", response.status)),
        Err(err) => Err(err.to_string()),
    }
}
