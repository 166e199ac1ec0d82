//! # Offline Resource Cache
//!
//! A cache-first store for the app's static resources, organized in
//! *generations*. A generation is one complete set of resources under a
//! version tag; bumping the tag in the [`Manifest`] is the only way cached
//! content is ever invalidated. There is no revalidation of hits.
//!
//! ## Lifecycle
//!
//! ```text
//! Parsed ──install──▶ Installing ──▶ Installed ──activate──▶ Activating ──▶ Activated
//!                         │
//!                         └── any fetch/store failure ──▶ Redundant
//! ```
//!
//! - **install** fetches every manifest resource first and only then stores
//!   them. One failed fetch, non-success status or failed write deletes the
//!   generation again, so a generation is either complete or absent.
//! - **activate** deletes every generation whose tag differs from the current
//!   one and claims clients.
//! - **fetch** serves the current generation without touching the network
//!   when it can. A miss goes to the network; successful `GET` responses are
//!   copied into the cache best-effort (a failed write is logged, never
//!   surfaced). When the network fails too, the request is unresolved.
//!   Before activation every request passes straight to the network.
//!
//! ## Backends
//!
//! [`CacheStorage`] abstracts where entries live ([`fs::FsCacheStorage`],
//! [`memory::MemCacheStorage`]) and [`Network`] abstracts the transport
//! ([`http::HttpNetwork`], [`memory::StubNetwork`]).
//!
//! The cache shares no state with the organizer document.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod fs;
pub mod http;
pub mod memory;

pub const DEFAULT_CACHE_VERSION: &str = "supporg-cache-v1";

pub const DEFAULT_RESOURCES: [&str; 7] = [
    "./",
    "./index.html",
    "./styles.css",
    "./app.js",
    "./manifest.json",
    "./icons/icon-192.png",
    "./icons/icon-512.png",
];

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Install of {version} failed: {reason}")]
    InstallFailed { version: String, reason: String },

    #[error("Not cached and network unavailable: {0}")]
    Unresolved(String),

    #[error("Cannot {action} while {state}")]
    InvalidState { action: &'static str, state: WorkerState },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Identity of the request inside a generation.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// 2xx.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The resources of one generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub resources: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.to_string(),
            resources: DEFAULT_RESOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Where cached entries live. Every operation names its generation.
pub trait CacheStorage {
    /// Creates the generation if it does not exist yet.
    fn open(&mut self, generation: &str) -> Result<(), CacheError>;

    fn generations(&self) -> Result<Vec<String>, CacheError>;

    /// Removes a whole generation. `Ok(false)` when it did not exist.
    fn delete(&mut self, generation: &str) -> Result<bool, CacheError>;

    fn lookup(&self, generation: &str, request: &Request) -> Result<Option<Response>, CacheError>;

    fn put(
        &mut self,
        generation: &str,
        request: &Request,
        response: &Response,
    ) -> Result<(), CacheError>;

    fn entry_count(&self, generation: &str) -> Result<usize, CacheError>;
}

pub trait Network {
    fn fetch(&self, request: &Request) -> Result<Response, CacheError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

/// Snapshot for `supporg cache status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub state: WorkerState,
    pub version: String,
    /// Every stored generation with its entry count.
    pub generations: Vec<(String, usize)>,
}

pub struct ResourceCache<C: CacheStorage, N: Network> {
    storage: C,
    network: N,
    manifest: Manifest,
    origin: Url,
    state: WorkerState,
    skip_waiting: bool,
    clients_claimed: bool,
}

impl<C: CacheStorage, N: Network> ResourceCache<C, N> {
    /// A cache that has not installed anything yet. Manifest paths are
    /// resolved against `origin`.
    pub fn new(storage: C, network: N, manifest: Manifest, origin: &str) -> Result<Self, CacheError> {
        let origin = Url::parse(origin)
            .map_err(|e| CacheError::Network(format!("invalid origin {}: {}", origin, e)))?;
        Ok(Self {
            storage,
            network,
            manifest,
            origin,
            state: WorkerState::Parsed,
            skip_waiting: false,
            clients_claimed: false,
        })
    }

    /// Picks up the state an earlier process left in storage: a complete
    /// current generation alone is `Activated`; next to older generations it
    /// is `Installed`; otherwise nothing was installed yet. A current
    /// generation missing any manifest entry is deleted.
    pub fn resume(storage: C, network: N, manifest: Manifest, origin: &str) -> Result<Self, CacheError> {
        let mut cache = Self::new(storage, network, manifest, origin)?;
        let mut generations = cache.storage.generations()?;
        if generations.iter().any(|g| *g == cache.manifest.version) && !cache.is_complete()? {
            warn!(version = %cache.manifest.version, "discarding incomplete cache generation");
            cache.storage.delete(&cache.manifest.version)?;
            generations.retain(|g| *g != cache.manifest.version);
        }
        if generations.iter().any(|g| *g == cache.manifest.version) {
            cache.state = if generations.len() == 1 {
                cache.clients_claimed = true;
                WorkerState::Activated
            } else {
                WorkerState::Installed
            };
            cache.skip_waiting = true;
        }
        debug!(state = %cache.state, version = %cache.manifest.version, "resource cache resumed");
        Ok(cache)
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn version(&self) -> &str {
        &self.manifest.version
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    pub fn skip_waiting(&self) -> bool {
        self.skip_waiting
    }

    pub fn storage(&self) -> &C {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut C {
        &mut self.storage
    }

    pub fn into_storage(self) -> C {
        self.storage
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    /// Absolute URL for a manifest path such as `./app.js`.
    pub fn resolve(&self, path: &str) -> Result<String, CacheError> {
        self.origin
            .join(path)
            .map(|u| u.to_string())
            .map_err(|e| CacheError::Network(format!("cannot resolve {}: {}", path, e)))
    }

    /// Whether the current generation holds every manifest resource.
    fn is_complete(&self) -> Result<bool, CacheError> {
        for path in &self.manifest.resources {
            let request = Request::get(self.resolve(path)?);
            if self.storage.lookup(&self.manifest.version, &request)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn require(&self, action: &'static str, allowed: &[WorkerState]) -> Result<(), CacheError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CacheError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    /// Installs the current generation all-or-nothing.
    pub fn install(&mut self) -> Result<(), CacheError> {
        self.require("install", &[WorkerState::Parsed, WorkerState::Redundant])?;
        self.state = WorkerState::Installing;
        info!(
            version = %self.manifest.version,
            resources = self.manifest.resources.len(),
            "installing resource cache"
        );

        match self.fetch_all().and_then(|fetched| self.store_all(&fetched)) {
            Ok(()) => {
                self.state = WorkerState::Installed;
                self.skip_waiting = true;
                info!(version = %self.manifest.version, "resource cache installed");
                Ok(())
            }
            Err(err) => {
                if let Err(cleanup) = self.storage.delete(&self.manifest.version) {
                    warn!(error = %cleanup, "could not remove partial generation");
                }
                self.state = WorkerState::Redundant;
                warn!(version = %self.manifest.version, error = %err, "resource cache install failed");
                Err(CacheError::InstallFailed {
                    version: self.manifest.version.clone(),
                    reason: err.to_string(),
                })
            }
        }
    }

    fn fetch_all(&self) -> Result<Vec<(Request, Response)>, CacheError> {
        let mut fetched = Vec::with_capacity(self.manifest.resources.len());
        for path in &self.manifest.resources {
            let request = Request::get(self.resolve(path)?);
            let response = self.network.fetch(&request)?;
            if !response.is_ok() {
                return Err(CacheError::Network(format!(
                    "{} returned status {}",
                    request.url, response.status
                )));
            }
            fetched.push((request, response));
        }
        Ok(fetched)
    }

    fn store_all(&mut self, fetched: &[(Request, Response)]) -> Result<(), CacheError> {
        self.storage.open(&self.manifest.version)?;
        for (request, response) in fetched {
            self.storage.put(&self.manifest.version, request, response)?;
        }
        Ok(())
    }

    /// Deletes every other generation and claims clients. Returns the
    /// deleted tags.
    pub fn activate(&mut self) -> Result<Vec<String>, CacheError> {
        self.require("activate", &[WorkerState::Installed])?;
        self.state = WorkerState::Activating;

        let mut deleted = Vec::new();
        for generation in self.storage.generations()? {
            if generation != self.manifest.version {
                self.storage.delete(&generation)?;
                info!(generation = %generation, "deleted old cache generation");
                deleted.push(generation);
            }
        }
        self.state = WorkerState::Activated;
        self.clients_claimed = true;
        Ok(deleted)
    }

    /// Install followed by activate.
    pub fn start(&mut self) -> Result<Vec<String>, CacheError> {
        self.install()?;
        self.activate()
    }

    pub fn fetch(&mut self, request: &Request) -> Result<Response, CacheError> {
        if self.state != WorkerState::Activated {
            debug!(url = %request.url, state = %self.state, "cache not active, passing through");
            return self.network.fetch(request);
        }

        match self.storage.lookup(&self.manifest.version, request) {
            Ok(Some(hit)) => {
                debug!(url = %request.url, "cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(err) => {
                warn!(url = %request.url, error = %err, "cache lookup failed, treating as miss");
            }
        }

        match self.network.fetch(request) {
            Ok(response) => {
                if request.is_get() && response.is_ok() {
                    if let Err(err) = self.storage.put(&self.manifest.version, request, &response) {
                        warn!(url = %request.url, error = %err, "could not cache response");
                    }
                }
                Ok(response)
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "network failed on cache miss");
                Err(CacheError::Unresolved(request.url.clone()))
            }
        }
    }

    /// Fetches a manifest-style path relative to the origin.
    pub fn fetch_path(&mut self, path: &str) -> Result<Response, CacheError> {
        let request = Request::get(self.resolve(path)?);
        self.fetch(&request)
    }

    pub fn status(&self) -> Result<CacheStatus, CacheError> {
        let mut generations = Vec::new();
        for generation in self.storage.generations()? {
            let count = self.storage.entry_count(&generation)?;
            generations.push((generation, count));
        }
        Ok(CacheStatus {
            state: self.state,
            version: self.manifest.version.clone(),
            generations,
        })
    }
}
