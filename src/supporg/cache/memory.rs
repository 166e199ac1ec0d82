use super::{CacheError, CacheStorage, Network, Request, Response};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

/// In-memory cache storage for testing.
#[derive(Default)]
pub struct MemCacheStorage {
    generations: BTreeMap<String, BTreeMap<String, Response>>,
    /// Puts left before writes start failing. `None` never fails.
    writes_left: Option<usize>,
}

impl MemCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more puts succeed, then fail every following one.
    pub fn fail_writes_after(&mut self, n: usize) {
        self.writes_left = Some(n);
    }
}

impl CacheStorage for MemCacheStorage {
    fn open(&mut self, generation: &str) -> Result<(), CacheError> {
        self.generations.entry(generation.to_string()).or_default();
        Ok(())
    }

    fn generations(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.generations.keys().cloned().collect())
    }

    fn delete(&mut self, generation: &str) -> Result<bool, CacheError> {
        Ok(self.generations.remove(generation).is_some())
    }

    fn lookup(&self, generation: &str, request: &Request) -> Result<Option<Response>, CacheError> {
        Ok(self
            .generations
            .get(generation)
            .and_then(|entries| entries.get(&request.key()))
            .cloned())
    }

    fn put(
        &mut self,
        generation: &str,
        request: &Request,
        response: &Response,
    ) -> Result<(), CacheError> {
        if let Some(left) = self.writes_left.as_mut() {
            if *left == 0 {
                return Err(CacheError::Storage("simulated write failure".to_string()));
            }
            *left -= 1;
        }
        self.generations
            .entry(generation.to_string())
            .or_default()
            .insert(request.key(), response.clone());
        Ok(())
    }

    fn entry_count(&self, generation: &str) -> Result<usize, CacheError> {
        Ok(self.generations.get(generation).map_or(0, BTreeMap::len))
    }
}

/// Scripted network: answers from a url table and counts calls.
///
/// Takes `&self` everywhere so tests can re-script it after handing it to a
/// cache.
#[derive(Default)]
pub struct StubNetwork {
    responses: RefCell<HashMap<String, Response>>,
    offline: Cell<bool>,
    calls: Cell<usize>,
}

impl StubNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: Response) {
        self.responses.borrow_mut().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Number of fetches attempted so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Network for StubNetwork {
    fn fetch(&self, request: &Request) -> Result<Response, CacheError> {
        self.calls.set(self.calls.get() + 1);
        if self.offline.get() {
            return Err(CacheError::Network("offline".to_string()));
        }
        self.responses
            .borrow()
            .get(&request.url)
            .cloned()
            .ok_or_else(|| CacheError::Network(format!("no route to {}", request.url)))
    }
}
