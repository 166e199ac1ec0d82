//! Directory-backed cache storage.
//!
//! ```text
//! <root>/
//! └── <generation>/
//!     ├── <sha256(key)>.json   # request + status + content type
//!     └── <sha256(key)>.body   # raw body bytes
//! ```
//!
//! The body is written before the metadata, and an entry only counts once
//! its metadata exists.

use super::{CacheError, CacheStorage, Request, Response};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const META_EXT: &str = "json";
const BODY_EXT: &str = "body";

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    request: Request,
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

pub struct FsCacheStorage {
    root: PathBuf,
}

fn storage_err(context: &str, err: impl std::fmt::Display) -> CacheError {
    CacheError::Storage(format!("{}: {}", context, err))
}

fn entry_name(request: &Request) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.key().as_bytes());
    hex::encode(hasher.finalize())
}

impl FsCacheStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, generation: &str) -> Result<PathBuf, CacheError> {
        let valid = !generation.is_empty()
            && generation != "."
            && generation != ".."
            && !generation.contains(['/', '\\']);
        if !valid {
            return Err(CacheError::Storage(format!(
                "invalid generation tag: {:?}",
                generation
            )));
        }
        Ok(self.root.join(generation))
    }
}

impl CacheStorage for FsCacheStorage {
    fn open(&mut self, generation: &str) -> Result<(), CacheError> {
        let dir = self.generation_dir(generation)?;
        fs::create_dir_all(&dir).map_err(|e| storage_err("create generation", e))
    }

    fn generations(&self) -> Result<Vec<String>, CacheError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err("list generations", e)),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| storage_err("list generations", e))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&mut self, generation: &str) -> Result<bool, CacheError> {
        let dir = self.generation_dir(generation)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err("delete generation", e)),
        }
    }

    fn lookup(&self, generation: &str, request: &Request) -> Result<Option<Response>, CacheError> {
        let dir = self.generation_dir(generation)?;
        let name = entry_name(request);
        let meta_path = dir.join(format!("{}.{}", name, META_EXT));
        let raw = match fs::read_to_string(&meta_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_err("read entry", e)),
        };
        let meta: EntryMeta = serde_json::from_str(&raw).map_err(|e| storage_err("parse entry", e))?;
        if meta.request != *request {
            return Ok(None);
        }
        let body = fs::read(dir.join(format!("{}.{}", name, BODY_EXT)))
            .map_err(|e| storage_err("read body", e))?;
        Ok(Some(Response {
            status: meta.status,
            content_type: meta.content_type,
            body,
        }))
    }

    fn put(
        &mut self,
        generation: &str,
        request: &Request,
        response: &Response,
    ) -> Result<(), CacheError> {
        let dir = self.generation_dir(generation)?;
        fs::create_dir_all(&dir).map_err(|e| storage_err("create generation", e))?;
        let name = entry_name(request);
        let meta = EntryMeta {
            request: request.clone(),
            status: response.status,
            content_type: response.content_type.clone(),
        };
        let meta_json =
            serde_json::to_string_pretty(&meta).map_err(|e| storage_err("encode entry", e))?;
        fs::write(dir.join(format!("{}.{}", name, BODY_EXT)), &response.body)
            .map_err(|e| storage_err("write body", e))?;
        fs::write(dir.join(format!("{}.{}", name, META_EXT)), meta_json)
            .map_err(|e| storage_err("write entry", e))?;
        Ok(())
    }

    fn entry_count(&self, generation: &str) -> Result<usize, CacheError> {
        let dir = self.generation_dir(generation)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(storage_err("count entries", e)),
        };
        Ok(entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == META_EXT))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::StubNetwork;
    use crate::cache::{Manifest, ResourceCache, WorkerState};
    use crate::test_utils::TestEnv;

    fn storage(env: &TestEnv) -> FsCacheStorage {
        FsCacheStorage::new(env.root.join("cache"))
    }

    #[test]
    fn put_then_lookup() {
        let env = TestEnv::new();
        let mut s = storage(&env);
        let req = Request::get("http://app.test/app.js");
        let resp = Response::new(200, vec![0u8, 159, 146, 150]).with_content_type("text/javascript");

        assert!(s.lookup("v1", &req).unwrap().is_none());
        s.open("v1").unwrap();
        s.put("v1", &req, &resp).unwrap();

        assert_eq!(s.lookup("v1", &req).unwrap(), Some(resp));
        assert_eq!(s.entry_count("v1").unwrap(), 1);
        assert!(s.lookup("v1", &Request::new("HEAD", "http://app.test/app.js")).unwrap().is_none());
    }

    #[test]
    fn generations_are_directories() {
        let env = TestEnv::new();
        let mut s = storage(&env);
        assert!(s.generations().unwrap().is_empty());

        s.open("b").unwrap();
        s.open("a").unwrap();
        assert_eq!(s.generations().unwrap(), vec!["a", "b"]);

        assert!(s.delete("a").unwrap());
        assert!(!s.delete("a").unwrap());
        assert_eq!(s.generations().unwrap(), vec!["b"]);
    }

    #[test]
    fn rejects_path_like_tags() {
        let env = TestEnv::new();
        let mut s = storage(&env);
        assert!(s.open("../escape").is_err());
        assert!(s.open("").is_err());
    }

    #[test]
    fn survives_process_restart() {
        let env = TestEnv::new();
        let net = StubNetwork::new();
        let manifest = Manifest {
            version: "v1".into(),
            resources: vec!["./".into(), "./app.js".into()],
        };
        net.respond("http://app.test/", Response::new(200, "index"));
        net.respond("http://app.test/app.js", Response::new(200, "js"));
        let mut first =
            ResourceCache::new(storage(&env), net, manifest.clone(), "http://app.test/").unwrap();
        first.start().unwrap();

        let offline = StubNetwork::new();
        offline.set_offline(true);
        let mut second =
            ResourceCache::resume(storage(&env), offline, manifest, "http://app.test/").unwrap();
        assert_eq!(second.state(), WorkerState::Activated);
        assert_eq!(second.fetch_path("./app.js").unwrap().body, b"js".to_vec());
    }
}
