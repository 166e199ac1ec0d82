use crate::cache::Manifest;
use crate::error::{Result, SupporgError};
use crate::model::DEFAULT_SLOT_NAMES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";

pub const DEFAULT_CITY: &str = "Toronto";
pub const DEFAULT_CACHE_ORIGIN: &str = "http://localhost:8080/";

/// Configuration for supporg, stored in `<data dir>/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupporgConfig {
    /// Slots created for a fresh (or slotless) document.
    #[serde(default = "default_slots")]
    pub default_slots: Vec<String>,

    /// Base URL the resource cache resolves manifest paths against.
    #[serde(default = "default_cache_origin")]
    pub cache_origin: String,

    /// Current cache generation tag. Bumping it invalidates every older one.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Resource paths fetched on install.
    #[serde(default = "default_cache_manifest")]
    pub cache_manifest: Vec<String>,

    #[serde(default = "default_city")]
    pub default_city: String,
}

fn default_slots() -> Vec<String> {
    DEFAULT_SLOT_NAMES.iter().map(|s| s.to_string()).collect()
}

fn default_cache_origin() -> String {
    DEFAULT_CACHE_ORIGIN.to_string()
}

fn default_cache_version() -> String {
    Manifest::default().version
}

fn default_cache_manifest() -> Vec<String> {
    Manifest::default().resources
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

impl Default for SupporgConfig {
    fn default() -> Self {
        Self {
            default_slots: default_slots(),
            cache_origin: default_cache_origin(),
            cache_version: default_cache_version(),
            cache_manifest: default_cache_manifest(),
            default_city: default_city(),
        }
    }
}

impl SupporgConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(SupporgError::Io)?;
        let config: SupporgConfig =
            serde_json::from_str(&content).map_err(SupporgError::Serialization)?;
        Ok(config)
    }

    /// Save config to the given directory
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).map_err(SupporgError::Io)?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);
        let content = serde_json::to_string_pretty(self).map_err(SupporgError::Serialization)?;
        fs::write(config_path, content).map_err(SupporgError::Io)?;
        Ok(())
    }

    /// The cache manifest described by this config.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            version: self.cache_version.clone(),
            resources: self.cache_manifest.clone(),
        }
    }

    /// Sets one key from its string form. Used by `supporg config <key> <value>`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let list = || -> Vec<String> {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };
        if value.is_empty() && self.entries().iter().any(|(k, _)| *k == key) {
            return Err(SupporgError::validation(format!("{} cannot be empty.", key)));
        }
        match key {
            "default_slots" => self.default_slots = list(),
            "cache_origin" => self.cache_origin = value.to_string(),
            "cache_version" => self.cache_version = value.to_string(),
            "cache_manifest" => self.cache_manifest = list(),
            "default_city" => self.default_city = value.to_string(),
            other => {
                return Err(SupporgError::validation(format!(
                    "Unknown config key: {}",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Every key with its string form, in a stable order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("default_slots", self.default_slots.join(", ")),
            ("cache_origin", self.cache_origin.clone()),
            ("cache_version", self.cache_version.clone()),
            ("cache_manifest", self.cache_manifest.join(", ")),
            ("default_city", self.default_city.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_default_config() {
        let config = SupporgConfig::default();
        assert_eq!(config.default_slots.len(), 4);
        assert_eq!(config.cache_version, "supporg-cache-v1");
        assert_eq!(config.default_city, "Toronto");
    }

    #[test]
    fn test_load_missing_config() {
        let env = TestEnv::new();
        let config = SupporgConfig::load(&env.root).unwrap();
        assert_eq!(config, SupporgConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let env = TestEnv::new();
        let mut config = SupporgConfig::default();
        config.set("default_city", "Lisbon").unwrap();
        config.save(env.root.join("nested")).unwrap();

        let loaded = SupporgConfig::load(env.root.join("nested")).unwrap();
        assert_eq!(loaded.default_city, "Lisbon");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let env = TestEnv::new();
        fs::write(env.root.join(CONFIG_FILENAME), r#"{"cache_version":"v9"}"#).unwrap();
        let config = SupporgConfig::load(&env.root).unwrap();
        assert_eq!(config.cache_version, "v9");
        assert_eq!(config.manifest().version, "v9");
        assert_eq!(config.cache_manifest, Manifest::default().resources);
    }

    #[test]
    fn test_set_lists_and_unknown_keys() {
        let mut config = SupporgConfig::default();
        config.set("default_slots", "Dawn, , Dusk").unwrap();
        assert_eq!(config.default_slots, vec!["Dawn", "Dusk"]);
        assert!(config.set("colour", "red").is_err());
        assert!(config.set("cache_origin", " ").is_err());
    }
}
