use crate::api::OrganizerApi;
use crate::cache::fs::FsCacheStorage;
use crate::config::SupporgConfig;
use crate::error::{Result, SupporgError};
use crate::model::today;
use crate::store::fs::FileStore;
use crate::weather::WeatherCache;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "SUPPORG_DATA";

const CACHE_DIRNAME: &str = "cache";

pub struct SupporgContext {
    pub api: OrganizerApi<FileStore>,
    pub config: SupporgConfig,
    pub data_dir: PathBuf,
}

impl SupporgContext {
    pub fn cache_storage(&self) -> FsCacheStorage {
        FsCacheStorage::new(self.data_dir.join(CACHE_DIRNAME))
    }

    pub fn weather(&self) -> WeatherCache {
        WeatherCache::load(&self.data_dir, &self.config.default_city)
    }
}

/// `$SUPPORG_DATA` when set and non-empty, else the platform data dir.
pub fn resolve_data_dir(env_override: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = env_override.map(str::trim).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    ProjectDirs::from("com", "supporg", "supporg")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| SupporgError::Store("Could not determine data dir".to_string()))
}

pub fn initialize(data_dir: &Path) -> SupporgContext {
    let config = SupporgConfig::load(data_dir).unwrap_or_else(|err| {
        warn!(error = %err, "config unreadable, using defaults");
        SupporgConfig::default()
    });
    debug!(data_dir = %data_dir.display(), "opening organizer");

    let store = FileStore::new(data_dir.to_path_buf());
    let api = OrganizerApi::open(store, &config.default_slots, today());

    SupporgContext {
        api,
        config,
        data_dir: data_dir.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use std::fs;

    #[test]
    fn env_override_wins() {
        assert_eq!(
            resolve_data_dir(Some("/tmp/supporg-x")).unwrap(),
            PathBuf::from("/tmp/supporg-x")
        );
    }

    #[test]
    fn blank_override_falls_back_to_platform_dir() {
        if let Ok(dir) = resolve_data_dir(Some("  ")) {
            assert!(dir.is_absolute());
        }
    }

    #[test]
    fn initialize_uses_configured_default_slots() {
        let env = TestEnv::new();
        fs::write(
            env.root.join("config.json"),
            r#"{"default_slots":["Breakfast","Dinner"]}"#,
        )
        .unwrap();

        let ctx = initialize(&env.root);
        let names: Vec<_> = ctx
            .api
            .document()
            .slots()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["Breakfast", "Dinner"]);
        assert_eq!(ctx.cache_storage().root(), env.root.join("cache"));
    }

    #[test]
    fn unreadable_config_falls_back_to_defaults() {
        let env = TestEnv::new();
        fs::write(env.root.join("config.json"), "nope").unwrap();
        let ctx = initialize(&env.root);
        assert_eq!(ctx.config, SupporgConfig::default());
        assert_eq!(ctx.weather().city(), "Toronto");
    }
}
