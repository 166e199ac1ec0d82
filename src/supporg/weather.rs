//! # Weather Snapshot
//!
//! Current conditions come from an external provider that is not part of
//! this crate; [`WeatherProvider`] is the seam it plugs into. What lives here
//! is the local side: the last successful snapshot and the chosen city,
//! kept in `weather.json` so something can be shown while offline.
//!
//! The snapshot file is best-effort in both directions. An unreadable file
//! loads as empty and a failed write is logged, never surfaced.
//!
//! ## Extension Point
//!
//! No provider ships with supporg, so the CLI only reads the saved snapshot
//! and city. A client that has a provider implements [`WeatherProvider`] and
//! calls [`WeatherCache::refresh`]; the returned [`WeatherReport`] carries
//! the snapshot to show and [`WeatherReport::status_line`] its caption.

use crate::config::DEFAULT_CITY;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const WEATHER_FILENAME: &str = "weather.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub city_label: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    /// km/h
    #[serde(default)]
    pub wind: Option<f64>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    pub fn description(&self) -> String {
        match self.code {
            Some(code) => weather_code_text(code),
            None => "—".to_string(),
        }
    }

    pub fn temperature_label(&self) -> String {
        match self.temperature {
            Some(t) => format!("{}°", t),
            None => "—°".to_string(),
        }
    }

    /// "Updated 12 min ago • Wind: 9.4 km/h"
    pub fn updated_label(&self, now: DateTime<Utc>) -> String {
        let mins = ((now - self.fetched_at).num_seconds() as f64 / 60.0).round() as i64;
        let wind = self
            .wind
            .map(|w| w.to_string())
            .unwrap_or_else(|| "—".to_string());
        format!("Updated {} min ago • Wind: {} km/h", mins, wind)
    }
}

pub fn weather_code_text(code: i64) -> String {
    let text = match code {
        0 => "Clear",
        1 => "Mostly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Drizzle",
        55 => "Heavy drizzle",
        61 => "Light rain",
        63 => "Rain",
        65 => "Heavy rain",
        71 => "Light snow",
        73 => "Snow",
        75 => "Heavy snow",
        80 => "Light showers",
        81 => "Showers",
        82 => "Violent showers",
        95 => "Thunderstorm",
        other => return format!("Weather code {}", other),
    };
    text.to_string()
}

/// Source of current conditions for a city.
pub trait WeatherProvider {
    fn current(&self, city: &str) -> Result<WeatherSnapshot, String>;
}

/// Outcome of [`WeatherCache::refresh`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub snapshot: Option<WeatherSnapshot>,
    /// True when the provider failed and `snapshot` (if any) is the saved one.
    pub stale: bool,
}

impl WeatherReport {
    pub fn status_line(&self, now: DateTime<Utc>) -> String {
        match (&self.snapshot, self.stale) {
            (Some(s), false) => s.updated_label(now),
            (Some(_), true) => "Offline / failed to update • showing last saved weather".to_string(),
            (None, _) => "Offline / failed to update • no saved weather yet".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct WeatherFile {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    snapshot: Option<WeatherSnapshot>,
}

/// The saved city and last snapshot, backed by `weather.json`.
pub struct WeatherCache {
    path: PathBuf,
    file: WeatherFile,
    default_city: String,
}

impl WeatherCache {
    pub fn load<P: AsRef<Path>>(dir: P, default_city: &str) -> Self {
        let path = dir.as_ref().join(WEATHER_FILENAME);
        let file = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "ignoring unreadable weather cache");
                WeatherFile::default()
            }),
            Err(_) => WeatherFile::default(),
        };
        let default_city = match default_city.trim() {
            "" => DEFAULT_CITY.to_string(),
            city => city.to_string(),
        };
        Self {
            path,
            file,
            default_city,
        }
    }

    pub fn city(&self) -> &str {
        self.file.city.as_deref().unwrap_or(&self.default_city)
    }

    pub fn set_city(&mut self, city: &str) {
        let city = city.trim();
        self.file.city = if city.is_empty() {
            None
        } else {
            Some(city.to_string())
        };
        self.persist();
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.file.snapshot.as_ref()
    }

    /// Asks the provider for the saved city. On success the snapshot is
    /// saved; on failure the last saved one is reported as stale.
    pub fn refresh<P: WeatherProvider>(&mut self, provider: &P) -> WeatherReport {
        let city = self.city().to_string();
        match provider.current(&city) {
            Ok(snapshot) => {
                self.file.snapshot = Some(snapshot.clone());
                self.persist();
                WeatherReport {
                    snapshot: Some(snapshot),
                    stale: false,
                }
            }
            Err(err) => {
                debug!(city = %city, error = %err, "weather update failed, using saved snapshot");
                WeatherReport {
                    snapshot: self.file.snapshot.clone(),
                    stale: true,
                }
            }
        }
    }

    fn persist(&self) {
        let result = serde_json::to_string_pretty(&self.file)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                if let Some(dir) = self.path.parent() {
                    fs::create_dir_all(dir).map_err(|e| e.to_string())?;
                }
                fs::write(&self.path, json).map_err(|e| e.to_string())
            });
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "could not save weather cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use chrono::{Duration, TimeZone};

    struct Fixed(Option<WeatherSnapshot>);

    impl WeatherProvider for Fixed {
        fn current(&self, _city: &str) -> Result<WeatherSnapshot, String> {
            self.0.clone().ok_or_else(|| "offline".to_string())
        }
    }

    fn snapshot(at: DateTime<Utc>) -> WeatherSnapshot {
        WeatherSnapshot {
            city_label: "Toronto, Ontario, Canada".into(),
            temperature: Some(4.5),
            wind: Some(12.0),
            code: Some(61),
            fetched_at: at,
        }
    }

    #[test]
    fn weather_codes_map_to_text() {
        assert_eq!(weather_code_text(0), "Clear");
        assert_eq!(weather_code_text(48), "Depositing rime fog");
        assert_eq!(weather_code_text(82), "Violent showers");
        assert_eq!(weather_code_text(7), "Weather code 7");
    }

    #[test]
    fn updated_label_rounds_minutes() {
        let now = Utc::now();
        let s = snapshot(now - Duration::seconds(150));
        assert_eq!(s.updated_label(now), "Updated 3 min ago • Wind: 12 km/h");
        assert_eq!(s.description(), "Light rain");
    }

    #[test]
    fn city_defaults_then_persists() {
        let env = TestEnv::new();
        let mut cache = WeatherCache::load(&env.root, "Toronto");
        assert_eq!(cache.city(), "Toronto");
        cache.set_city(" Halifax ");

        let reloaded = WeatherCache::load(&env.root, "Toronto");
        assert_eq!(reloaded.city(), "Halifax");
    }

    #[test]
    fn refresh_saves_snapshot_and_falls_back_when_offline() {
        let env = TestEnv::new();
        let mut cache = WeatherCache::load(&env.root, "Toronto");

        let report = cache.refresh(&Fixed(None));
        assert!(report.stale);
        assert!(report.snapshot.is_none());
        assert!(report.status_line(Utc::now()).contains("no saved weather yet"));

        // Millisecond precision, as stored on disk.
        let now = Utc.timestamp_millis_opt(Utc::now().timestamp_millis()).unwrap();
        let fresh = snapshot(now);
        assert!(!cache.refresh(&Fixed(Some(fresh.clone()))).stale);

        let mut reloaded = WeatherCache::load(&env.root, "Toronto");
        let report = reloaded.refresh(&Fixed(None));
        assert!(report.stale);
        assert_eq!(report.snapshot, Some(fresh));
        assert!(report.status_line(Utc::now()).contains("showing last saved weather"));
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let env = TestEnv::new();
        fs::write(env.root.join(WEATHER_FILENAME), "not json").unwrap();
        let cache = WeatherCache::load(&env.root, "");
        assert!(cache.snapshot().is_none());
        assert_eq!(cache.city(), "Toronto");
    }
}
