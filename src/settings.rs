/// User settings, merged over a versioned default table on every read.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::host::TabHost;
use crate::storage::{self, SETTINGS_KEY};

/// Version written with every settings record.
pub const SETTINGS_VERSION: u32 = 2;

/// Version 1 records stored a huge history cap and had `enableSuggestions` removed.
const LEGACY_MAX_HISTORY: usize = 100_000;

const FALLBACK_INACTIVE_MINUTES: f64 = 30.0;
const DAY_MS: f64 = 86_400_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Auto,
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub version: u32,
    pub enable_suggestions: bool,
    pub enable_inactive_suggestion: bool,
    pub inactive_threshold_minutes: f64,
    pub suggest_min_open_tabs_per_domain: usize,
    pub decay_days: u32,
    pub max_history: usize,
    pub track_history: bool,
    pub track_stats: bool,
    pub theme: Theme,
    pub show_tabs_eaten_in_header: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: SETTINGS_VERSION,
            enable_suggestions: true,
            enable_inactive_suggestion: true,
            inactive_threshold_minutes: 60.0,
            suggest_min_open_tabs_per_domain: 1,
            decay_days: 14,
            max_history: 200,
            track_history: true,
            track_stats: true,
            theme: Theme::Auto,
            show_tabs_eaten_in_header: true,
        }
    }
}

impl Settings {
    /// Resolve a stored record (possibly missing, partial or from an older
    /// build) into a complete settings value. Never fails.
    pub fn from_stored(raw: Option<&Value>) -> Settings {
        let Some(Value::Object(map)) = raw else {
            return Settings::default();
        };

        let stored_version = map
            .get("version")
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(1);

        let mut settings = Settings::default().merged(map);
        if stored_version < 2 && settings.max_history == LEGACY_MAX_HISTORY {
            settings.max_history = Settings::default().max_history;
        }
        settings.version = SETTINGS_VERSION;
        settings
    }

    /// Overlay `patch` onto these settings key by key. Unknown keys and values
    /// that do not fit their field are skipped, so stale records keep loading.
    pub fn merged(&self, patch: &Map<String, Value>) -> Settings {
        let mut current = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => return self.clone(),
        };

        for (key, value) in patch {
            if key == "version" {
                continue;
            }
            if !current.contains_key(key) {
                debug!("Ignoring unknown setting {}", key);
                continue;
            }

            let mut candidate = current.clone();
            candidate.insert(key.clone(), value.clone());
            match serde_json::from_value::<Settings>(Value::Object(candidate.clone())) {
                Ok(_) => current = candidate,
                Err(e) => warn!("Ignoring invalid value for setting {}: {}", key, e),
            }
        }

        serde_json::from_value(Value::Object(current)).unwrap_or_else(|_| self.clone())
    }

    pub fn inactive_threshold_ms(&self) -> f64 {
        let minutes = match self.inactive_threshold_minutes {
            m if m == 0.0 || m.is_nan() => FALLBACK_INACTIVE_MINUTES,
            m => m,
        };
        minutes.max(1.0) * 60_000.0
    }

    pub fn decay_ms(&self) -> f64 {
        f64::from(self.decay_days.max(1)) * DAY_MS
    }

    pub fn history_cap(&self) -> usize {
        self.max_history.max(1)
    }

    pub fn min_open_tabs(&self) -> usize {
        self.suggest_min_open_tabs_per_domain.max(1)
    }
}

/// Read the settings record merged with defaults.
pub async fn load<H: TabHost + ?Sized>(host: &H) -> Result<Settings> {
    let raw = storage::load_raw(host, SETTINGS_KEY).await?;
    Ok(Settings::from_stored(raw.as_ref()))
}

/// Apply a partial settings object and persist the full record.
pub async fn update<H: TabHost + ?Sized>(host: &H, patch: &Value) -> Result<Settings> {
    let current = load(host).await?;
    let next = match patch {
        Value::Object(map) => current.merged(map),
        _ => current,
    };
    storage::save(host, SETTINGS_KEY, &next).await?;
    Ok(next)
}
