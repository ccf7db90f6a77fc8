//! Runtime configuration: API endpoints from the environment and per-route
//! heatmap settings from a JSON file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use reqwest::Url;
use serde::Deserialize;

use crate::error::{CompareError, Result};
use crate::model::RouteId;
use crate::points::Direction;
use crate::window::SiteClock;

pub const DEFAULT_API_URL: &str = "https://api.iteris-clearguide.com/v1/";
pub const DEFAULT_AUTH_URL: &str = "https://auth.iteris-clearguide.com/token";
pub const DEFAULT_CUSTOMER_KEY: &str = "ut";
pub const DEFAULT_TIMEZONE: &str = "America/Denver";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upstream endpoints and site settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: Url,
    pub auth_url: Url,
    pub customer_key: String,
    pub site_clock: SiteClock,
    pub timeout: Duration,
}

impl Config {
    /// Reads `CG_API_URL`, `CG_AUTH_URL`, `CG_CUSTOMER_KEY`, `SITE_TIMEZONE`
    /// and `CG_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let mut api = get("CG_API_URL", DEFAULT_API_URL);
        // Endpoint paths are joined onto the base, which needs a trailing slash.
        if !api.ends_with('/') {
            api.push('/');
        }
        let api_base_url = Url::parse(&api)
            .map_err(|e| CompareError::Config(format!("CG_API_URL '{api}': {e}")))?;

        let auth = get("CG_AUTH_URL", DEFAULT_AUTH_URL);
        let auth_url = Url::parse(&auth)
            .map_err(|e| CompareError::Config(format!("CG_AUTH_URL '{auth}': {e}")))?;

        let tz_name = get("SITE_TIMEZONE", DEFAULT_TIMEZONE);
        let tz = Tz::from_str_insensitive(&tz_name)
            .map_err(|e| CompareError::Config(format!("SITE_TIMEZONE '{tz_name}': {e}")))?;

        let timeout_raw = get("CG_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string());
        let timeout_secs: u64 = timeout_raw
            .parse()
            .map_err(|e| CompareError::Config(format!("CG_TIMEOUT_SECS '{timeout_raw}': {e}")))?;

        Ok(Self {
            api_base_url,
            auth_url,
            customer_key: get("CG_CUSTOMER_KEY", DEFAULT_CUSTOMER_KEY),
            site_clock: SiteClock::new(tz),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Heatmap inputs for a single route.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RouteSettings {
    pub direction: Option<Direction>,
    /// KML or GeoJSON file of intersection points along the route.
    pub points: Option<PathBuf>,
}

/// Maps route ids to heatmap settings.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "13236": {"direction": "Southbound", "points": "data/state_street.kml"},
///   "13237": {"direction": "Northbound", "points": "data/state_street.kml"}
/// }
/// ```
/// Relative point paths resolve against the config file's directory.
#[derive(Debug, Clone, Default)]
pub struct RouteConfig {
    entries: HashMap<RouteId, RouteSettings>,
}

impl RouteConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&content)?;
        if let Some(base) = path.parent() {
            for settings in config.entries.values_mut() {
                if let Some(points) = settings.points.as_mut() {
                    if points.is_relative() {
                        *points = base.join(&*points);
                    }
                }
            }
        }
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries: HashMap<RouteId, RouteSettings> = serde_json::from_str(content)?;
        Ok(Self { entries })
    }

    /// Returns the settings for `route_id`, if any are configured.
    pub fn get(&self, route_id: RouteId) -> Option<&RouteSettings> {
        self.entries.get(&route_id)
    }

    /// Iterates over all `(route_id, settings)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (RouteId, &RouteSettings)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}
