//! Runtime configuration and reference data.
//!
//! Settings come from the environment (a `.env` file is honoured) with
//! defaults matching the standard deployment. Reference data is loaded once
//! from those settings and shared read-only by every export.
//!
//! | Variable           | Default                   |
//! |--------------------|---------------------------|
//! | `EPP_CATALOG_PATH` | `excel_informacyjny.xlsx` |
//! | `EPP_TEMPLATE_DIR` | `.`                       |
//! | `EPP_LOCATION`     | `"Wrocław"`               |
//! | `EPP_TIMEZONE`     | `Europe/Warsaw`           |
//! | `EPP_PORT`         | `3000`                    |

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

use crate::api::logs::log_success;
use crate::catalog::{Catalog, DEFAULT_CATALOG_FILE};
use crate::epp::TemplateSet;
use crate::error::{ConfigError, ConfigResult};

/// Location literal for `<tu_miejscowosc>`, quotes included.
pub const DEFAULT_LOCATION: &str = "\"Wrocław\"";

/// Business timezone for document timestamps.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Warsaw;

/// HTTP port.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum upload size accepted by the HTTP API (in bytes).
///
/// 20 MB limit.
pub const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub catalog_path: PathBuf,
    pub template_dir: PathBuf,
    pub location: String,
    pub timezone: Tz,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_FILE),
            template_dir: PathBuf::from("."),
            location: DEFAULT_LOCATION.to_string(),
            timezone: DEFAULT_TIMEZONE,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment (after loading `.env`).
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get("EPP_CATALOG_PATH") {
            config.catalog_path = PathBuf::from(path);
        }
        if let Some(dir) = get("EPP_TEMPLATE_DIR") {
            config.template_dir = PathBuf::from(dir);
        }
        if let Some(location) = get("EPP_LOCATION") {
            config.location = location;
        }
        if let Some(tz) = get("EPP_TIMEZONE") {
            config.timezone = tz.trim().parse::<Tz>().map_err(|e| ConfigError::InvalidValue {
                key: "EPP_TIMEZONE".into(),
                message: e.to_string(),
            })?;
        }
        if let Some(port) = get("EPP_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "EPP_PORT".into(),
                message: format!("'{}' is not a port number", port),
            })?;
        }

        Ok(config)
    }
}

/// Catalog and templates, loaded once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub catalog: Catalog,
    pub templates: TemplateSet,
    pub location: String,
    pub timezone: Tz,
}

impl ReferenceData {
    /// Load the catalog and every template the configuration points at.
    pub fn load(config: &AppConfig) -> ConfigResult<Self> {
        let catalog = Catalog::load(&config.catalog_path)?;
        log_success(format!(
            "Loaded {} catalog entries from {}",
            catalog.len(),
            config.catalog_path.display()
        ));

        let templates = TemplateSet::load_dir(&config.template_dir)?;

        Ok(Self {
            catalog,
            templates,
            location: config.location.clone(),
            timezone: config.timezone,
        })
    }

    /// Current time in the business timezone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.catalog_path, PathBuf::from("excel_informacyjny.xlsx"));
        assert_eq!(config.location, "\"Wrocław\"");
        assert_eq!(config.timezone, chrono_tz::Europe::Warsaw);
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("EPP_CATALOG_PATH", "/data/ref.xlsx"),
            ("EPP_TEMPLATE_DIR", "/data/templates"),
            ("EPP_TIMEZONE", "Europe/Berlin"),
            ("EPP_PORT", "8080"),
            ("EPP_LOCATION", ""),
        ]))
        .unwrap();
        assert_eq!(config.catalog_path, PathBuf::from("/data/ref.xlsx"));
        assert_eq!(config.template_dir, PathBuf::from("/data/templates"));
        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.port, 8080);
        assert_eq!(config.location, DEFAULT_LOCATION);
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("EPP_TIMEZONE", "Mars/Base")])).unwrap_err();
        assert!(err.to_string().contains("EPP_TIMEZONE"));

        let err = AppConfig::from_lookup(lookup(&[("EPP_PORT", "http")])).unwrap_err();
        assert!(err.to_string().contains("EPP_PORT"));
    }
}
