//! Planner configuration file support.
//!
//! Settings are read from `observing.toml`. Every section is optional and
//! falls back to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PlannerError, PlannerResult};
use crate::models::{SiteRegistry, SiteSpec};
use crate::services::NightWindow;

/// Planner configuration from file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub visibility: VisibilitySettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub sites: Vec<SiteSpec>,
}

/// Visibility sampling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilitySettings {
    #[serde(default = "default_time_resolution_minutes")]
    pub time_resolution_minutes: u32,
    #[serde(default = "default_hours_around_night")]
    pub hours_before_sunset: f64,
    #[serde(default = "default_hours_around_night")]
    pub hours_after_sunrise: f64,
    #[serde(default = "default_min_altitude_deg")]
    pub min_altitude_deg: f64,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            time_resolution_minutes: default_time_resolution_minutes(),
            hours_before_sunset: default_hours_around_night(),
            hours_after_sunrise: default_hours_around_night(),
            min_altitude_deg: default_min_altitude_deg(),
        }
    }
}

/// Which name resolver backs the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverService {
    Sesame,
    Local,
}

impl FromStr for ResolverService {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sesame" => Ok(ResolverService::Sesame),
            "local" => Ok(ResolverService::Local),
            _ => Err(format!("Unknown resolver service: {}", s)),
        }
    }
}

/// Name resolution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default = "default_service")]
    pub service: ResolverService,
    #[serde(default = "default_sesame_url")]
    pub sesame_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// Names served by the local resolver, as `name = "ra dec"` (degrees).
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            service: default_service(),
            sesame_url: default_sesame_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            cache: default_cache(),
            names: BTreeMap::new(),
        }
    }
}

fn default_time_resolution_minutes() -> u32 {
    10
}

fn default_hours_around_night() -> f64 {
    1.0
}

fn default_min_altitude_deg() -> f64 {
    30.0
}

fn default_service() -> ResolverService {
    if cfg!(feature = "sesame") {
        ResolverService::Sesame
    } else {
        ResolverService::Local
    }
}

fn default_sesame_url() -> String {
    "https://cds.unistra.fr/cgi-bin/nph-sesame".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    200
}

fn default_cache() -> bool {
    true
}

impl PlannerConfig {
    /// Load planner configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlannerResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PlannerError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        let config = Self::parse(&content)?;
        log::info!("Loaded planner configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> PlannerResult<Self> {
        let config: PlannerConfig = toml::from_str(content).map_err(|e| {
            PlannerError::Configuration(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load planner configuration from the default location.
    ///
    /// Searches for `observing.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> PlannerResult<Self> {
        let search_paths = vec![
            PathBuf::from("observing.toml"),
            PathBuf::from("backend/observing.toml"),
            PathBuf::from("../observing.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(PlannerError::Configuration(
            "No observing.toml found in standard locations".to_string(),
        ))
    }

    fn validate(&self) -> PlannerResult<()> {
        if self.visibility.time_resolution_minutes == 0 {
            return Err(PlannerError::Configuration(
                "visibility.time_resolution_minutes must be positive".to_string(),
            ));
        }
        NightWindow::SunsetSunrise {
            hours_before: self.visibility.hours_before_sunset,
            hours_after: self.visibility.hours_after_sunrise,
        }
        .validate()
        .map_err(|e| PlannerError::Configuration(format!("visibility: {}", e)))?;
        if !(-90.0..=90.0).contains(&self.visibility.min_altitude_deg) {
            return Err(PlannerError::Configuration(
                "visibility.min_altitude_deg must be within [-90, 90]".to_string(),
            ));
        }
        Ok(())
    }

    /// Site registry with the configured sites layered over the built-ins.
    pub fn site_registry(&self) -> PlannerResult<SiteRegistry> {
        SiteRegistry::with_sites(&self.sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = PlannerConfig::parse("").unwrap();
        assert_eq!(config.visibility.time_resolution_minutes, 10);
        assert_eq!(config.visibility.min_altitude_deg, 30.0);
        assert_eq!(config.resolver.max_retries, 3);
        assert!(config.resolver.cache);
        assert!(config.sites.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[visibility]
time_resolution_minutes = 5
hours_before_sunset = 0.5

[resolver]
service = "local"
timeout_secs = 3

[resolver.names]
M82 = "148.9685 69.6797"

[[sites]]
name = "Backyard"
latitude = 40.0
longitude = -74.0
altitude_m = 10
aliases = ["home"]
"#;

        let config = PlannerConfig::parse(toml).unwrap();
        assert_eq!(config.visibility.time_resolution_minutes, 5);
        assert_eq!(config.visibility.hours_before_sunset, 0.5);
        assert_eq!(config.visibility.hours_after_sunrise, 1.0);
        assert_eq!(config.resolver.service, ResolverService::Local);
        assert_eq!(config.resolver.timeout_secs, 3);
        assert_eq!(config.resolver.names.get("M82").map(String::as_str), Some("148.9685 69.6797"));

        let registry = config.site_registry().unwrap();
        assert_eq!(registry.lookup("home").unwrap().name(), "Backyard");
        assert!(registry.lookup("Keck").is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = PlannerConfig::parse("[visibility]\ntime_resolution_minutes = 0\n").unwrap_err();
        assert!(matches!(err, PlannerError::Configuration(_)));

        let err = PlannerConfig::parse("[visibility]\nhours_after_sunrise = 1e13\n").unwrap_err();
        assert!(matches!(err, PlannerError::Configuration(_)));
        let err = PlannerConfig::parse("[visibility]\nhours_before_sunset = -2.0\n").unwrap_err();
        assert!(matches!(err, PlannerError::Configuration(_)));

        let err = PlannerConfig::parse("[resolver]\nservice = \"carrier-pigeon\"\n").unwrap_err();
        assert!(matches!(err, PlannerError::Configuration(_)));
    }

    #[test]
    fn test_invalid_site_surfaces_on_registry() {
        let config = PlannerConfig::parse(
            "[[sites]]\nname = \"Nowhere\"\nlatitude = 123.0\nlongitude = 0.0\n",
        )
        .unwrap();
        assert!(matches!(config.site_registry(), Err(PlannerError::InvalidSite(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[visibility]\nmin_altitude_deg = 25.0").unwrap();

        let config = PlannerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.visibility.min_altitude_deg, 25.0);

        let missing = PlannerConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(missing, Err(PlannerError::Configuration(_))));
    }

    #[test]
    fn test_resolver_service_from_str() {
        assert_eq!("SESAME".parse::<ResolverService>().unwrap(), ResolverService::Sesame);
        assert!("simbad".parse::<ResolverService>().is_err());
    }
}
