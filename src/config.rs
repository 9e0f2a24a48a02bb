use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::core::distance::{DistanceUnit, GeoPoint};
use crate::core::graph::{GraphOptions, DEFAULT_EDGE_COLOR};
use crate::core::normalize::{Hemisphere, RegionPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub region: RegionSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub ip_locator: IpLocatorSettings,
    #[serde(default)]
    pub directory: DirectorySettings,
    #[serde(default)]
    pub map: MapSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Deployment region used by the coordinate normalizer
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSettings {
    #[serde(default)]
    pub hemisphere: Hemisphere,
    #[serde(default = "default_center_latitude")]
    pub center_latitude: f64,
    #[serde(default = "default_center_longitude")]
    pub center_longitude: f64,
    #[serde(default = "default_far_threshold")]
    pub far_threshold_deg: f64,
    #[serde(default = "default_swap_threshold")]
    pub swap_threshold_deg: f64,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            hemisphere: Hemisphere::default(),
            center_latitude: default_center_latitude(),
            center_longitude: default_center_longitude(),
            far_threshold_deg: default_far_threshold(),
            swap_threshold_deg: default_swap_threshold(),
        }
    }
}

fn default_center_latitude() -> f64 { 39.7589 }
fn default_center_longitude() -> f64 { -84.1916 }
fn default_far_threshold() -> f64 { 10.0 }
fn default_swap_threshold() -> f64 { 60.0 }

impl RegionSettings {
    pub fn policy(&self) -> Result<RegionPolicy, ConfigError> {
        let center = GeoPoint::new(self.center_latitude, self.center_longitude).ok_or_else(|| {
            ConfigError::Message(format!(
                "region center ({}, {}) is not a valid coordinate",
                self.center_latitude, self.center_longitude
            ))
        })?;

        Ok(RegionPolicy {
            hemisphere: self.hemisphere,
            center,
            far_threshold_deg: self.far_threshold_deg,
            swap_threshold_deg: self.swap_threshold_deg,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    #[serde(default = "default_geocoder_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_bias_suffix")]
    pub bias_suffix: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            endpoint: default_geocoder_endpoint(),
            bias_suffix: default_bias_suffix(),
            user_agent: default_user_agent(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

fn default_geocoder_endpoint() -> String { "https://nominatim.openstreetmap.org".to_string() }
fn default_bias_suffix() -> String { ", Ohio, USA".to_string() }
fn default_user_agent() -> String { format!("partner-map/{}", env!("CARGO_PKG_VERSION")) }
fn default_provider_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct IpLocatorSettings {
    #[serde(default = "default_ip_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for IpLocatorSettings {
    fn default() -> Self {
        Self {
            endpoint: default_ip_endpoint(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

fn default_ip_endpoint() -> String { "https://ipapi.co/json/".to_string() }

/// Where the partner directory is read from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    Postgres,
    #[default]
    Static,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySettings {
    #[serde(default)]
    pub source: DirectoryKind,
    pub database_url: Option<String>,
    #[serde(default = "default_static_path")]
    pub static_path: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for DirectorySettings {
    fn default() -> Self {
        Self {
            source: DirectoryKind::default(),
            database_url: None,
            static_path: default_static_path(),
            max_connections: None,
            min_connections: None,
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_static_path() -> String { "config/directory.toml".to_string() }
fn default_cache_ttl() -> u64 { 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct MapSettings {
    #[serde(default = "default_radius")]
    pub default_radius: Option<f64>,
    #[serde(default)]
    pub default_unit: DistanceUnit,
    #[serde(default = "default_edge_color")]
    pub edge_color: String,
    #[serde(default = "default_large_collaboration_warn")]
    pub large_collaboration_warn: usize,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            default_radius: default_radius(),
            default_unit: DistanceUnit::default(),
            edge_color: default_edge_color(),
            large_collaboration_warn: default_large_collaboration_warn(),
        }
    }
}

fn default_radius() -> Option<f64> { Some(25.0) }
fn default_edge_color() -> String { DEFAULT_EDGE_COLOR.to_string() }
fn default_large_collaboration_warn() -> usize { 25 }

impl MapSettings {
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            default_color: self.edge_color.clone(),
            large_collaboration_warn: self.large_collaboration_warn,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_secs: default_idle_secs(),
        }
    }
}

fn default_max_sessions() -> u64 { 10_000 }
fn default_idle_secs() -> u64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl LoggingSettings {
    /// Apply the `LOG_LEVEL` and `LOG_FORMAT` environment variables on top
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::var("LOG_LEVEL").ok(), std::env::var("LOG_FORMAT").ok())
    }

    fn with_overrides(self, level: Option<String>, format: Option<String>) -> Self {
        Self {
            level: level.unwrap_or(self.level),
            format: format.unwrap_or(self.format),
        }
    }

    pub fn is_pretty(&self) -> bool {
        self.format.eq_ignore_ascii_case("pretty")
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PARTNER_MAP)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PARTNER_MAP__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PARTNER_MAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("PARTNER_MAP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Let the conventional DATABASE_URL variable supply the directory database
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("DATABASE_URL") {
        Ok(url) => Config::builder()
            .add_source(settings)
            .set_override("directory.database_url", url)?
            .build(),
        Err(_) => Ok(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_region_policy() {
        let policy = RegionSettings::default().policy().unwrap();
        assert_eq!(policy, RegionPolicy::default());
    }

    #[test]
    fn test_invalid_region_center_rejected() {
        let region = RegionSettings {
            center_latitude: 120.0,
            ..RegionSettings::default()
        };
        assert!(region.policy().is_err());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert!(!logging.is_pretty());
    }

    #[test]
    fn test_logging_env_overrides_configured_values() {
        let configured = LoggingSettings {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        };

        let kept = configured.clone().with_overrides(None, None);
        assert_eq!(kept.level, "debug");
        assert!(kept.is_pretty());

        let overridden = configured.with_overrides(Some("warn".to_string()), Some("json".to_string()));
        assert_eq!(overridden.level, "warn");
        assert!(!overridden.is_pretty());
    }

    #[test]
    fn test_load_from_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r##"
[region]
hemisphere = "eastern"
center_latitude = 52.52
center_longitude = 13.405

[map]
default_unit = "kilometers"
edge_color = "#00aa00"

[logging]
level = "debug"
format = "pretty"
"##
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();

        assert_eq!(settings.region.hemisphere, Hemisphere::Eastern);
        assert_eq!(settings.map.default_unit, DistanceUnit::Kilometers);
        assert_eq!(settings.map.graph_options().default_color, "#00aa00");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.directory.source, DirectoryKind::Static);
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.is_pretty());
    }
}
