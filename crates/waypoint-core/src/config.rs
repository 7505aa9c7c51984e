//! Configuration loading and typed config structures for the dashboard.
//!
//! The canonical configuration lives in `waypoint-config.yaml` at the
//! project root. Every section and field is optional; missing values fall
//! back to the defaults below.
//!
//! Environment variables override file values:
//! - `WAYPOINT_HOST` overrides `server.host`
//! - `WAYPOINT_PORT` overrides `server.port`
//! - `WAYPOINT_LOG` overrides `logging.filter`

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use waypoint_map::BoxSelectMode;
use waypoint_timeline::TimelineOptions;
use waypoint_types::LonLat;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DashboardConfig {
    /// Map view settings.
    #[serde(default)]
    pub map: MapConfig,

    /// Timeline zoom bounds and snapping.
    #[serde(default)]
    pub timeline: TimelineOptions,

    /// History overlay settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Default query parameters.
    #[serde(default)]
    pub parameters: ParametersConfig,

    /// Query cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DashboardConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `WAYPOINT_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `WAYPOINT_PORT` is not a port.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `WAYPOINT_PORT` is not a port.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("WAYPOINT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("WAYPOINT_PORT") {
            self.server.port = port.parse().map_err(|e| ConfigError::Invalid {
                field: "server.port",
                reason: format!("{port:?}: {e}"),
            })?;
        }
        if let Some(filter) = lookup("WAYPOINT_LOG") {
            self.logging.filter = filter;
        }
        Ok(())
    }

    /// Check value ranges that YAML typing cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.history.min_opacity) {
            return Err(ConfigError::Invalid {
                field: "history.min_opacity",
                reason: format!("{} is outside [0, 1]", self.history.min_opacity),
            });
        }
        if !self.map.cluster_distance_px.is_finite() || self.map.cluster_distance_px < 0.0 {
            return Err(ConfigError::Invalid {
                field: "map.cluster_distance_px",
                reason: format!("{} is not a distance", self.map.cluster_distance_px),
            });
        }
        if self.timeline.zoom_min_ms > self.timeline.zoom_max_ms {
            return Err(ConfigError::Invalid {
                field: "timeline.zoom_min_ms",
                reason: "exceeds timeline.zoom_max_ms".to_owned(),
            });
        }
        if self.parameters.default_window_hours <= 0 {
            return Err(ConfigError::Invalid {
                field: "parameters.default_window_hours",
                reason: "must be positive".to_owned(),
            });
        }
        Ok(())
    }
}

/// Map view configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Pixel distance under which entities merge into a cluster.
    #[serde(default = "default_cluster_distance_px")]
    pub cluster_distance_px: f64,

    /// Initial view center as `[lon, lat]`.
    #[serde(default = "default_center")]
    pub center: LonLat,

    /// Initial zoom level.
    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Zoom used when flying to a focused entity.
    #[serde(default = "default_fly_to_max_zoom")]
    pub fly_to_max_zoom: f64,

    /// How a drag box combines with the current selection.
    #[serde(default)]
    pub box_select: BoxSelectMode,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cluster_distance_px: default_cluster_distance_px(),
            center: default_center(),
            zoom: default_zoom(),
            fly_to_max_zoom: default_fly_to_max_zoom(),
            box_select: BoxSelectMode::default(),
        }
    }
}

/// History overlay configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryConfig {
    /// Opacity floor of the oldest waypoints.
    #[serde(default = "default_min_opacity")]
    pub min_opacity: f64,

    /// Quiet period after a marker move before the trail is recomputed.
    #[serde(default = "default_scrub_debounce_ms")]
    pub scrub_debounce_ms: u64,
}

impl HistoryConfig {
    /// The debounce delay as a [`Duration`].
    pub const fn scrub_debounce(&self) -> Duration {
        Duration::from_millis(self.scrub_debounce_ms)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            min_opacity: default_min_opacity(),
            scrub_debounce_ms: default_scrub_debounce_ms(),
        }
    }
}

/// Default query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParametersConfig {
    /// Length of the initial open-ended window, in hours before now.
    #[serde(default = "default_window_hours")]
    pub default_window_hours: i64,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            default_window_hours: default_window_hours(),
        }
    }
}

/// Query cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Seconds before an entry keyed on an open-ended window goes stale.
    #[serde(default = "default_open_range_ttl_secs")]
    pub open_range_ttl_secs: u64,
}

impl CacheConfig {
    /// The TTL as a [`Duration`].
    pub const fn open_range_ttl(&self) -> Duration {
        Duration::from_secs(self.open_range_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            open_range_ttl_secs: default_open_range_ttl_secs(),
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info,waypoint_core=debug`.
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

const fn default_cluster_distance_px() -> f64 {
    waypoint_map::cluster::DEFAULT_DISTANCE_PX
}

const fn default_center() -> LonLat {
    LonLat(35.0, 31.0)
}

const fn default_zoom() -> f64 {
    7.5
}

const fn default_fly_to_max_zoom() -> f64 {
    14.0
}

const fn default_min_opacity() -> f64 {
    waypoint_map::trail::DEFAULT_MIN_OPACITY
}

const fn default_scrub_debounce_ms() -> u64 {
    100
}

const fn default_window_hours() -> i64 {
    6
}

const fn default_open_range_ttl_secs() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_log_filter() -> String {
    "info".to_owned()
}
