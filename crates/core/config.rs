//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object or TOML document is a
//! valid configuration.
use serde::de::Error;

/// Engine configuration
///
/// # Example
///
/// ```rust
/// use pitchmap::Config;
///
/// let config = Config::from_json(r#"{"min_cluster_size": 3, "cache": {"ttl_ms": 500}}"#).unwrap();
/// assert_eq!(config.min_cluster_size, 3);
/// assert_eq!(config.cache.ttl_ms, 500);
/// assert_eq!(config.max_zoom, 20);
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Number of longitude bands the spatial index is split into.
    #[serde(default = "Config::default_shard_count")]
    pub shard_count: usize,

    /// Smallest cell population emitted as a cluster.
    #[serde(default = "Config::default_min_cluster_size")]
    pub min_cluster_size: usize,

    #[serde(default = "Config::default_min_zoom")]
    pub min_zoom: u8,

    #[serde(default = "Config::default_max_zoom")]
    pub max_zoom: u8,

    /// Zoom used when a transport request omits one.
    #[serde(default = "Config::default_zoom")]
    pub default_zoom: u8,

    /// Cell edge in degrees at zoom 0; halves with every zoom level.
    #[serde(default = "Config::default_base_cell_degrees")]
    pub base_cell_degrees: f64,

    /// Entities aggregated between two cancellation checks.
    #[serde(default = "Config::default_cancel_check_interval")]
    pub cancel_check_interval: usize,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub nearby: NearbyConfig,
}

/// Short-lived viewport response cache
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    #[serde(default = "CacheConfig::default_enabled")]
    pub enabled: bool,

    /// Maximum age of a served entry, in milliseconds.
    #[serde(default = "CacheConfig::default_ttl_ms")]
    pub ttl_ms: u64,

    /// Maximum number of cached responses.
    #[serde(default = "CacheConfig::default_capacity")]
    pub capacity: usize,
}

impl CacheConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_ttl_ms() -> u64 {
        60_000
    }

    const fn default_capacity() -> usize {
        1024
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            ttl_ms: Self::default_ttl_ms(),
            capacity: Self::default_capacity(),
        }
    }
}

/// Limits of the point-and-radius search
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NearbyConfig {
    #[serde(default = "NearbyConfig::default_radius_km")]
    pub default_radius_km: f64,

    #[serde(default = "NearbyConfig::default_max_radius_km")]
    pub max_radius_km: f64,

    #[serde(default = "NearbyConfig::default_limit")]
    pub default_limit: usize,

    #[serde(default = "NearbyConfig::default_max_limit")]
    pub max_limit: usize,
}

impl NearbyConfig {
    const fn default_radius_km() -> f64 {
        50.0
    }

    const fn default_max_radius_km() -> f64 {
        1000.0
    }

    const fn default_limit() -> usize {
        100
    }

    const fn default_max_limit() -> usize {
        1000
    }
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            default_radius_km: Self::default_radius_km(),
            max_radius_km: Self::default_max_radius_km(),
            default_limit: Self::default_limit(),
            max_limit: Self::default_max_limit(),
        }
    }
}

impl Config {
    /// Zoom levels above this would need cell rows beyond `i64`.
    pub const ZOOM_CEILING: u8 = 30;

    const fn default_shard_count() -> usize {
        16
    }

    const fn default_min_cluster_size() -> usize {
        2
    }

    const fn default_min_zoom() -> u8 {
        0
    }

    const fn default_max_zoom() -> u8 {
        20
    }

    const fn default_zoom() -> u8 {
        11
    }

    const fn default_base_cell_degrees() -> f64 {
        90.0
    }

    const fn default_cancel_check_interval() -> usize {
        4096
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        assert!(shard_count > 0, "Shard count must be greater than zero");
        self.shard_count = shard_count;
        self
    }

    pub fn with_min_cluster_size(mut self, min_cluster_size: usize) -> Self {
        assert!(
            min_cluster_size > 0,
            "Minimum cluster size must be greater than zero"
        );
        self.min_cluster_size = min_cluster_size;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        assert!(min_zoom <= max_zoom, "Zoom range must not be empty");
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.default_zoom = self.default_zoom.clamp(min_zoom, max_zoom);
        self
    }

    pub fn with_base_cell_degrees(mut self, degrees: f64) -> Self {
        assert!(
            degrees.is_finite() && degrees > 0.0,
            "Base cell size must be positive and finite"
        );
        self.base_cell_degrees = degrees;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_nearby(mut self, nearby: NearbyConfig) -> Self {
        self.nearby = nearby;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.shard_count == 0 {
            return Err("Shard count must be greater than zero".to_string());
        }

        if self.min_cluster_size == 0 {
            return Err("Minimum cluster size must be greater than zero".to_string());
        }

        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "Minimum zoom {} exceeds maximum zoom {}",
                self.min_zoom, self.max_zoom
            ));
        }

        if self.max_zoom > Self::ZOOM_CEILING {
            return Err(format!(
                "Maximum zoom must not exceed {}",
                Self::ZOOM_CEILING
            ));
        }

        if !(self.min_zoom..=self.max_zoom).contains(&self.default_zoom) {
            return Err(format!(
                "Default zoom {} is outside [{}, {}]",
                self.default_zoom, self.min_zoom, self.max_zoom
            ));
        }

        if !self.base_cell_degrees.is_finite() || self.base_cell_degrees <= 0.0 {
            return Err("Base cell size must be positive and finite".to_string());
        }

        if self.cancel_check_interval == 0 {
            return Err("Cancellation check interval must be greater than zero".to_string());
        }

        if self.cache.enabled && self.cache.capacity == 0 {
            return Err("Cache capacity must be greater than zero".to_string());
        }

        let nearby = &self.nearby;
        for (name, value) in [
            ("Default radius", nearby.default_radius_km),
            ("Maximum radius", nearby.max_radius_km),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive and finite", name));
            }
        }
        if nearby.default_radius_km > nearby.max_radius_km {
            return Err("Default radius exceeds maximum radius".to_string());
        }
        if nearby.default_limit == 0 || nearby.default_limit > nearby.max_limit {
            return Err("Default limit must be within [1, max_limit]".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: Self::default_shard_count(),
            min_cluster_size: Self::default_min_cluster_size(),
            min_zoom: Self::default_min_zoom(),
            max_zoom: Self::default_max_zoom(),
            default_zoom: Self::default_zoom(),
            base_cell_degrees: Self::default_base_cell_degrees(),
            cancel_check_interval: Self::default_cancel_check_interval(),
            cache: CacheConfig::default(),
            nearby: NearbyConfig::default(),
        }
    }
}
