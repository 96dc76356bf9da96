// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the profile-page gate.
//!
//! Every guarded surface gets its own bucket parameters. Values come from
//! built-in defaults, then an optional JSON file named by `LINKPAGE_CONFIG`,
//! then individual environment variables.

use crate::guards::Surface;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {surface} bucket: {reason}")]
    InvalidBucket {
        surface: Surface,
        reason: &'static str,
    },

    #[error("Invalid sweep configuration: {0}")]
    InvalidSweep(&'static str),

    #[error("Invalid metrics path {path:?}: {reason}")]
    InvalidMetricsPath { path: String, reason: &'static str },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    ParseFile(#[from] serde_json::Error),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-surface bucket parameters
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Idle bucket eviction
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Embed classification
    #[serde(default)]
    pub embed: EmbedConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Token bucket parameters for one guarded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Maximum tokens a bucket can hold (burst allowance)
    pub capacity: u32,
    /// Tokens granted per elapsed window, accrued continuously
    pub refill_per_window: u32,
    /// Time base for the refill, in milliseconds
    pub window_ms: u64,
}

impl BucketConfig {
    pub const fn new(capacity: u32, refill_per_window: u32, window_ms: u64) -> Self {
        Self {
            capacity,
            refill_per_window,
            window_ms,
        }
    }

    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    fn validate(&self, surface: Surface) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidBucket {
                surface,
                reason: "capacity must be at least 1",
            });
        }
        if self.window_ms == 0 {
            return Err(ConfigError::InvalidBucket {
                surface,
                reason: "window_ms must be positive",
            });
        }
        Ok(())
    }
}

/// Bucket parameters for each guarded surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Comment posting, keyed by `ip:handle` (default: 5 per minute)
    #[serde(default = "default_comment_bucket")]
    pub comment: BucketConfig,

    /// AI writing requests, keyed by user id (default: 10 per minute)
    #[serde(default = "default_ai_bucket")]
    pub ai: BucketConfig,

    /// Profile view tracking, keyed by `view:ip` (default: 30 per minute)
    #[serde(default = "default_tracking_bucket")]
    pub view: BucketConfig,

    /// Link click tracking, keyed by `click:ip` (default: 30 per minute)
    #[serde(default = "default_tracking_bucket")]
    pub click: BucketConfig,
}

impl LimitsConfig {
    pub fn for_surface(&self, surface: Surface) -> BucketConfig {
        match surface {
            Surface::Comment => self.comment,
            Surface::Ai => self.ai,
            Surface::View => self.view,
            Surface::Click => self.click,
        }
    }

    fn for_surface_mut(&mut self, surface: Surface) -> &mut BucketConfig {
        match surface {
            Surface::Comment => &mut self.comment,
            Surface::Ai => &mut self.ai,
            Surface::View => &mut self.view,
            Surface::Click => &mut self.click,
        }
    }
}

/// Idle bucket eviction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// How often the background sweep runs, in seconds (default: 60)
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// Buckets idle for more than this many windows are evicted (default: 5)
    #[serde(default = "default_idle_windows")]
    pub idle_windows: u32,

    /// Hard cap on live buckets per surface; `None` means unbounded between sweeps
    #[serde(default = "default_max_buckets")]
    pub max_buckets: Option<usize>,
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Embed classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Path prefix under which uploaded audio is served from object storage
    #[serde(default = "default_audio_storage_prefix")]
    pub audio_storage_prefix: String,

    /// Host fragments of streaming-audio services whose URLs play inline
    #[serde(default = "default_streaming_hosts")]
    pub streaming_hosts: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_comment_bucket() -> BucketConfig {
    BucketConfig::new(5, 5, 60_000)
}

fn default_ai_bucket() -> BucketConfig {
    BucketConfig::new(10, 10, 60_000)
}

fn default_tracking_bucket() -> BucketConfig {
    BucketConfig::new(30, 30, 60_000)
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_idle_windows() -> u32 {
    5
}

fn default_max_buckets() -> Option<usize> {
    Some(100_000)
}

fn default_audio_storage_prefix() -> String {
    "/storage/v1/object/public/audio/".to_string()
}

fn default_streaming_hosts() -> Vec<String> {
    vec![
        "audio.jukehost.co.uk".to_string(),
        "streams.radio.co".to_string(),
        "stream.zeno.fm".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            limits: LimitsConfig::default(),
            sweep: SweepConfig::default(),
            embed: EmbedConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            comment: default_comment_bucket(),
            ai: default_ai_bucket(),
            view: default_tracking_bucket(),
            click: default_tracking_bucket(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            idle_windows: default_idle_windows(),
            max_buckets: default_max_buckets(),
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            audio_storage_prefix: default_audio_storage_prefix(),
            streaming_hosts: default_streaming_hosts(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, the optional `LINKPAGE_CONFIG` file
    /// and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var("LINKPAGE_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing sections fall back to defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply variable overrides from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }

        for surface in Surface::ALL {
            let prefix = surface.env_prefix();
            let bucket = self.limits.for_surface_mut(surface);
            if let Some(v) = parse_var(&lookup, &format!("{prefix}_CAPACITY"))? {
                bucket.capacity = v;
            }
            if let Some(v) = parse_var(&lookup, &format!("{prefix}_REFILL"))? {
                bucket.refill_per_window = v;
            }
            if let Some(v) = parse_var(&lookup, &format!("{prefix}_WINDOW_MS"))? {
                bucket.window_ms = v;
            }
        }

        if let Some(v) = parse_var(&lookup, "SWEEP_INTERVAL_SECS")? {
            self.sweep.interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "BUCKET_IDLE_WINDOWS")? {
            self.sweep.idle_windows = v;
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "MAX_BUCKETS")? {
            // 0 disables the cap
            self.sweep.max_buckets = (v > 0).then_some(v);
        }
        if let Some(prefix) = lookup("AUDIO_STORAGE_PREFIX") {
            self.embed.audio_storage_prefix = prefix;
        }
        if let Some(v) = parse_var(&lookup, "METRICS_ENABLED")? {
            self.metrics.enabled = v;
        }
        Ok(())
    }

    /// Reject values the limiter cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for surface in Surface::ALL {
            self.limits.for_surface(surface).validate(surface)?;
        }
        if self.sweep.interval_secs == 0 {
            return Err(ConfigError::InvalidSweep("interval_secs must be positive"));
        }
        if self.sweep.idle_windows == 0 {
            return Err(ConfigError::InvalidSweep("idle_windows must be positive"));
        }
        if self.metrics.enabled {
            self.metrics.validate()?;
        }
        Ok(())
    }
}

impl MetricsConfig {
    /// The path is mounted as a static route next to the API routes.
    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidMetricsPath {
            path: self.path.clone(),
            reason,
        };
        if !self.path.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if self.path.len() == 1 {
            return Err(invalid("must not be the root path"));
        }
        if self.path.contains(['*', ':', '{', '}']) {
            return Err(invalid("must not contain route parameters"));
        }
        if RESERVED_PATHS
            .iter()
            .any(|reserved| self.path == *reserved || self.path.starts_with(&format!("{reserved}/")))
        {
            return Err(invalid("collides with an API route"));
        }
        Ok(())
    }
}

/// Path prefixes owned by the API router.
const RESERVED_PATHS: &[&str] = &["/health", "/healthz", "/limits", "/embed", "/links", "/bio"];

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            }),
    }
}
