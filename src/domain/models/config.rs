//! Main configuration structure for Reflex.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the promotion pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReflexConfig {
    /// Append-only store configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session observer configuration.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Promotion detector configuration.
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Gatekeeper thresholds.
    #[serde(default)]
    pub gatekeeper: GatekeeperConfig,

    /// Drift monitor configuration.
    #[serde(default)]
    pub drift: DriftConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Append-only store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageConfig {
    /// Directory holding the per-category `.jsonl` files.
    #[serde(default = "default_root_dir")]
    pub root_dir: String,

    /// Retention policy applied to the sessions store after each write.
    #[serde(default)]
    pub retention: RetentionConfig,
}

fn default_root_dir() -> String {
    ".reflex/store".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            retention: RetentionConfig::default(),
        }
    }
}

/// Age/size bound for persisted observations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetentionConfig {
    /// Entries older than this are pruned.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u32,

    /// At most this many newest entries are kept.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

const fn default_max_age_days() -> u32 {
    90
}

const fn default_max_entries() -> usize {
    10_000
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_age_days: default_max_age_days(),
            max_entries: default_max_entries(),
        }
    }
}

/// Session observer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ObserverConfig {
    /// Tier score at or above which an observation is persistent.
    #[serde(default = "default_tier_threshold")]
    pub tier_threshold: f64,

    /// How many top tools/commands to keep in a summary.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Local observation rate limit.
    #[serde(default)]
    pub rate_limit: ObserverRateLimit,
}

const fn default_tier_threshold() -> f64 {
    10.0
}

const fn default_top_n() -> usize {
    5
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            tier_threshold: default_tier_threshold(),
            top_n: default_top_n(),
            rate_limit: ObserverRateLimit::default(),
        }
    }
}

/// Sliding-window rate limit for session observations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ObserverRateLimit {
    /// Maximum observations per window.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

const fn default_max_sessions() -> usize {
    60
}

const fn default_window_secs() -> u64 {
    3600
}

impl Default for ObserverRateLimit {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            window_secs: default_window_secs(),
        }
    }
}

/// Promotion detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DetectorConfig {
    /// Tool names eligible for promotion. Unknown tools never auto-promote.
    #[serde(default = "default_promotable_tools")]
    pub promotable_tools: Vec<String>,

    /// Minimum determinism a group needs to become a candidate.
    #[serde(default = "default_min_determinism")]
    pub min_determinism: f64,

    /// Characters per token used for savings estimation.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,

    /// Composite score at or above which a candidate meets confidence.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Frequency at which the log-scaled frequency factor saturates.
    #[serde(default = "default_frequency_cap")]
    pub frequency_cap: u64,

    /// Token savings at which the savings factor saturates.
    #[serde(default = "default_savings_cap")]
    pub savings_cap: f64,
}

fn default_promotable_tools() -> Vec<String> {
    ["Bash", "Read", "Grep", "Glob"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_min_determinism() -> f64 {
    0.95
}

const fn default_chars_per_token() -> f64 {
    4.0
}

const fn default_confidence_threshold() -> f64 {
    0.5
}

const fn default_frequency_cap() -> u64 {
    100
}

const fn default_savings_cap() -> f64 {
    1000.0
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            promotable_tools: default_promotable_tools(),
            min_determinism: default_min_determinism(),
            chars_per_token: default_chars_per_token(),
            confidence_threshold: default_confidence_threshold(),
            frequency_cap: default_frequency_cap(),
            savings_cap: default_savings_cap(),
        }
    }
}

/// Gatekeeper pass/fail thresholds. The calibration thresholds are
/// optional; a calibration gate runs only when its threshold is set and
/// a benchmark report is supplied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GatekeeperConfig {
    /// Minimum determinism.
    #[serde(default = "default_min_determinism")]
    pub min_determinism: f64,

    /// Minimum composite score.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Minimum observation count.
    #[serde(default = "default_min_observations")]
    pub min_observations: u64,

    /// Minimum F1 over a benchmark report.
    #[serde(default)]
    pub min_f1: Option<f64>,

    /// Minimum accuracy over a benchmark report.
    #[serde(default)]
    pub min_accuracy: Option<f64>,

    /// Minimum rescaled Matthews correlation coefficient.
    #[serde(default)]
    pub min_mcc: Option<f64>,
}

const fn default_min_confidence() -> f64 {
    0.85
}

const fn default_min_observations() -> u64 {
    5
}

impl Default for GatekeeperConfig {
    fn default() -> Self {
        Self {
            min_determinism: default_min_determinism(),
            min_confidence: default_min_confidence(),
            min_observations: default_min_observations(),
            min_f1: None,
            min_accuracy: None,
            min_mcc: None,
        }
    }
}

/// Drift monitor configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DriftConfig {
    /// When false, checks are pure no-ops touching no state or storage.
    #[serde(default = "default_drift_enabled")]
    pub enabled: bool,

    /// Consecutive mismatches required to demote.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u32,
}

const fn default_drift_enabled() -> bool {
    true
}

const fn default_sensitivity() -> u32 {
    3
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            enabled: default_drift_enabled(),
            sensitivity: default_sensitivity(),
        }
    }
}
