//! Engine configuration
//!
//! All pattern-detection heuristics and display limits are named, tunable
//! fields here rather than literals in the detectors.

use serde::Deserialize;

use crate::models::Severity;

/// Top-level engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Number of buckets in each sparkline series
    #[serde(default = "default_sparkline_points")]
    pub sparkline_points: usize,

    /// How many recently flagged cases the aggregate carries
    #[serde(default = "default_recent_case_limit")]
    pub recent_case_limit: usize,

    /// Manual delays at or above this duration are warning severity
    #[serde(default = "default_delay_warning_minutes")]
    pub delay_warning_minutes: f64,

    /// Manual delays at or above this duration are critical severity
    #[serde(default = "default_delay_critical_minutes")]
    pub delay_critical_minutes: f64,

    #[serde(default)]
    pub detector: DetectorConfig,
}

/// Tunables for the six pattern detectors
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// A weekday spikes when its flag count exceeds this multiple of the
    /// mean of the other weekdays
    #[serde(default = "default_day_spike_multiplier")]
    pub day_spike_multiplier: f64,

    /// Minimum absolute flag count before a weekday can spike
    #[serde(default = "default_day_spike_min_flags")]
    pub day_spike_min_flags: u32,

    /// Distinct rooms that must share a top issue to call it a cascade
    #[serde(default = "default_cascade_min_rooms")]
    pub cascade_min_rooms: usize,

    /// Minimum percentage-point trend delta before a trend pattern fires
    #[serde(default = "default_trend_min_delta")]
    pub trend_min_delta: f64,

    /// Share of all period flags one room must hold to be a concentration
    #[serde(default = "default_concentration_share")]
    pub concentration_share: f64,

    /// A surgeon recurs when their flag rate reaches this multiple of the
    /// facility average
    #[serde(default = "default_surgeon_rate_multiplier")]
    pub surgeon_rate_multiplier: f64,

    /// Minimum case count before a surgeon's rate is considered
    #[serde(default = "default_surgeon_min_cases")]
    pub surgeon_min_cases: usize,
}

fn default_sparkline_points() -> usize {
    7
}

fn default_recent_case_limit() -> usize {
    10
}

fn default_delay_warning_minutes() -> f64 {
    15.0
}

fn default_delay_critical_minutes() -> f64 {
    45.0
}

fn default_day_spike_multiplier() -> f64 {
    2.0
}

fn default_day_spike_min_flags() -> u32 {
    5
}

fn default_cascade_min_rooms() -> usize {
    3
}

fn default_trend_min_delta() -> f64 {
    5.0
}

fn default_concentration_share() -> f64 {
    0.4
}

fn default_surgeon_rate_multiplier() -> f64 {
    2.0
}

fn default_surgeon_min_cases() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sparkline_points: default_sparkline_points(),
            recent_case_limit: default_recent_case_limit(),
            delay_warning_minutes: default_delay_warning_minutes(),
            delay_critical_minutes: default_delay_critical_minutes(),
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            day_spike_multiplier: default_day_spike_multiplier(),
            day_spike_min_flags: default_day_spike_min_flags(),
            cascade_min_rooms: default_cascade_min_rooms(),
            trend_min_delta: default_trend_min_delta(),
            concentration_share: default_concentration_share(),
            surgeon_rate_multiplier: default_surgeon_rate_multiplier(),
            surgeon_min_cases: default_surgeon_min_cases(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset (e.g. `FLAG_ENGINE_SPARKLINE_POINTS`,
    /// `FLAG_ENGINE_DETECTOR__TREND_MIN_DELTA`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("FLAG_ENGINE").separator("__"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    /// Severity of a manual delay, derived from its duration.
    pub fn delay_severity(&self, duration_minutes: f64) -> Severity {
        if duration_minutes >= self.delay_critical_minutes {
            Severity::Critical
        } else if duration_minutes >= self.delay_warning_minutes {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}
