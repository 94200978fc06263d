//! Higher-order anomaly pattern detection
//!
//! Scans an already-built aggregate for recurring shapes: no case
//! re-scan, pure over the aggregate. Detectors run in declaration order
//! and each emits at most one pattern.

mod cascade;
mod concentration;
mod day_spike;
mod surgeon;
mod trend;

use serde::Serialize;
use tracing::debug;

use crate::aggregate::AggregatedResult;
use crate::config::DetectorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DaySpike,
    EquipmentCascade,
    TrendImprovement,
    TrendDeterioration,
    RoomConcentration,
    RecurringSurgeon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternSeverity {
    Critical,
    Warning,
    Good,
}

/// One detected anomaly shape, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedPattern {
    pub kind: PatternKind,
    pub title: String,
    pub description: String,
    pub severity: PatternSeverity,
    /// Pre-formatted headline figure, e.g. `"20 flags"` or `"46% of flags"`.
    pub metric: String,
}

type Detector = fn(&AggregatedResult, &DetectorConfig) -> Option<DetectedPattern>;

// declaration order is the output order
const DETECTORS: [Detector; 5] = [
    day_spike::detect,
    cascade::detect,
    trend::detect,
    concentration::detect,
    surgeon::detect,
];

/// Run every detector over `aggregated`. The trend detector covers both
/// the improvement and deterioration kinds, so at most five patterns come
/// back.
pub fn detect_patterns(
    aggregated: &AggregatedResult,
    config: &DetectorConfig,
) -> Vec<DetectedPattern> {
    let patterns: Vec<DetectedPattern> = DETECTORS
        .iter()
        .filter_map(|detect| detect(aggregated, config))
        .collect();
    debug!(detected = patterns.len(), "pattern detection finished");
    patterns
}
