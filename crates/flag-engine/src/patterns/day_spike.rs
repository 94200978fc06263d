//! Weekday flag-count spike

use super::{DetectedPattern, PatternKind, PatternSeverity};
use crate::aggregate::AggregatedResult;
use crate::config::DetectorConfig;

/// A weekday spikes when its flag count clears the minimum floor and
/// exceeds the configured multiple of the mean over the other weekdays
/// that saw any flags at all.
pub(super) fn detect(
    aggregated: &AggregatedResult,
    config: &DetectorConfig,
) -> Option<DetectedPattern> {
    let days = &aggregated.heatmap.days;
    let (idx, peak) = days
        .iter()
        .enumerate()
        .map(|(i, d)| (i, d.total))
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;
    if peak < config.day_spike_min_flags {
        return None;
    }

    let others: Vec<u32> = days
        .iter()
        .enumerate()
        .filter(|(i, d)| *i != idx && d.total > 0)
        .map(|(_, d)| d.total)
        .collect();
    let others_mean = if others.is_empty() {
        0.0
    } else {
        others.iter().sum::<u32>() as f64 / others.len() as f64
    };
    if f64::from(peak) <= config.day_spike_multiplier * others_mean {
        return None;
    }

    let day = days[idx].day.clone();
    Some(DetectedPattern {
        kind: PatternKind::DaySpike,
        title: format!("Flag spike on {day}"),
        description: format!(
            "{peak} flags landed on {day} against an average of {others_mean:.1} on the other weekdays"
        ),
        severity: PatternSeverity::Warning,
        metric: format!("{peak} flags"),
    })
}
