//! Recurring high-rate surgeon

use std::cmp::Ordering;

use super::{DetectedPattern, PatternKind, PatternSeverity};
use crate::aggregate::AggregatedResult;
use crate::config::DetectorConfig;

/// A surgeon recurs when their flag rate reaches the configured multiple
/// of the facility rate over at least the minimum case count.
pub(super) fn detect(
    aggregated: &AggregatedResult,
    config: &DetectorConfig,
) -> Option<DetectedPattern> {
    let facility_rate = aggregated.summary.flag_rate;
    if facility_rate <= 0.0 {
        return None;
    }

    let row = aggregated
        .surgeon_breakdown
        .iter()
        .filter(|r| r.total_cases >= config.surgeon_min_cases)
        .filter(|r| r.flag_rate >= config.surgeon_rate_multiplier * facility_rate)
        .max_by(|a, b| {
            a.flag_rate
                .partial_cmp(&b.flag_rate)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.id.cmp(&a.id))
        })?;

    Some(DetectedPattern {
        kind: PatternKind::RecurringSurgeon,
        title: format!("Recurring flags for {}", row.id),
        description: format!(
            "{} is flagged on {:.1}% of cases against a facility average of {:.1}%",
            row.id, row.flag_rate, facility_rate
        ),
        severity: PatternSeverity::Warning,
        metric: format!("{:.1}% vs {:.1}%", row.flag_rate, facility_rate),
    })
}
