//! Shared top issue across rooms

use std::collections::BTreeMap;

use super::{DetectedPattern, PatternKind, PatternSeverity};
use crate::aggregate::AggregatedResult;
use crate::config::DetectorConfig;

/// One issue label being the top issue in several distinct rooms points
/// at a shared cause rather than room-local noise.
pub(super) fn detect(
    aggregated: &AggregatedResult,
    config: &DetectorConfig,
) -> Option<DetectedPattern> {
    let mut rooms_per_issue: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &aggregated.room_breakdown {
        if let Some(issue) = row.top_issue.as_deref() {
            *rooms_per_issue.entry(issue).or_default() += 1;
        }
    }

    let (issue, rooms) = rooms_per_issue
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;
    if rooms < config.cascade_min_rooms {
        return None;
    }

    Some(DetectedPattern {
        kind: PatternKind::EquipmentCascade,
        title: format!("\"{issue}\" recurring across rooms"),
        description: format!(
            "\"{issue}\" is the most frequent issue in {rooms} distinct rooms this period"
        ),
        severity: PatternSeverity::Critical,
        metric: format!("{rooms} rooms"),
    })
}
