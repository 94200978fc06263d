//! Flags concentrated in one room

use super::{DetectedPattern, PatternKind, PatternSeverity};
use crate::aggregate::AggregatedResult;
use crate::config::DetectorConfig;

pub(super) fn detect(
    aggregated: &AggregatedResult,
    config: &DetectorConfig,
) -> Option<DetectedPattern> {
    let total_flags = aggregated.summary.total_flags;
    if total_flags == 0 {
        return None;
    }

    let row = aggregated
        .room_breakdown
        .iter()
        .max_by(|a, b| {
            a.flag_count
                .cmp(&b.flag_count)
                .then_with(|| b.id.cmp(&a.id))
        })?;
    let share = row.flag_count as f64 / total_flags as f64;
    if share < config.concentration_share {
        return None;
    }

    Some(DetectedPattern {
        kind: PatternKind::RoomConcentration,
        title: format!("Flags concentrated in {}", row.id),
        description: format!(
            "{} holds {} of the period's {} flags",
            row.id, row.flag_count, total_flags
        ),
        severity: PatternSeverity::Warning,
        metric: format!("{:.0}% of flags", share * 100.0),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{aggregate, entity_row};
    use super::*;

    #[test]
    fn dominant_room_is_a_concentration() {
        let mut a = aggregate();
        a.summary.total_flags = 10;
        a.room_breakdown = vec![
            entity_row("or-1", 10, 4, 6),
            entity_row("or-2", 10, 2, 2),
            entity_row("or-3", 10, 2, 2),
        ];
        let pattern = detect(&a, &DetectorConfig::default()).unwrap();
        assert_eq!(pattern.kind, PatternKind::RoomConcentration);
        assert!(pattern.title.contains("or-1"));
        assert_eq!(pattern.metric, "60% of flags");
    }

    #[test]
    fn share_at_the_floor_fires() {
        let mut a = aggregate();
        a.summary.total_flags = 10;
        a.room_breakdown = vec![entity_row("or-1", 10, 4, 4), entity_row("or-2", 10, 3, 3)];
        let pattern = detect(&a, &DetectorConfig::default()).unwrap();
        assert!(pattern.title.contains("or-1"));
        assert_eq!(pattern.metric, "40% of flags");
    }

    #[test]
    fn evenly_spread_flags_stay_silent() {
        let mut a = aggregate();
        a.summary.total_flags = 9;
        a.room_breakdown = vec![
            entity_row("or-1", 10, 3, 3),
            entity_row("or-2", 10, 3, 3),
            entity_row("or-3", 10, 3, 3),
        ];
        assert!(detect(&a, &DetectorConfig::default()).is_none());
    }

    #[test]
    fn no_flags_means_no_pattern() {
        assert!(detect(&aggregate(), &DetectorConfig::default()).is_none());
    }
}
