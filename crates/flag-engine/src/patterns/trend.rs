//! Overall flag-rate trend
//!
//! Covers both trend kinds; the sign of the delta picks which one, so
//! they can never fire together.

use super::{DetectedPattern, PatternKind, PatternSeverity};
use crate::aggregate::AggregatedResult;
use crate::config::DetectorConfig;

pub(super) fn detect(
    aggregated: &AggregatedResult,
    config: &DetectorConfig,
) -> Option<DetectedPattern> {
    let trend = aggregated.summary.trend_points;
    if trend.abs() < config.trend_min_delta {
        return None;
    }

    Some(if trend > 0.0 {
        DetectedPattern {
            kind: PatternKind::TrendDeterioration,
            title: "Flag rate deteriorating".to_string(),
            description: format!("The flag rate rose {trend:.1} points versus the prior period"),
            severity: PatternSeverity::Warning,
            metric: format!("+{trend:.1} pts"),
        }
    } else {
        DetectedPattern {
            kind: PatternKind::TrendImprovement,
            title: "Flag rate improving".to_string(),
            description: format!(
                "The flag rate fell {:.1} points versus the prior period",
                trend.abs()
            ),
            severity: PatternSeverity::Good,
            metric: format!("{trend:.1} pts"),
        }
    })
}
