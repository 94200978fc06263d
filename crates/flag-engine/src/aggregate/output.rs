//! Aggregated dashboard output
//!
//! Plain structured data handed to the display layer. All display
//! rounding (one decimal) happens here at construction time; internal
//! accumulation stays unrounded.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::SkipDiagnostic;
use crate::metrics::MetricCategory;
use crate::models::Flag;

/// Monday-first weekday labels used by the heatmap
pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Round to one decimal for display. Applied only at the output boundary.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage of `part` in `whole`, 0 when the denominator is empty.
pub(crate) fn pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// The full aggregate for one facility and evaluation window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedResult {
    /// Stable identifier of the evaluated window, used in flag
    /// idempotency keys.
    pub window_key: String,
    pub summary: SummaryKpis,
    pub severity_counts: SeverityCounts,
    pub rule_breakdown: Vec<IssueBreakdownRow>,
    pub delay_breakdown: Vec<DelayBreakdownRow>,
    pub surgeon_breakdown: Vec<EntityBreakdownRow>,
    pub room_breakdown: Vec<EntityBreakdownRow>,
    pub sparklines: Sparklines,
    pub heatmap: WeekdayHeatmap,
    pub recent_cases: Vec<RecentFlaggedCase>,
    /// Per-item skips from this best-effort run.
    pub diagnostics: Vec<SkipDiagnostic>,
}

/// Headline KPIs for the window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryKpis {
    pub total_cases: usize,
    /// Distinct cases carrying at least one flag.
    pub flagged_cases: usize,
    /// flagged / total x 100, one decimal, 0 when there are no cases.
    pub flag_rate: f64,
    /// Current rate minus the comparable prior-period rate, one decimal;
    /// positive means worse.
    pub trend_points: f64,
    pub total_flags: usize,
    pub delay_minutes: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SeverityCounts {
    pub info: usize,
    pub warning: usize,
    pub critical: usize,
}

impl SeverityCounts {
    pub fn record(&mut self, severity: crate::models::Severity) {
        match severity {
            crate::models::Severity::Info => self.info += 1,
            crate::models::Severity::Warning => self.warning += 1,
            crate::models::Severity::Critical => self.critical += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.warning + self.critical
    }
}

/// One rule's share of the window's threshold flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueBreakdownRow {
    pub rule_id: String,
    pub rule_name: String,
    pub count: usize,
    /// Share of all flags in the window, one decimal.
    pub share_pct: f64,
}

/// One delay type's share of the window's delay flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayBreakdownRow {
    pub delay_type: String,
    pub count: usize,
    pub total_minutes: f64,
    pub share_pct: f64,
}

/// Per-surgeon or per-room statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityBreakdownRow {
    pub id: String,
    pub total_cases: usize,
    pub flagged_cases: usize,
    pub flag_rate: f64,
    /// This entity's own rate trend versus the prior period.
    pub trend_points: f64,
    /// All flags on this entity's cases, not just distinct cases.
    pub flag_count: usize,
    /// Most frequent flag label; ties break lexicographically.
    pub top_issue: Option<String>,
}

/// Fixed-length per-KPI series over equal date buckets of the window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sparklines {
    pub flag_count: Vec<f64>,
    pub flag_rate: Vec<f64>,
    pub delay_minutes: Vec<f64>,
}

/// Monday-first day-of-week heatmap of flag counts by metric category
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeekdayHeatmap {
    pub days: Vec<WeekdayCell>,
}

impl WeekdayHeatmap {
    /// Seven empty cells, Monday first.
    pub fn empty() -> Self {
        Self {
            days: WEEKDAY_LABELS
                .iter()
                .map(|label| WeekdayCell {
                    day: label.to_string(),
                    total: 0,
                    by_category: BTreeMap::new(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayCell {
    pub day: String,
    pub total: u32,
    pub by_category: BTreeMap<MetricCategory, u32>,
}

/// A recently flagged case with its flag list attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentFlaggedCase {
    pub case_id: String,
    pub date: NaiveDate,
    pub surgeon_id: String,
    pub room_id: String,
    pub flags: Vec<Flag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round1_is_one_decimal() {
        assert_eq!(round1(20.04), 20.0);
        assert_eq!(round1(20.06), 20.1);
        assert_eq!(round1(-3.26), -3.3);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn pct_guards_empty_denominator() {
        assert_eq!(pct(2, 10), 20.0);
        assert_eq!(pct(0, 0), 0.0);
        assert_eq!(pct(3, 0), 0.0);
    }

    #[test]
    fn empty_heatmap_is_monday_first() {
        let heatmap = WeekdayHeatmap::empty();
        assert_eq!(heatmap.days.len(), 7);
        assert_eq!(heatmap.days[0].day, "Mon");
        assert_eq!(heatmap.days[6].day, "Sun");
        assert!(heatmap.days.iter().all(|d| d.total == 0));
    }
}
