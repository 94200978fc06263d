//! Per-case metric value computation
//!
//! Turns one metric definition plus one case record into a number, or a
//! typed skip reason when the case lacks the data the metric needs.

use chrono::{DateTime, Utc};

use super::{CompletionStat, MetricDefinition, MetricSource};
use crate::error::EngineError;
use crate::models::CaseRecord;
use crate::rules::MilestoneOverride;

/// Caller-supplied source for metrics derived outside a single case
/// record, such as adjacency-based room turnover or first-case delay.
pub trait ComputedMetricSource {
    /// Value of the computed metric `key` for `case`, `None` when it
    /// cannot be derived for this case.
    fn value(&self, key: &str, case: &CaseRecord) -> Option<f64>;
}

/// Source with no computed metrics; every lookup is incomplete data.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoComputedMetrics;

impl ComputedMetricSource for NoComputedMetrics {
    fn value(&self, _key: &str, _case: &CaseRecord) -> Option<f64> {
        None
    }
}

/// Compute `def`'s value for `case`, honoring a rule's milestone override
/// on milestone-delta metrics.
pub fn metric_value(
    def: &MetricDefinition,
    case: &CaseRecord,
    milestone_override: Option<&MilestoneOverride>,
    computed: &dyn ComputedMetricSource,
) -> Result<f64, EngineError> {
    match &def.source {
        MetricSource::MilestoneDelta { start, end } => {
            let (start, end) = match milestone_override {
                Some(o) => (o.start.as_str(), o.end.as_str()),
                None => (start.as_str(), end.as_str()),
            };
            milestone_delta_minutes(case, start, end)
        }
        MetricSource::CompletionStat { stat } => completion_stat(case, *stat),
        MetricSource::Computed { key } => computed
            .value(key, case)
            .ok_or_else(|| incomplete(key)),
        MetricSource::MilestoneCount { expected } => {
            Ok(milestone_deviations(case, expected) as f64)
        }
        MetricSource::CostCategoryAmount { category_id } => case
            .cost_amounts
            .get(category_id)
            .copied()
            .ok_or_else(|| incomplete(category_id)),
    }
}

fn incomplete(field: &str) -> EngineError {
    EngineError::IncompleteMilestoneData {
        field: field.to_string(),
    }
}

fn milestone_delta_minutes(case: &CaseRecord, start: &str, end: &str) -> Result<f64, EngineError> {
    let start_ts = case.milestones.get(start).ok_or_else(|| incomplete(start))?;
    let end_ts = case.milestones.get(end).ok_or_else(|| incomplete(end))?;
    Ok(end_ts.signed_duration_since(*start_ts).num_seconds() as f64 / 60.0)
}

fn completion_stat(case: &CaseRecord, stat: CompletionStat) -> Result<f64, EngineError> {
    let financials = case
        .financials
        .as_ref()
        .ok_or_else(|| incomplete("completion_financials"))?;
    match stat {
        CompletionStat::Reimbursement => Ok(financials.reimbursement),
        CompletionStat::TotalCost => Ok(financials.total_cost),
        CompletionStat::ContributionMargin => {
            if financials.reimbursement == 0.0 {
                return Err(incomplete("reimbursement"));
            }
            Ok(financials.profit() / financials.reimbursement * 100.0)
        }
    }
}

/// Missing expected milestones plus adjacent recorded pairs whose
/// timestamps run backwards.
fn milestone_deviations(case: &CaseRecord, expected: &[String]) -> u32 {
    let mut missing = 0u32;
    let mut out_of_sequence = 0u32;
    let mut last_seen: Option<DateTime<Utc>> = None;

    for name in expected {
        match case.milestones.get(name) {
            None => missing += 1,
            Some(ts) => {
                if let Some(prev) = last_seen {
                    if *ts < prev {
                        out_of_sequence += 1;
                    }
                }
                last_seen = Some(*ts);
            }
        }
    }

    missing + out_of_sequence
}
