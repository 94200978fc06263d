//! Threshold resolution and verdicts
//!
//! Applies one rule's operator and threshold semantics to a case value,
//! consulting the baseline only for the kinds that need one.

use crate::baseline::Baseline;
use crate::error::EngineError;
use crate::rules::{FlagRule, ThresholdKind};

/// Outcome of evaluating one rule against one case value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub flagged: bool,
    /// Resolved numeric cutoff; for `between` this is the violated bound,
    /// absent when an in-range value produced no cutoff to report.
    pub effective_threshold: Option<f64>,
}

/// Evaluate `rule` against `case_value`.
///
/// `absolute` verdicts depend only on the rule's threshold value and
/// never consult the baseline. `between` ignores the operator: flagged
/// iff the value falls outside the inclusive `[min, max]` range. A
/// baseline-dependent kind with no baseline yields a skip error, never a
/// panic.
pub fn evaluate(
    rule: &FlagRule,
    case_value: f64,
    baseline: Option<&Baseline>,
) -> Result<Verdict, EngineError> {
    let threshold = match rule.threshold_kind {
        ThresholdKind::Absolute => rule.threshold_value,
        ThresholdKind::Between => {
            let min = rule.threshold_value;
            // validated at rule load; the fallback collapses the range
            let max = rule.threshold_value_max.unwrap_or(min);
            return Ok(if case_value < min {
                Verdict {
                    flagged: true,
                    effective_threshold: Some(min),
                }
            } else if case_value > max {
                Verdict {
                    flagged: true,
                    effective_threshold: Some(max),
                }
            } else {
                Verdict {
                    flagged: false,
                    effective_threshold: None,
                }
            });
        }
        ThresholdKind::MedianPlusSd => {
            let b = dependent(rule, baseline)?;
            b.median + rule.threshold_value * b.std_dev
        }
        ThresholdKind::MedianPlusOffset => dependent(rule, baseline)?.median + rule.threshold_value,
        ThresholdKind::PercentageOfMedian => {
            dependent(rule, baseline)?.median * (1.0 + rule.threshold_value / 100.0)
        }
        ThresholdKind::Percentile => dependent(rule, baseline)?
            .percentile(rule.threshold_value)
            .ok_or_else(|| missing_baseline(rule))?,
    };

    Ok(Verdict {
        flagged: rule.operator.compare(case_value, threshold),
        effective_threshold: Some(threshold),
    })
}

fn dependent<'a>(
    rule: &FlagRule,
    baseline: Option<&'a Baseline>,
) -> Result<&'a Baseline, EngineError> {
    baseline.ok_or_else(|| missing_baseline(rule))
}

fn missing_baseline(rule: &FlagRule) -> EngineError {
    EngineError::InsufficientBaselineData {
        metric_id: rule.metric_id.clone(),
        scope: rule.scope.to_string(),
    }
}
