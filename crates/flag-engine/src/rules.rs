//! Flag rule model and load-time validation
//!
//! Structural problems (a `between` rule missing a bound, an upper bound
//! on a non-range rule) are rejected when the working set is formed and
//! never reach evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, SkipDiagnostic};
use crate::metrics::MetricCategory;
use crate::models::Severity;

/// Comparison operator applied to a case value and its resolved threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Exact comparison arithmetic; ties resolve per operator (`gte`
    /// flags on equality, `gt` does not).
    pub fn compare(self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::Gt => value > threshold,
            Operator::Gte => value >= threshold,
            Operator::Lt => value < threshold,
            Operator::Lte => value <= threshold,
        }
    }
}

/// Statistical semantics used to derive a rule's numeric cutoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Absolute,
    MedianPlusSd,
    MedianPlusOffset,
    PercentageOfMedian,
    Percentile,
    Between,
}

impl ThresholdKind {
    /// Whether evaluation needs population statistics for the rule's scope.
    pub fn needs_baseline(self) -> bool {
        !matches!(self, ThresholdKind::Absolute | ThresholdKind::Between)
    }
}

/// Whether a rule's baseline population is per-surgeon or facility-wide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonScope {
    Personal,
    Facility,
}

impl std::fmt::Display for ComparisonScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonScope::Personal => write!(f, "personal"),
            ComparisonScope::Facility => write!(f, "facility"),
        }
    }
}

/// Per-rule replacement of a milestone-delta metric's endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneOverride {
    pub start: String,
    pub end: String,
}

/// One facility-configured flag rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRule {
    pub id: String,
    pub facility_id: String,
    pub name: String,
    pub category: MetricCategory,
    pub metric_id: String,
    #[serde(default)]
    pub milestone_override: Option<MilestoneOverride>,
    pub operator: Operator,
    pub threshold_kind: ThresholdKind,
    pub threshold_value: f64,
    /// Upper bound, required by `between` and forbidden elsewhere.
    #[serde(default)]
    pub threshold_value_max: Option<f64>,
    pub scope: ComparisonScope,
    pub severity: Severity,
    pub enabled: bool,
    pub active: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FlagRule {
    /// Whether the rule belongs in the working set before validation.
    pub fn is_live(&self) -> bool {
        self.enabled && self.active && self.deleted_at.is_none()
    }

    /// Structural validation applied when the working set is formed.
    pub fn validate(&self) -> Result<(), EngineError> {
        let malformed = |detail: String| EngineError::MalformedRule {
            rule_id: self.id.clone(),
            detail,
        };

        match self.threshold_kind {
            ThresholdKind::Between => {
                let max = self.threshold_value_max.ok_or_else(|| {
                    malformed("`between` requires both threshold bounds".to_string())
                })?;
                if max < self.threshold_value {
                    return Err(malformed(format!(
                        "`between` bounds are inverted ({} > {})",
                        self.threshold_value, max
                    )));
                }
            }
            kind => {
                if self.threshold_value_max.is_some() {
                    return Err(malformed(format!(
                        "threshold type `{kind:?}` must not carry an upper bound"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Filter to the enforceable working set: enabled, active, not
/// soft-deleted, structurally valid. Malformed rules are rejected here
/// with a diagnostic, never evaluated.
pub fn working_set(rules: Vec<FlagRule>) -> (Vec<FlagRule>, Vec<SkipDiagnostic>) {
    let mut kept = Vec::with_capacity(rules.len());
    let mut rejected = Vec::new();

    for rule in rules {
        if !rule.is_live() {
            continue;
        }
        match rule.validate() {
            Ok(()) => kept.push(rule),
            Err(err) => {
                warn!(rule_id = %rule.id, %err, "rejected malformed rule");
                rejected.push(SkipDiagnostic::for_rule(rule.id.clone(), &err));
            }
        }
    }

    (kept, rejected)
}
