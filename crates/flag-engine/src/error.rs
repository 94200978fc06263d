//! Engine error taxonomy
//!
//! Every variant is a per-item condition: a rule or a (rule, case) pair is
//! skipped and the run continues. Nothing here aborts an evaluation.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The rule references a metric that is neither in the static catalog
    /// nor a known dynamic cost-category metric. The rule is skipped.
    #[error("metric `{metric_id}` is not registered and is not a facility cost-category metric")]
    MetricNotFound { metric_id: String },

    /// The scoped population held no usable samples. The (rule, case) pair
    /// is skipped without counting as flagged or unflagged.
    #[error("no baseline population for metric `{metric_id}` in {scope} scope")]
    InsufficientBaselineData { metric_id: String, scope: String },

    /// The case lacks data the metric needs, e.g. a missing milestone
    /// timestamp on a timing metric. The case is skipped for that rule only.
    #[error("case data incomplete: missing `{field}`")]
    IncompleteMilestoneData { field: String },

    /// Structurally invalid rule, rejected when the working set is formed
    /// and never evaluated.
    #[error("rule `{rule_id}` is malformed: {detail}")]
    MalformedRule { rule_id: String, detail: String },
}

/// One skipped item from a best-effort run, reported alongside the result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkipDiagnostic {
    pub rule_id: String,
    /// `None` when the whole rule was skipped rather than one case.
    pub case_id: Option<String>,
    pub reason: String,
}

impl SkipDiagnostic {
    pub fn for_rule(rule_id: impl Into<String>, err: &EngineError) -> Self {
        Self {
            rule_id: rule_id.into(),
            case_id: None,
            reason: err.to_string(),
        }
    }

    pub fn for_case(
        rule_id: impl Into<String>,
        case_id: impl Into<String>,
        err: &EngineError,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            case_id: Some(case_id.into()),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_item() {
        let err = EngineError::MetricNotFound {
            metric_id: "cost_category_bogus".to_string(),
        };
        assert!(err.to_string().contains("cost_category_bogus"));

        let err = EngineError::MalformedRule {
            rule_id: "rule-3".to_string(),
            detail: "`between` requires both threshold bounds".to_string(),
        };
        assert!(err.to_string().contains("rule-3"));
        assert!(err.to_string().contains("both threshold bounds"));
    }

    #[test]
    fn diagnostics_distinguish_rule_and_case_skips() {
        let err = EngineError::IncompleteMilestoneData {
            field: "incision".to_string(),
        };
        let rule_skip = SkipDiagnostic::for_rule("rule-1", &err);
        assert_eq!(rule_skip.case_id, None);
        let case_skip = SkipDiagnostic::for_case("rule-1", "case-7", &err);
        assert_eq!(case_skip.case_id.as_deref(), Some("case-7"));
        assert!(case_skip.reason.contains("incision"));
    }
}
