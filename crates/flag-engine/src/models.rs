//! Core data models shared across the engine

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Severity assigned to a rule and carried onto the flags it produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// How a flag was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    /// A configured rule's threshold triggered
    Threshold,
    /// A manually recorded delay merged into the run
    Delay,
}

/// Financial primitives stored on a completed case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaseFinancials {
    pub reimbursement: f64,
    pub total_cost: f64,
}

impl CaseFinancials {
    pub fn profit(&self) -> f64 {
        self.reimbursement - self.total_cost
    }
}

/// One fully hydrated surgical case. Read-only input to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub date: NaiveDate,
    pub surgeon_id: String,
    pub room_id: String,
    pub procedure_id: String,
    /// Milestone name to timestamp; absent entries mean the milestone
    /// was never recorded for this case.
    #[serde(default)]
    pub milestones: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub financials: Option<CaseFinancials>,
    /// Per-cost-category spend, keyed by cost category id.
    #[serde(default)]
    pub cost_amounts: BTreeMap<String, f64>,
}

/// A manually recorded delay against a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualDelay {
    pub case_id: String,
    pub delay_type: String,
    pub duration_minutes: f64,
}

/// One rule (or manual delay) triggering against one case.
///
/// A given (case, rule) pair produces at most one flag per evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    pub case_id: String,
    pub rule_id: String,
    /// Rule name for threshold flags, delay type name for delay flags.
    pub label: String,
    pub metric_value: f64,
    /// Resolved numeric cutoff; for `between` rules this is the violated
    /// bound, for delay flags there is none.
    pub effective_threshold: Option<f64>,
    pub severity: Severity,
    pub flag_type: FlagType,
    /// Metric category the flag counts under in the day-of-week heatmap.
    pub category: crate::metrics::MetricCategory,
}

impl Flag {
    /// Deduplication key for consumers persisting flags across
    /// overlapping evaluation windows.
    pub fn idempotency_key(&self, window_key: &str) -> String {
        format!("{}:{}:{}", self.case_id, self.rule_id, window_key)
    }
}

/// Half-open evaluation window `[start, end)` over case dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EvaluationWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn len_days(&self) -> i64 {
        self.end.signed_duration_since(self.start).num_days().max(1)
    }

    /// The comparable window immediately preceding this one, same length.
    pub fn prior(&self) -> EvaluationWindow {
        EvaluationWindow {
            start: self.start - Duration::days(self.len_days()),
            end: self.start,
        }
    }

    /// Stable key identifying this window in flag idempotency keys.
    pub fn key(&self) -> String {
        format!("{}..{}", self.start, self.end)
    }
}

/// Who owns a catalog entry: the shared static catalog or one facility's
/// synthesized cost-category metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityScope {
    Global,
    Facility(String),
}

/// A facility-configured cost category, fed into dynamic metric synthesis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCategory {
    pub id: String,
    pub name: String,
}

/// Facility context a run resolves metrics against
#[derive(Debug, Clone, PartialEq)]
pub struct FacilityContext {
    pub facility_id: String,
    pub cost_categories: Vec<CostCategory>,
}

impl FacilityContext {
    pub fn new(facility_id: impl Into<String>, cost_categories: Vec<CostCategory>) -> Self {
        Self {
            facility_id: facility_id.into(),
            cost_categories,
        }
    }

    pub fn cost_category(&self, id: &str) -> Option<&CostCategory> {
        self.cost_categories.iter().find(|c| c.id == id)
    }
}
