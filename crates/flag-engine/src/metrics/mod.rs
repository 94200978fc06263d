//! Metric catalog and resolution
//!
//! Registers the static metric definitions shared by every facility and
//! synthesizes per-facility cost-category metrics on demand. Resolution
//! happens once per rule per run, never per case.

mod value;

pub use value::{metric_value, ComputedMetricSource, NoComputedMetrics};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EngineError;
use crate::models::{FacilityContext, FacilityScope};

/// Well-known milestone names used by the static catalog
pub mod milestones {
    pub const PATIENT_IN_ROOM: &str = "patient_in_room";
    pub const ANESTHESIA_START: &str = "anesthesia_start";
    pub const INCISION: &str = "incision";
    pub const CLOSURE: &str = "closure";
    pub const PATIENT_OUT_OF_ROOM: &str = "patient_out_of_room";
}

/// Id prefix identifying a synthesized cost-category metric
pub const COST_METRIC_PREFIX: &str = "cost_category_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Timing,
    Efficiency,
    Financial,
    Quality,
}

impl std::fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricCategory::Timing => write!(f, "timing"),
            MetricCategory::Efficiency => write!(f, "efficiency"),
            MetricCategory::Financial => write!(f, "financial"),
            MetricCategory::Quality => write!(f, "quality"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricDataType {
    Minutes,
    Currency,
    Percentage,
    Count,
}

/// Completion-stat formulas over stored financial primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStat {
    /// profit / reimbursement x 100, unavailable when reimbursement is zero
    ContributionMargin,
    Reimbursement,
    TotalCost,
}

/// Where a metric's per-case value comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MetricSource {
    /// Minute difference between two named milestone timestamps
    MilestoneDelta { start: String, end: String },
    /// Pure formula over the case's completion financials
    CompletionStat { stat: CompletionStat },
    /// Delegated to a caller-supplied derivation (e.g. adjacency-based
    /// turnover, which needs the neighboring case)
    Computed { key: String },
    /// Count of missing-expected plus out-of-sequence milestones
    MilestoneCount { expected: Vec<String> },
    /// Direct lookup of one cost category's spend on the case
    CostCategoryAmount { category_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub id: String,
    pub name: String,
    pub category: MetricCategory,
    pub data_type: MetricDataType,
    pub source: MetricSource,
    pub supports_median: bool,
    pub cost_category_id: Option<String>,
    pub owner: FacilityScope,
}

/// A catalog entry resolved against one facility context
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedMetric<'a> {
    /// Immutable static catalog entry
    Static(&'a MetricDefinition),
    /// Synthesized per-facility cost-category entry, never reused across
    /// facilities
    Synthesized(MetricDefinition),
}

impl ResolvedMetric<'_> {
    pub fn definition(&self) -> &MetricDefinition {
        match self {
            ResolvedMetric::Static(def) => def,
            ResolvedMetric::Synthesized(def) => def,
        }
    }
}

/// The static metric registry, immutable after construction
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    entries: BTreeMap<String, MetricDefinition>,
}

impl MetricCatalog {
    /// Catalog with the built-in metrics across all four categories.
    pub fn builtin() -> Self {
        Self::with_entries(builtin_definitions())
    }

    pub fn with_entries(definitions: Vec<MetricDefinition>) -> Self {
        let entries = definitions
            .into_iter()
            .map(|def| (def.id.clone(), def))
            .collect();
        Self { entries }
    }

    pub fn get(&self, metric_id: &str) -> Option<&MetricDefinition> {
        self.entries.get(metric_id)
    }

    /// Resolve a rule's metric reference: static lookup first, then
    /// dynamic cost-category synthesis against the facility context.
    pub fn resolve<'a>(
        &'a self,
        metric_id: &str,
        context: &FacilityContext,
    ) -> Result<ResolvedMetric<'a>, EngineError> {
        if let Some(def) = self.entries.get(metric_id) {
            return Ok(ResolvedMetric::Static(def));
        }

        if let Some(category_id) = metric_id.strip_prefix(COST_METRIC_PREFIX) {
            if let Some(category) = context.cost_category(category_id) {
                debug!(
                    metric_id,
                    facility = %context.facility_id,
                    "synthesized cost-category metric"
                );
                return Ok(ResolvedMetric::Synthesized(MetricDefinition {
                    id: metric_id.to_string(),
                    name: format!("{} spend", category.name),
                    category: MetricCategory::Financial,
                    data_type: MetricDataType::Currency,
                    source: MetricSource::CostCategoryAmount {
                        category_id: category.id.clone(),
                    },
                    supports_median: true,
                    cost_category_id: Some(category.id.clone()),
                    owner: FacilityScope::Facility(context.facility_id.clone()),
                }));
            }
        }

        Err(EngineError::MetricNotFound {
            metric_id: metric_id.to_string(),
        })
    }
}

fn timing(id: &str, name: &str, start: &str, end: &str) -> MetricDefinition {
    MetricDefinition {
        id: id.to_string(),
        name: name.to_string(),
        category: MetricCategory::Timing,
        data_type: MetricDataType::Minutes,
        source: MetricSource::MilestoneDelta {
            start: start.to_string(),
            end: end.to_string(),
        },
        supports_median: true,
        cost_category_id: None,
        owner: FacilityScope::Global,
    }
}

fn builtin_definitions() -> Vec<MetricDefinition> {
    use milestones::*;

    vec![
        timing(
            "total_case_time",
            "Total case time",
            PATIENT_IN_ROOM,
            PATIENT_OUT_OF_ROOM,
        ),
        timing("surgical_time", "Surgical time", INCISION, CLOSURE),
        timing(
            "anesthesia_induction_time",
            "Anesthesia induction time",
            ANESTHESIA_START,
            INCISION,
        ),
        timing("closing_time", "Closing time", CLOSURE, PATIENT_OUT_OF_ROOM),
        MetricDefinition {
            id: "room_turnover_time".to_string(),
            name: "Room turnover time".to_string(),
            category: MetricCategory::Efficiency,
            data_type: MetricDataType::Minutes,
            source: MetricSource::Computed {
                key: "room_turnover_time".to_string(),
            },
            supports_median: true,
            cost_category_id: None,
            owner: FacilityScope::Global,
        },
        MetricDefinition {
            id: "first_case_delay".to_string(),
            name: "First case delay".to_string(),
            category: MetricCategory::Efficiency,
            data_type: MetricDataType::Minutes,
            source: MetricSource::Computed {
                key: "first_case_delay".to_string(),
            },
            supports_median: true,
            cost_category_id: None,
            owner: FacilityScope::Global,
        },
        MetricDefinition {
            id: "contribution_margin".to_string(),
            name: "Contribution margin".to_string(),
            category: MetricCategory::Financial,
            data_type: MetricDataType::Percentage,
            source: MetricSource::CompletionStat {
                stat: CompletionStat::ContributionMargin,
            },
            supports_median: true,
            cost_category_id: None,
            owner: FacilityScope::Global,
        },
        MetricDefinition {
            id: "reimbursement".to_string(),
            name: "Reimbursement".to_string(),
            category: MetricCategory::Financial,
            data_type: MetricDataType::Currency,
            source: MetricSource::CompletionStat {
                stat: CompletionStat::Reimbursement,
            },
            supports_median: true,
            cost_category_id: None,
            owner: FacilityScope::Global,
        },
        MetricDefinition {
            id: "milestone_completeness".to_string(),
            name: "Milestone completeness".to_string(),
            category: MetricCategory::Quality,
            data_type: MetricDataType::Count,
            source: MetricSource::MilestoneCount {
                expected: vec![
                    PATIENT_IN_ROOM.to_string(),
                    ANESTHESIA_START.to_string(),
                    INCISION.to_string(),
                    CLOSURE.to_string(),
                    PATIENT_OUT_OF_ROOM.to_string(),
                ],
            },
            supports_median: false,
            cost_category_id: None,
            owner: FacilityScope::Global,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostCategory;

    fn context() -> FacilityContext {
        FacilityContext::new(
            "fac-1",
            vec![CostCategory {
                id: "implants".to_string(),
                name: "Implants".to_string(),
            }],
        )
    }

    #[test]
    fn resolves_static_entries() {
        let catalog = MetricCatalog::builtin();
        let resolved = catalog.resolve("total_case_time", &context()).unwrap();
        let def = resolved.definition();
        assert_eq!(def.category, MetricCategory::Timing);
        assert_eq!(def.owner, FacilityScope::Global);
        assert!(matches!(resolved, ResolvedMetric::Static(_)));
    }

    #[test]
    fn synthesizes_cost_category_metric_for_known_category() {
        let catalog = MetricCatalog::builtin();
        let resolved = catalog
            .resolve("cost_category_implants", &context())
            .unwrap();
        let def = resolved.definition();
        assert_eq!(def.category, MetricCategory::Financial);
        assert_eq!(def.data_type, MetricDataType::Currency);
        assert_eq!(def.cost_category_id.as_deref(), Some("implants"));
        assert_eq!(def.owner, FacilityScope::Facility("fac-1".to_string()));
        assert!(matches!(resolved, ResolvedMetric::Synthesized(_)));
    }

    #[test]
    fn unknown_metric_is_metric_not_found() {
        let catalog = MetricCatalog::builtin();
        let err = catalog.resolve("no_such_metric", &context()).unwrap_err();
        assert!(matches!(err, EngineError::MetricNotFound { .. }));
    }

    #[test]
    fn unknown_cost_category_is_metric_not_found() {
        let catalog = MetricCatalog::builtin();
        let err = catalog
            .resolve("cost_category_anesthesia", &context())
            .unwrap_err();
        assert!(matches!(err, EngineError::MetricNotFound { .. }));
    }

    #[test]
    fn synthesis_is_per_facility() {
        let catalog = MetricCatalog::builtin();
        let other = FacilityContext::new("fac-2", vec![]);
        // fac-2 has no cost categories configured, so the same id misses
        assert!(catalog.resolve("cost_category_implants", &other).is_err());
    }
}
