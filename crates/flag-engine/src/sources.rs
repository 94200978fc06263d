//! External collaborator interfaces and the engine entry point
//!
//! The engine never fetches anything itself; rules, cases, delays, and
//! cost categories arrive through these synchronous traits. `FlagEngine`
//! is the one place that wires them through resolve, aggregate, and
//! pattern detection.

use serde::Serialize;
use tracing::info;

use crate::aggregate::{AggregatedResult, FlagAggregator};
use crate::config::EngineConfig;
use crate::metrics::{ComputedMetricSource, MetricCatalog, NoComputedMetrics};
use crate::models::{CaseRecord, CostCategory, EvaluationWindow, FacilityContext, ManualDelay};
use crate::patterns::{detect_patterns, DetectedPattern};
use crate::rules::FlagRule;

/// Supplies the configured rule set for a facility.
pub trait RuleStore {
    fn list_active_rules(&self, facility_id: &str) -> Vec<FlagRule>;
}

/// Supplies hydrated case data.
///
/// `list_cases` must return the window's cases plus enough history for
/// baseline populations and the comparable prior period.
pub trait DataGateway {
    fn list_cases(&self, facility_id: &str, window: &EvaluationWindow) -> Vec<CaseRecord>;

    fn list_manual_delays(&self, facility_id: &str, window: &EvaluationWindow)
        -> Vec<ManualDelay>;
}

/// Supplies the facility's configured cost categories, which back the
/// dynamically synthesized cost metrics.
pub trait CostCategoryProvider {
    fn list_categories(&self, facility_id: &str) -> Vec<CostCategory>;
}

/// One full evaluation: the aggregate plus the patterns inferred from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub aggregated: AggregatedResult,
    pub patterns: Vec<DetectedPattern>,
}

/// Runs the full pipeline for one facility window.
pub struct FlagEngine<'a> {
    catalog: MetricCatalog,
    config: EngineConfig,
    computed: &'a dyn ComputedMetricSource,
}

impl Default for FlagEngine<'static> {
    fn default() -> Self {
        Self::new(
            MetricCatalog::builtin(),
            EngineConfig::default(),
            &NoComputedMetrics,
        )
    }
}

impl<'a> FlagEngine<'a> {
    pub fn new(
        catalog: MetricCatalog,
        config: EngineConfig,
        computed: &'a dyn ComputedMetricSource,
    ) -> Self {
        Self {
            catalog,
            config,
            computed,
        }
    }

    /// Evaluate one facility window end to end and report the aggregate
    /// with its detected patterns.
    pub fn run(
        &self,
        facility_id: &str,
        window: &EvaluationWindow,
        rules: &dyn RuleStore,
        data: &dyn DataGateway,
        categories: &dyn CostCategoryProvider,
    ) -> EvaluationReport {
        let rule_set = rules.list_active_rules(facility_id);
        let cases = data.list_cases(facility_id, window);
        let delays = data.list_manual_delays(facility_id, window);
        let context = FacilityContext::new(facility_id, categories.list_categories(facility_id));

        info!(
            facility = facility_id,
            window = %window.key(),
            rules = rule_set.len(),
            cases = cases.len(),
            delays = delays.len(),
            "starting flag evaluation"
        );

        let aggregator = FlagAggregator::new(
            &self.catalog,
            context,
            self.config.clone(),
            self.computed,
        );
        let aggregated = aggregator.aggregate(rule_set, &cases, &delays, window);
        let patterns = detect_patterns(&aggregated, &self.config.detector);

        EvaluationReport {
            aggregated,
            patterns,
        }
    }
}
