//! Baseline statistics with per-run memoization
//!
//! A baseline summarizes a metric over a scoped historical population:
//! sample count, median, population standard deviation, and the full
//! sorted sample so percentile thresholds need no recomputation.

use std::collections::HashMap;

use tracing::debug;

use crate::error::EngineError;
use crate::metrics::{metric_value, ComputedMetricSource, MetricDefinition};
use crate::models::CaseRecord;
use crate::rules::{ComparisonScope, FlagRule, MilestoneOverride};
use crate::stats;

/// Population statistics for one (metric, scope, scope key)
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub sample_count: usize,
    pub median: f64,
    pub std_dev: f64,
    sorted: Vec<f64>,
}

impl Baseline {
    /// Build from raw sample values; `None` when the population is empty.
    pub fn from_values(values: Vec<f64>) -> Option<Baseline> {
        let sorted = stats::sort_values(values);
        let median = stats::median(&sorted)?;
        let std_dev = stats::population_std_dev(&sorted);
        Some(Baseline {
            sample_count: sorted.len(),
            median,
            std_dev,
            sorted,
        })
    }

    /// Interpolated percentile over the retained sorted sample.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        stats::percentile(&self.sorted, p)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BaselineKey {
    metric_fingerprint: String,
    scope: ComparisonScope,
    scope_key: String,
}

/// Computes and memoizes baselines within one evaluation run.
///
/// Empty populations are memoized too, so a scope with no history is
/// only scanned once per run.
#[derive(Debug, Default)]
pub struct BaselineCalculator {
    cache: HashMap<BaselineKey, Option<Baseline>>,
}

impl BaselineCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baseline for `rule` applied to `case`, computed over `history`
    /// (cases dated before the evaluation window). Personal scope
    /// restricts the population to the case's surgeon.
    pub fn baseline_for(
        &mut self,
        rule: &FlagRule,
        def: &MetricDefinition,
        case: &CaseRecord,
        history: &[&CaseRecord],
        computed: &dyn ComputedMetricSource,
    ) -> Result<&Baseline, EngineError> {
        let scope_key = match rule.scope {
            ComparisonScope::Personal => case.surgeon_id.clone(),
            ComparisonScope::Facility => rule.facility_id.clone(),
        };
        let key = BaselineKey {
            metric_fingerprint: metric_fingerprint(def, rule.milestone_override.as_ref()),
            scope: rule.scope,
            scope_key: scope_key.clone(),
        };

        if !self.cache.contains_key(&key) {
            let values: Vec<f64> = history
                .iter()
                .filter(|c| {
                    rule.scope == ComparisonScope::Facility || c.surgeon_id == case.surgeon_id
                })
                .filter_map(|c| {
                    metric_value(def, c, rule.milestone_override.as_ref(), computed).ok()
                })
                .collect();
            debug!(
                metric = %def.id,
                scope = %rule.scope,
                scope_key = %scope_key,
                samples = values.len(),
                "computed baseline"
            );
            self.cache.insert(key.clone(), Baseline::from_values(values));
        }

        match self.cache.get(&key).and_then(|b| b.as_ref()) {
            Some(baseline) => Ok(baseline),
            None => Err(EngineError::InsufficientBaselineData {
                metric_id: def.id.clone(),
                scope: rule.scope.to_string(),
            }),
        }
    }
}

/// Two rules on the same metric with different milestone overrides must
/// never share a baseline.
fn metric_fingerprint(def: &MetricDefinition, o: Option<&MilestoneOverride>) -> String {
    match o {
        Some(o) => format!("{}@{}..{}", def.id, o.start, o.end),
        None => def.id.clone(),
    }
}
