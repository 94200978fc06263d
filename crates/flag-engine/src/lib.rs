//! Flag rule evaluation and anomaly pattern detection over surgical
//! operations data.
//!
//! The pipeline is a pure, single-threaded pass: facility-configured
//! rules are resolved against a metric catalog, evaluated per case with
//! memoized baseline statistics, merged with manually recorded delays,
//! folded into a dashboard aggregate, and finally scanned for
//! higher-order anomaly patterns. All inputs arrive through the trait
//! seams in [`sources`]; nothing here performs I/O.

pub mod aggregate;
pub mod baseline;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod patterns;
pub mod rules;
pub mod sources;
pub mod stats;
pub mod threshold;

pub use aggregate::{AggregatedResult, FlagAggregator};
pub use config::{DetectorConfig, EngineConfig};
pub use error::{EngineError, SkipDiagnostic};
pub use metrics::{MetricCatalog, MetricCategory, MetricDefinition};
pub use models::*;
pub use patterns::{detect_patterns, DetectedPattern, PatternKind, PatternSeverity};
pub use rules::{ComparisonScope, FlagRule, MilestoneOverride, Operator, ThresholdKind};
pub use sources::{CostCategoryProvider, DataGateway, EvaluationReport, FlagEngine, RuleStore};
