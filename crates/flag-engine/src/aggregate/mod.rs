//! Flag aggregation across rules and cases
//!
//! Orchestrates metric resolution, baseline computation, and threshold
//! evaluation for one facility window, merges manual delays, and folds
//! everything into the dashboard aggregate. Always best-effort: per-item
//! failures become diagnostics, never aborts.

mod output;

pub use output::{
    AggregatedResult, DelayBreakdownRow, EntityBreakdownRow, IssueBreakdownRow, RecentFlaggedCase,
    SeverityCounts, Sparklines, SummaryKpis, WeekdayCell, WeekdayHeatmap, WEEKDAY_LABELS,
};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::baseline::BaselineCalculator;
use crate::config::EngineConfig;
use crate::error::{EngineError, SkipDiagnostic};
use crate::metrics::{
    metric_value, ComputedMetricSource, MetricCatalog, MetricCategory, MetricDefinition,
};
use crate::models::{
    CaseRecord, EvaluationWindow, FacilityContext, Flag, FlagType, ManualDelay,
};
use crate::rules::{working_set, FlagRule};
use crate::threshold;
use output::{pct, round1};

/// Evaluates the rule working set over a case population and aggregates
/// the resulting flags.
pub struct FlagAggregator<'a> {
    catalog: &'a MetricCatalog,
    context: FacilityContext,
    config: EngineConfig,
    computed: &'a dyn ComputedMetricSource,
}

impl<'a> FlagAggregator<'a> {
    pub fn new(
        catalog: &'a MetricCatalog,
        context: FacilityContext,
        config: EngineConfig,
        computed: &'a dyn ComputedMetricSource,
    ) -> Self {
        Self {
            catalog,
            context,
            config,
            computed,
        }
    }

    /// Evaluate every working-set rule against every case in `window`,
    /// merge `manual_delays`, and aggregate. `cases` must cover the
    /// window plus its comparable prior period; cases before the window
    /// start form the baseline population.
    pub fn aggregate(
        &self,
        rules: Vec<FlagRule>,
        cases: &[CaseRecord],
        manual_delays: &[ManualDelay],
        window: &EvaluationWindow,
    ) -> AggregatedResult {
        let (rules, mut diagnostics) = working_set(rules);
        let prior_window = window.prior();
        let current: Vec<&CaseRecord> = cases.iter().filter(|c| window.contains(c.date)).collect();
        let prior_cases: Vec<&CaseRecord> = cases
            .iter()
            .filter(|c| prior_window.contains(c.date))
            .collect();
        let history: Vec<&CaseRecord> = cases.iter().filter(|c| c.date < window.start).collect();

        let mut calculator = BaselineCalculator::new();
        let mut flags: Vec<Flag> = Vec::new();
        let mut prior_flags: Vec<Flag> = Vec::new();

        for rule in &rules {
            let resolved = match self.catalog.resolve(&rule.metric_id, &self.context) {
                Ok(resolved) => resolved,
                Err(err) => {
                    warn!(rule_id = %rule.id, %err, "skipping rule");
                    diagnostics.push(SkipDiagnostic::for_rule(rule.id.clone(), &err));
                    continue;
                }
            };
            let def = resolved.definition();

            for case in &current {
                match self.evaluate_case(rule, def, case, &history, &mut calculator) {
                    Ok(Some(flag)) => flags.push(flag),
                    Ok(None) => {}
                    Err(err) => {
                        debug!(rule_id = %rule.id, case_id = %case.id, %err, "skipping case");
                        diagnostics.push(SkipDiagnostic::for_case(
                            rule.id.clone(),
                            case.id.clone(),
                            &err,
                        ));
                    }
                }
            }

            // the prior period is evaluated only to derive trend rates;
            // its skips do not belong to this window's diagnostics
            for case in &prior_cases {
                if let Ok(Some(flag)) =
                    self.evaluate_case(rule, def, case, &history, &mut calculator)
                {
                    prior_flags.push(flag);
                }
            }
        }

        self.merge_delays(
            manual_delays,
            &current,
            &prior_cases,
            &mut flags,
            &mut prior_flags,
        );

        self.build_result(
            &current,
            &prior_cases,
            flags,
            prior_flags,
            diagnostics,
            window,
        )
    }

    fn evaluate_case(
        &self,
        rule: &FlagRule,
        def: &MetricDefinition,
        case: &CaseRecord,
        history: &[&CaseRecord],
        calculator: &mut BaselineCalculator,
    ) -> Result<Option<Flag>, EngineError> {
        let value = metric_value(def, case, rule.milestone_override.as_ref(), self.computed)?;
        let baseline = if rule.threshold_kind.needs_baseline() {
            Some(calculator.baseline_for(rule, def, case, history, self.computed)?)
        } else {
            None
        };
        let verdict = threshold::evaluate(rule, value, baseline)?;
        if !verdict.flagged {
            return Ok(None);
        }
        Ok(Some(Flag {
            case_id: case.id.clone(),
            rule_id: rule.id.clone(),
            label: rule.name.clone(),
            metric_value: value,
            effective_threshold: verdict.effective_threshold,
            severity: rule.severity,
            flag_type: FlagType::Threshold,
            category: rule.category,
        }))
    }

    /// Manual delays share the same per-case and severity accounting as
    /// threshold flags, with severity derived from duration.
    fn merge_delays(
        &self,
        manual_delays: &[ManualDelay],
        current: &[&CaseRecord],
        prior_cases: &[&CaseRecord],
        flags: &mut Vec<Flag>,
        prior_flags: &mut Vec<Flag>,
    ) {
        let current_ids: BTreeSet<&str> = current.iter().map(|c| c.id.as_str()).collect();
        let prior_ids: BTreeSet<&str> = prior_cases.iter().map(|c| c.id.as_str()).collect();

        for delay in manual_delays {
            let flag = Flag {
                case_id: delay.case_id.clone(),
                rule_id: format!("delay:{}", delay.delay_type),
                label: delay.delay_type.clone(),
                metric_value: delay.duration_minutes,
                effective_threshold: None,
                severity: self.config.delay_severity(delay.duration_minutes),
                flag_type: FlagType::Delay,
                category: MetricCategory::Efficiency,
            };
            if current_ids.contains(delay.case_id.as_str()) {
                flags.push(flag);
            } else if prior_ids.contains(delay.case_id.as_str()) {
                prior_flags.push(flag);
            } else {
                debug!(
                    case_id = %delay.case_id,
                    delay_type = %delay.delay_type,
                    "manual delay references a case outside the fetched range"
                );
            }
        }
    }

    fn build_result(
        &self,
        current: &[&CaseRecord],
        prior_cases: &[&CaseRecord],
        mut flags: Vec<Flag>,
        prior_flags: Vec<Flag>,
        diagnostics: Vec<SkipDiagnostic>,
        window: &EvaluationWindow,
    ) -> AggregatedResult {
        // deterministic flag order regardless of input case ordering
        flags.sort_by(|a, b| {
            a.case_id
                .cmp(&b.case_id)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });

        let total_cases = current.len();
        let case_index: BTreeMap<&str, &CaseRecord> =
            current.iter().map(|c| (c.id.as_str(), *c)).collect();
        let mut by_case: BTreeMap<&str, Vec<&Flag>> = BTreeMap::new();
        for flag in &flags {
            by_case.entry(flag.case_id.as_str()).or_default().push(flag);
        }

        let flagged_cases = by_case.len();
        let raw_rate = pct(flagged_cases, total_cases);

        let prior_flagged: BTreeSet<&str> =
            prior_flags.iter().map(|f| f.case_id.as_str()).collect();
        let prior_rate = pct(prior_flagged.len(), prior_cases.len());

        let mut severity_counts = SeverityCounts::default();
        for flag in &flags {
            severity_counts.record(flag.severity);
        }

        let total_flags = flags.len();
        let delay_minutes: f64 = flags
            .iter()
            .filter(|f| f.flag_type == FlagType::Delay)
            .map(|f| f.metric_value)
            .sum();

        let rule_breakdown = rule_breakdown(&flags, total_flags);
        let delay_breakdown = delay_breakdown(&flags, total_flags);
        let surgeon_breakdown = entity_rows(
            |c| c.surgeon_id.as_str(),
            current,
            prior_cases,
            &flags,
            &prior_flags,
        );
        let room_breakdown = entity_rows(
            |c| c.room_id.as_str(),
            current,
            prior_cases,
            &flags,
            &prior_flags,
        );

        let sparklines = self.sparklines(current, &by_case, window);
        let heatmap = heatmap(&flags, &case_index);
        let recent_cases = self.recent_cases(&by_case, &case_index);

        info!(
            facility = %self.context.facility_id,
            window = %window.key(),
            total_cases,
            flagged_cases,
            total_flags,
            skipped = diagnostics.len(),
            "aggregated flag evaluation"
        );

        AggregatedResult {
            window_key: window.key(),
            summary: SummaryKpis {
                total_cases,
                flagged_cases,
                flag_rate: round1(raw_rate),
                trend_points: round1(raw_rate - prior_rate),
                total_flags,
                delay_minutes: round1(delay_minutes),
            },
            severity_counts,
            rule_breakdown,
            delay_breakdown,
            surgeon_breakdown,
            room_breakdown,
            sparklines,
            heatmap,
            recent_cases,
            diagnostics,
        }
    }

    fn sparklines(
        &self,
        current: &[&CaseRecord],
        by_case: &BTreeMap<&str, Vec<&Flag>>,
        window: &EvaluationWindow,
    ) -> Sparklines {
        let points = self.config.sparkline_points.max(1);
        let mut cases_per = vec![0usize; points];
        let mut flagged_per = vec![0usize; points];
        let mut flags_per = vec![0f64; points];
        let mut delay_per = vec![0f64; points];

        for case in current {
            let idx = bucket_index(case.date, window, points);
            cases_per[idx] += 1;
            if let Some(case_flags) = by_case.get(case.id.as_str()) {
                flagged_per[idx] += 1;
                flags_per[idx] += case_flags.len() as f64;
                delay_per[idx] += case_flags
                    .iter()
                    .filter(|f| f.flag_type == FlagType::Delay)
                    .map(|f| f.metric_value)
                    .sum::<f64>();
            }
        }

        Sparklines {
            flag_count: flags_per,
            flag_rate: (0..points)
                .map(|i| round1(pct(flagged_per[i], cases_per[i])))
                .collect(),
            delay_minutes: delay_per.into_iter().map(round1).collect(),
        }
    }

    fn recent_cases(
        &self,
        by_case: &BTreeMap<&str, Vec<&Flag>>,
        case_index: &BTreeMap<&str, &CaseRecord>,
    ) -> Vec<RecentFlaggedCase> {
        let mut rows: Vec<RecentFlaggedCase> = by_case
            .iter()
            .filter_map(|(case_id, case_flags)| {
                case_index.get(case_id).map(|case| RecentFlaggedCase {
                    case_id: case.id.clone(),
                    date: case.date,
                    surgeon_id: case.surgeon_id.clone(),
                    room_id: case.room_id.clone(),
                    flags: case_flags.iter().map(|f| (*f).clone()).collect(),
                })
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.case_id.cmp(&b.case_id)));
        rows.truncate(self.config.recent_case_limit);
        rows
    }
}

fn rule_breakdown(flags: &[Flag], total_flags: usize) -> Vec<IssueBreakdownRow> {
    let mut groups: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for flag in flags.iter().filter(|f| f.flag_type == FlagType::Threshold) {
        *groups
            .entry((flag.rule_id.as_str(), flag.label.as_str()))
            .or_default() += 1;
    }
    let mut rows: Vec<IssueBreakdownRow> = groups
        .into_iter()
        .map(|((rule_id, label), count)| IssueBreakdownRow {
            rule_id: rule_id.to_string(),
            rule_name: label.to_string(),
            count,
            share_pct: round1(pct(count, total_flags)),
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.rule_id.cmp(&b.rule_id)));
    rows
}

fn delay_breakdown(flags: &[Flag], total_flags: usize) -> Vec<DelayBreakdownRow> {
    let mut groups: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for flag in flags.iter().filter(|f| f.flag_type == FlagType::Delay) {
        let entry = groups.entry(flag.label.as_str()).or_default();
        entry.0 += 1;
        entry.1 += flag.metric_value;
    }
    let mut rows: Vec<DelayBreakdownRow> = groups
        .into_iter()
        .map(|(delay_type, (count, minutes))| DelayBreakdownRow {
            delay_type: delay_type.to_string(),
            count,
            total_minutes: round1(minutes),
            share_pct: round1(pct(count, total_flags)),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.delay_type.cmp(&b.delay_type))
    });
    rows
}

/// Per-surgeon or per-room rows, sorted by flag rate descending with id
/// as the tiebreak. Entities are taken from the current window only.
fn entity_rows(
    key: fn(&CaseRecord) -> &str,
    current: &[&CaseRecord],
    prior_cases: &[&CaseRecord],
    flags: &[Flag],
    prior_flags: &[Flag],
) -> Vec<EntityBreakdownRow> {
    #[derive(Default)]
    struct Acc<'x> {
        total: usize,
        flagged: BTreeSet<&'x str>,
        flag_count: usize,
        issues: BTreeMap<&'x str, usize>,
        prior_total: usize,
        prior_flagged: BTreeSet<&'x str>,
    }

    let case_entity: BTreeMap<&str, &str> =
        current.iter().map(|c| (c.id.as_str(), key(c))).collect();
    let prior_case_entity: BTreeMap<&str, &str> =
        prior_cases.iter().map(|c| (c.id.as_str(), key(c))).collect();

    let mut acc: BTreeMap<&str, Acc> = BTreeMap::new();
    for case in current {
        acc.entry(key(case)).or_default().total += 1;
    }
    for case in prior_cases {
        if let Some(entry) = acc.get_mut(key(case)) {
            entry.prior_total += 1;
        }
    }
    for flag in flags {
        if let Some(entity) = case_entity.get(flag.case_id.as_str()) {
            let entry = acc.entry(entity).or_default();
            entry.flag_count += 1;
            entry.flagged.insert(flag.case_id.as_str());
            *entry.issues.entry(flag.label.as_str()).or_default() += 1;
        }
    }
    for flag in prior_flags {
        if let Some(entity) = prior_case_entity.get(flag.case_id.as_str()) {
            if let Some(entry) = acc.get_mut(entity) {
                entry.prior_flagged.insert(flag.case_id.as_str());
            }
        }
    }

    let mut rows: Vec<EntityBreakdownRow> = acc
        .into_iter()
        .map(|(id, entry)| {
            let rate = pct(entry.flagged.len(), entry.total);
            let prior_rate = pct(entry.prior_flagged.len(), entry.prior_total);
            let top_issue = entry
                .issues
                .iter()
                .max_by(|(label_a, count_a), (label_b, count_b)| {
                    count_a.cmp(count_b).then_with(|| label_b.cmp(label_a))
                })
                .map(|(label, _)| label.to_string());
            EntityBreakdownRow {
                id: id.to_string(),
                total_cases: entry.total,
                flagged_cases: entry.flagged.len(),
                flag_rate: round1(rate),
                trend_points: round1(rate - prior_rate),
                flag_count: entry.flag_count,
                top_issue,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.flag_rate
            .partial_cmp(&a.flag_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}

fn heatmap(flags: &[Flag], case_index: &BTreeMap<&str, &CaseRecord>) -> WeekdayHeatmap {
    let mut heatmap = WeekdayHeatmap::empty();
    for flag in flags {
        if let Some(case) = case_index.get(flag.case_id.as_str()) {
            let idx = case.date.weekday().num_days_from_monday() as usize;
            let cell = &mut heatmap.days[idx];
            cell.total += 1;
            *cell.by_category.entry(flag.category).or_insert(0) += 1;
        }
    }
    heatmap
}

fn bucket_index(date: chrono::NaiveDate, window: &EvaluationWindow, points: usize) -> usize {
    let offset = date.signed_duration_since(window.start).num_days().max(0);
    let idx = (offset * points as i64 / window.len_days()) as usize;
    idx.min(points - 1)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::metrics::{milestones, MetricCatalog, MetricCategory, NoComputedMetrics};
    use crate::models::Severity;
    use crate::rules::{ComparisonScope, Operator, ThresholdKind};

    fn case(id: &str, date: NaiveDate, surgeon: &str, room: &str, total_minutes: i64) -> CaseRecord {
        let start = Utc
            .with_ymd_and_hms(date.year(), date.month(), date.day(), 8, 0, 0)
            .unwrap();
        let mut milestones_map = BTreeMap::new();
        milestones_map.insert(milestones::PATIENT_IN_ROOM.to_string(), start);
        milestones_map.insert(
            milestones::PATIENT_OUT_OF_ROOM.to_string(),
            start + Duration::minutes(total_minutes),
        );
        CaseRecord {
            id: id.to_string(),
            date,
            surgeon_id: surgeon.to_string(),
            room_id: room.to_string(),
            procedure_id: "proc-1".to_string(),
            milestones: milestones_map,
            financials: None,
            cost_amounts: BTreeMap::new(),
        }
    }

    fn absolute_rule(id: &str, threshold: f64) -> FlagRule {
        FlagRule {
            id: id.to_string(),
            facility_id: "fac-1".to_string(),
            name: "Long case".to_string(),
            category: MetricCategory::Timing,
            metric_id: "total_case_time".to_string(),
            milestone_override: None,
            operator: Operator::Gt,
            threshold_kind: ThresholdKind::Absolute,
            threshold_value: threshold,
            threshold_value_max: None,
            scope: ComparisonScope::Facility,
            severity: Severity::Warning,
            enabled: true,
            active: true,
            deleted_at: None,
        }
    }

    fn window() -> EvaluationWindow {
        EvaluationWindow::new(
            NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 16).unwrap(),
        )
    }

    fn aggregator<'a>(catalog: &'a MetricCatalog) -> FlagAggregator<'a> {
        FlagAggregator::new(
            catalog,
            FacilityContext::new("fac-1", vec![]),
            EngineConfig::default(),
            &NoComputedMetrics,
        )
    }

    fn day(offset: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 9).unwrap() + Duration::days(offset as i64)
    }

    #[test]
    fn absolute_rule_flags_exactly_the_exceeding_cases() {
        // scenario: 10 cases, values 200 and 210 exceed the 180 cutoff
        let catalog = MetricCatalog::builtin();
        let durations = [200, 210, 150, 100, 110, 120, 90, 130, 140, 105];
        let cases: Vec<CaseRecord> = durations
            .iter()
            .enumerate()
            .map(|(i, minutes)| {
                case(
                    &format!("c{i}"),
                    day((i % 5) as u64),
                    "surg-1",
                    "or-1",
                    *minutes,
                )
            })
            .collect();

        let result = aggregator(&catalog).aggregate(
            vec![absolute_rule("r1", 180.0)],
            &cases,
            &[],
            &window(),
        );

        assert_eq!(result.summary.total_cases, 10);
        assert_eq!(result.summary.flagged_cases, 2);
        assert_eq!(result.summary.flag_rate, 20.0);
        assert_eq!(result.summary.total_flags, 2);
        assert_eq!(result.severity_counts.warning, 2);
        assert_eq!(result.rule_breakdown.len(), 1);
        assert_eq!(result.rule_breakdown[0].count, 2);
        assert_eq!(result.rule_breakdown[0].share_pct, 100.0);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn empty_population_yields_zero_rate_not_division_error() {
        let catalog = MetricCatalog::builtin();
        let result =
            aggregator(&catalog).aggregate(vec![absolute_rule("r1", 180.0)], &[], &[], &window());
        assert_eq!(result.summary.total_cases, 0);
        assert_eq!(result.summary.flag_rate, 0.0);
        assert_eq!(result.summary.trend_points, 0.0);
    }

    #[test]
    fn personal_scope_without_history_skips_but_counts_cases() {
        // scenario: a surgeon with zero prior cases under a personal rule
        let catalog = MetricCatalog::builtin();
        let mut rule = absolute_rule("r1", 2.0);
        rule.threshold_kind = ThresholdKind::MedianPlusSd;
        rule.scope = ComparisonScope::Personal;

        let cases = vec![
            case("c1", day(0), "surg-9", "or-1", 200),
            case("c2", day(1), "surg-9", "or-1", 210),
        ];
        let result = aggregator(&catalog).aggregate(vec![rule], &cases, &[], &window());

        assert_eq!(result.summary.total_cases, 2);
        assert_eq!(result.summary.flagged_cases, 0);
        assert_eq!(result.summary.flag_rate, 0.0);
        // every (rule, case) pair is skipped with a reason
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result
            .diagnostics
            .iter()
            .all(|d| d.reason.contains("no baseline population")));
    }

    #[test]
    fn unresolvable_metric_skips_the_rule_not_the_run() {
        let catalog = MetricCatalog::builtin();
        let mut bad = absolute_rule("bad", 10.0);
        bad.metric_id = "no_such_metric".to_string();
        let good = absolute_rule("good", 180.0);

        let cases = vec![case("c1", day(0), "surg-1", "or-1", 200)];
        let result = aggregator(&catalog).aggregate(vec![bad, good], &cases, &[], &window());

        assert_eq!(result.summary.total_flags, 1);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].rule_id, "bad");
        assert_eq!(result.diagnostics[0].case_id, None);
    }

    #[test]
    fn manual_delays_merge_with_duration_derived_severity() {
        let catalog = MetricCatalog::builtin();
        let cases = vec![
            case("c1", day(0), "surg-1", "or-1", 100),
            case("c2", day(1), "surg-2", "or-2", 100),
        ];
        let delays = vec![
            ManualDelay {
                case_id: "c1".to_string(),
                delay_type: "Equipment failure".to_string(),
                duration_minutes: 50.0,
            },
            ManualDelay {
                case_id: "c2".to_string(),
                delay_type: "Late start".to_string(),
                duration_minutes: 20.0,
            },
            ManualDelay {
                case_id: "unknown".to_string(),
                delay_type: "Late start".to_string(),
                duration_minutes: 10.0,
            },
        ];

        let result = aggregator(&catalog).aggregate(
            vec![absolute_rule("r1", 180.0)],
            &cases,
            &delays,
            &window(),
        );

        assert_eq!(result.summary.total_flags, 2);
        assert_eq!(result.summary.flagged_cases, 2);
        assert_eq!(result.summary.delay_minutes, 70.0);
        assert_eq!(result.severity_counts.critical, 1);
        assert_eq!(result.severity_counts.warning, 1);
        assert_eq!(result.delay_breakdown.len(), 2);
        assert_eq!(result.delay_breakdown[0].count, 1);
        assert!(result
            .recent_cases
            .iter()
            .all(|c| c.flags.iter().all(|f| f.flag_type == FlagType::Delay)));
    }

    #[test]
    fn trend_compares_current_and_prior_rates() {
        let catalog = MetricCatalog::builtin();
        let mut cases = Vec::new();
        // prior week: 1 of 10 flagged
        for i in 0..10 {
            let minutes = if i == 0 { 200 } else { 100 };
            cases.push(case(
                &format!("p{i}"),
                day(0) - Duration::days(7) + Duration::days((i % 5) as i64),
                "surg-1",
                "or-1",
                minutes,
            ));
        }
        // current week: 2 of 10 flagged
        for i in 0..10 {
            let minutes = if i < 2 { 200 } else { 100 };
            cases.push(case(
                &format!("c{i}"),
                day((i % 5) as u64),
                "surg-1",
                "or-1",
                minutes,
            ));
        }

        let result = aggregator(&catalog).aggregate(
            vec![absolute_rule("r1", 180.0)],
            &cases,
            &[],
            &window(),
        );
        assert_eq!(result.summary.flag_rate, 20.0);
        assert_eq!(result.summary.trend_points, 10.0);
    }

    #[test]
    fn entity_rows_sort_by_rate_and_carry_top_issue() {
        let catalog = MetricCatalog::builtin();
        let cases = vec![
            case("c1", day(0), "surg-1", "or-1", 200),
            case("c2", day(1), "surg-1", "or-1", 100),
            case("c3", day(2), "surg-2", "or-2", 200),
        ];
        let result = aggregator(&catalog).aggregate(
            vec![absolute_rule("r1", 180.0)],
            &cases,
            &[],
            &window(),
        );

        assert_eq!(result.surgeon_breakdown.len(), 2);
        // surg-2 flagged 1/1 = 100%, surg-1 flagged 1/2 = 50%
        assert_eq!(result.surgeon_breakdown[0].id, "surg-2");
        assert_eq!(result.surgeon_breakdown[0].flag_rate, 100.0);
        assert_eq!(
            result.surgeon_breakdown[0].top_issue.as_deref(),
            Some("Long case")
        );
        assert_eq!(result.surgeon_breakdown[1].id, "surg-1");
        assert_eq!(result.surgeon_breakdown[1].flag_rate, 50.0);
        assert_eq!(result.room_breakdown[0].id, "or-2");
    }

    #[test]
    fn one_flag_per_case_rule_pair_and_heatmap_counts_by_category() {
        let catalog = MetricCatalog::builtin();
        // Monday case flagged by two distinct rules
        let cases = vec![case("c1", day(0), "surg-1", "or-1", 200)];
        let result = aggregator(&catalog).aggregate(
            vec![absolute_rule("r1", 180.0), absolute_rule("r2", 190.0)],
            &cases,
            &[],
            &window(),
        );

        assert_eq!(result.summary.total_flags, 2);
        assert_eq!(result.summary.flagged_cases, 1);
        let monday = &result.heatmap.days[0];
        assert_eq!(monday.day, "Mon");
        assert_eq!(monday.total, 2);
        assert_eq!(monday.by_category.get(&MetricCategory::Timing), Some(&2));
        assert_eq!(result.heatmap.days[1].total, 0);
    }

    #[test]
    fn sparklines_have_fixed_length_and_bucketed_counts() {
        let catalog = MetricCatalog::builtin();
        let cases = vec![
            case("c1", day(0), "surg-1", "or-1", 200),
            case("c2", day(6), "surg-1", "or-1", 200),
        ];
        let result = aggregator(&catalog).aggregate(
            vec![absolute_rule("r1", 180.0)],
            &cases,
            &[],
            &window(),
        );

        assert_eq!(result.sparklines.flag_count.len(), 7);
        assert_eq!(result.sparklines.flag_count[0], 1.0);
        assert_eq!(result.sparklines.flag_count[6], 1.0);
        assert_eq!(result.sparklines.flag_rate[0], 100.0);
        assert_eq!(result.sparklines.flag_rate[3], 0.0);
    }
}
