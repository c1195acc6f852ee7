use crate::aggregate::aggregate_with;
use crate::catalog::{attach_config, find_config, period_label, summarize};
use crate::resolver::{standard_table, StrategyTable};
use crate::scope::AreaScope;
use crate::types::{BatchPayload, DashboardStats, IndicatorConfig, IndicatorSummary};
use crate::util::{meets_threshold, percentage};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::Range;
use tracing::{debug, info};

/// Most recent report stamp seen in the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Freshness {
    pub timestamp: Option<NaiveDateTime>,
}

impl Freshness {
    /// Take the greatest `date_com` across every retained row. Stamps are
    /// compared as strings and only the winner is parsed, so a malformed
    /// maximum leaves the freshness unavailable.
    pub fn from_summaries(summaries: &[IndicatorSummary]) -> Self {
        let latest = summaries
            .iter()
            .flat_map(|summary| summary.rows.iter())
            .filter_map(|row| row.report_timestamp())
            .max();
        Self::from_stamp(latest.as_deref())
    }

    pub fn from_stamp(raw: Option<&str>) -> Self {
        Self {
            timestamp: raw.and_then(parse_report_stamp),
        }
    }

    pub fn display(&self) -> String {
        match self.timestamp {
            Some(ts) => ts.format("%-d %B %Y %H:%M").to_string(),
            None => "N/A".to_string(),
        }
    }
}

/// Parse a `YYYYMMDDhhmm` stamp. Anything else is `None`.
pub fn parse_report_stamp(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() != 12 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let field = |range: Range<usize>| raw.get(range).and_then(|s| s.parse::<u32>().ok());
    let year = i32::try_from(field(0..4)?).ok()?;
    NaiveDate::from_ymd_opt(year, field(4..6)?, field(6..8)?)?
        .and_hms_opt(field(8..10)?, field(10..12)?, 0)
}

/// Everything the presentation layer needs from one refresh.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summaries: Vec<IndicatorSummary>,
    pub freshness: Freshness,
    pub last_updated: String,
    pub current_quarter: u8,
}

/// Build every indicator summary with the standard strategy table.
pub fn build_all(
    configs: &[IndicatorConfig],
    payload: &BatchPayload,
    scope: &AreaScope,
) -> Dashboard {
    build_all_with(standard_table(), configs, payload, scope)
}

/// Filter, resolve, aggregate and attach configuration for every catalog
/// entry (in catalog order), then for payload indicators the catalog does
/// not know about.
///
/// Missing row data is an empty row set, so every indicator yields a
/// summary.
pub fn build_all_with(
    table: &StrategyTable,
    configs: &[IndicatorConfig],
    payload: &BatchPayload,
    scope: &AreaScope,
) -> Dashboard {
    let current_quarter = payload.meta.current_quarter;

    let mut ordered: Vec<&IndicatorConfig> = configs.iter().collect();
    ordered.sort_by_key(|config| config.order);

    let mut summaries = Vec::with_capacity(ordered.len() + payload.indicators.len());
    for config in ordered {
        let quarterly = config.quarterly || payload.is_quarterly(&config.indicator_id);
        summaries.push(build_one(
            table,
            &config.indicator_id,
            Some(config),
            payload,
            scope,
            quarterly,
            current_quarter,
        ));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for entry in &payload.indicators {
        let id = entry.indicator_id.as_str();
        if find_config(configs, id).is_some() || !seen.insert(id) {
            continue;
        }
        debug!(indicator = id, "indicator has no catalog entry");
        summaries.push(build_one(
            table,
            id,
            None,
            payload,
            scope,
            payload.is_quarterly(id),
            current_quarter,
        ));
    }

    let freshness = Freshness::from_summaries(&summaries);
    let in_scope: usize = summaries.iter().map(|s| s.rows.len()).sum();
    info!(
        indicators = summaries.len(),
        rows_in_scope = in_scope,
        scope = scope.prefix(),
        last_updated = %freshness.display(),
        "dashboard built"
    );

    Dashboard {
        last_updated: freshness.display(),
        summaries,
        freshness,
        current_quarter,
    }
}

fn build_one(
    table: &StrategyTable,
    indicator_id: &str,
    config: Option<&IndicatorConfig>,
    payload: &BatchPayload,
    scope: &AreaScope,
    quarterly: bool,
    current_quarter: u8,
) -> IndicatorSummary {
    let rows = scope.filter_in_scope(payload.rows_for(indicator_id));
    let aggregate = aggregate_with(table, &rows, indicator_id);
    let mut summary = attach_config(summarize(indicator_id, rows, aggregate), config);
    summary.period = period_label(quarterly, current_quarter);
    summary
}

/// Pass/fail counts over all indicators.
///
/// With a non-empty `selected` list each indicator is judged on the
/// selected breakdown keys only: ratio indicators on the recomputed
/// percentage, raw-count indicators on whether any result was recorded.
pub fn dashboard_stats(summaries: &[IndicatorSummary], selected: &[String]) -> DashboardStats {
    let total = summaries.len();
    let passed = summaries
        .iter()
        .filter(|summary| {
            if selected.is_empty() {
                summary.passes()
            } else {
                meets_threshold(selected_percentage(summary, selected), summary.threshold)
            }
        })
        .count();
    let success_rate = if total > 0 {
        (passed as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    DashboardStats {
        total,
        passed,
        failed: total - passed,
        success_rate,
    }
}

fn selected_percentage(summary: &IndicatorSummary, selected: &[String]) -> f64 {
    let (target, result) = selected
        .iter()
        .filter_map(|key| summary.breakdown.get(key))
        .fold((0.0, 0.0), |(t, r), entry| (t + entry.target, r + entry.result));
    if summary.is_raw_count() {
        if result > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        percentage(target, result)
    }
}
