use crate::resolver::{standard_table, StrategyTable};
use crate::types::{BreakdownEntry, RawRow};
use crate::util::percentage;
use serde::Serialize;
use std::collections::BTreeMap;

/// Totals for one indicator plus the per-facility (or per-area) split.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub total_target: f64,
    pub total_result: f64,
    pub percentage: f64,
    pub breakdown: BTreeMap<String, BreakdownEntry>,
}

/// Aggregate rows with the standard strategy table.
pub fn aggregate(rows: &[RawRow], indicator_id: &str) -> Aggregate {
    aggregate_with(standard_table(), rows, indicator_id)
}

/// Sum every row's value pair into the total and into its breakdown bucket.
///
/// Rows with neither a facility code nor an area code still count towards
/// the total but have no bucket.
pub fn aggregate_with(table: &StrategyTable, rows: &[RawRow], indicator_id: &str) -> Aggregate {
    #[derive(Default)]
    struct Acc {
        target: f64,
        result: f64,
    }

    let mut total = Acc::default();
    let mut buckets: BTreeMap<String, Acc> = BTreeMap::new();
    for row in rows {
        let pair = table.resolve(row, indicator_id);
        total.target += pair.target;
        total.result += pair.result;
        if let Some(key) = row.breakdown_key() {
            let e = buckets.entry(key).or_default();
            e.target += pair.target;
            e.result += pair.result;
        }
    }

    let breakdown = buckets
        .into_iter()
        .map(|(key, acc)| {
            let entry = BreakdownEntry {
                target: acc.target,
                result: acc.result,
                percentage: percentage(acc.target, acc.result),
            };
            (key, entry)
        })
        .collect();

    Aggregate {
        total_target: total.target,
        total_result: total.result,
        percentage: percentage(total.target, total.result),
        breakdown,
    }
}
