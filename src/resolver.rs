// Indicator value resolution.
//
// Each indicator sheet has its own column layout. A `StrategyTable` maps
// indicator identifiers to the rule that reduces one row to a
// (target, result) pair; identifiers that are not listed use the generic
// rule.
use crate::types::{RawRow, ValuePair};
use once_cell::sync::Lazy;
use std::collections::HashMap;

pub const DENTAL_CAVITY_FREE: &str = "s_dental_0_5_cavity_free";
pub const CHILD_DEVELOPMENT_SPECIAL: &str = "s_childdev_specialpp";
pub const ELDERLY_NINE_ASPECTS: &str = "s_aged9";
pub const ELDERLY_NINE_ASPECTS_WIDE: &str = "s_aged9_w";

/// Age brackets (months) reported by the child development sheet.
pub const DEVELOPMENT_BRACKETS: [u32; 5] = [9, 18, 30, 42, 60];

static STANDARD_TABLE: Lazy<StrategyTable> = Lazy::new(StrategyTable::standard);
static GENERIC: ResolutionStrategy = ResolutionStrategy::Generic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Scalar `target`/`result`, falling back to quarterly columns.
    Generic,
    /// Two count columns; the denominator is `target_field`.
    PairedCount {
        target_field: String,
        result_field: String,
    },
    /// Per-bracket screened counts over per-bracket normal counts.
    MultiBracketSum { brackets: Vec<u32> },
    /// Scalar `target`/`result` only. Numbered sub-columns are separate
    /// assessment aspects and must not be summed.
    SingleAspect,
}

impl ResolutionStrategy {
    pub fn resolve(&self, row: &RawRow) -> ValuePair {
        match self {
            ResolutionStrategy::Generic => resolve_generic(row),
            ResolutionStrategy::PairedCount {
                target_field,
                result_field,
            } => ValuePair::new(row.get_number(target_field), row.get_number(result_field)),
            ResolutionStrategy::MultiBracketSum { brackets } => resolve_brackets(row, brackets),
            ResolutionStrategy::SingleAspect => {
                ValuePair::new(row.get_number("target"), row.get_number("result"))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    entries: HashMap<String, ResolutionStrategy>,
}

impl StrategyTable {
    /// Table with no overrides: every indicator resolves generically.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules for the indicator sheets with non-standard layouts.
    pub fn standard() -> Self {
        // The dental sheet names its columns `a` (cavity free) and `b`
        // (examined). `b` as denominator is inferred from the data (it keeps
        // district totals under 100%), not a documented rule.
        Self::new()
            .with(
                DENTAL_CAVITY_FREE,
                ResolutionStrategy::PairedCount {
                    target_field: "b".to_string(),
                    result_field: "a".to_string(),
                },
            )
            .with(
                CHILD_DEVELOPMENT_SPECIAL,
                ResolutionStrategy::MultiBracketSum {
                    brackets: DEVELOPMENT_BRACKETS.to_vec(),
                },
            )
            .with(ELDERLY_NINE_ASPECTS, ResolutionStrategy::SingleAspect)
            .with(ELDERLY_NINE_ASPECTS_WIDE, ResolutionStrategy::SingleAspect)
    }

    pub fn with(mut self, indicator_id: &str, strategy: ResolutionStrategy) -> Self {
        self.insert(indicator_id, strategy);
        self
    }

    pub fn insert(&mut self, indicator_id: &str, strategy: ResolutionStrategy) {
        self.entries.insert(indicator_id.to_string(), strategy);
    }

    pub fn strategy_for(&self, indicator_id: &str) -> &ResolutionStrategy {
        self.entries.get(indicator_id).unwrap_or(&GENERIC)
    }

    pub fn resolve(&self, row: &RawRow, indicator_id: &str) -> ValuePair {
        self.strategy_for(indicator_id).resolve(row)
    }
}

/// Resolve a row with the standard strategy table.
pub fn resolve(row: &RawRow, indicator_id: &str) -> ValuePair {
    STANDARD_TABLE.resolve(row, indicator_id)
}

pub fn standard_table() -> &'static StrategyTable {
    &STANDARD_TABLE
}

fn resolve_generic(row: &RawRow) -> ValuePair {
    let target = row.get_number("target");
    let result = row.get_number("result");

    if target > 0.0 {
        let result = if result > 0.0 {
            result
        } else {
            let quarterly = quarterly_sum(row, "result");
            if quarterly > 0.0 {
                quarterly
            } else {
                result
            }
        };
        return ValuePair::new(target, result);
    }

    ValuePair::new(quarterly_sum(row, "target"), quarterly_sum(row, "result"))
}

/// Sum the four quarterly columns for `prefix`.
///
/// Sheets spell quarter `n` as `{prefix}{n}`, `{prefix}q{n}` or
/// `{prefix}1q{n}`; the first spelling holding a non-zero value wins.
/// Cells are compared after numeric coercion, so a text `"0"` is skipped
/// like a numeric zero rather than ending the search.
pub fn quarterly_sum(row: &RawRow, prefix: &str) -> f64 {
    (1..=4)
        .map(|quarter| {
            [
                format!("{prefix}{quarter}"),
                format!("{prefix}q{quarter}"),
                format!("{prefix}1q{quarter}"),
            ]
            .iter()
            .map(|field| row.get_number(field))
            .find(|value| *value != 0.0)
            .unwrap_or(0.0)
        })
        .sum()
}

fn resolve_brackets(row: &RawRow, brackets: &[u32]) -> ValuePair {
    let mut target = 0.0;
    let mut result = 0.0;
    for bracket in brackets {
        target += row.get_number(&format!("result_{bracket}"));
        // normal on first screening + normal after stimulation
        result += row.get_number(&format!("1b260_1_{bracket}"));
        result += row.get_number(&format!("1b260_2_{bracket}"));
    }
    ValuePair::new(target, result)
}
