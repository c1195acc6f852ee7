//! Public-health indicator (KPI) aggregation.
//!
//! Raw indicator sheets are filtered to a district scope, each row is
//! reduced to a (target, result) pair by an indicator-specific rule, and the
//! pairs are summed into district totals and per-facility breakdowns with
//! pass/fail judgments against catalog thresholds.
pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod reports;
pub mod resolver;
pub mod scope;
pub mod telemetry;
pub mod types;
pub mod util;
pub mod views;

pub use aggregate::{aggregate, aggregate_with, Aggregate};
pub use catalog::{attach_config, period_label};
pub use reports::{build_all, build_all_with, dashboard_stats, Dashboard, Freshness};
pub use resolver::{resolve, ResolutionStrategy, StrategyTable};
pub use scope::AreaScope;
pub use types::{
    BatchMeta, BatchPayload, BreakdownEntry, IndicatorConfig, IndicatorSummary, PeriodLabel,
    RawRow, ValuePair,
};
