// Catalog resolution: joins computed summaries with operator configuration.
use crate::aggregate::Aggregate;
use crate::types::{IndicatorConfig, IndicatorSummary, PeriodLabel, RawRow};
use crate::util::DEFAULT_THRESHOLD;

/// Wrap an aggregate and the rows it was computed from into a summary with
/// no catalog data attached yet.
pub fn summarize(indicator_id: &str, rows: Vec<RawRow>, aggregate: Aggregate) -> IndicatorSummary {
    IndicatorSummary {
        total_target: aggregate.total_target,
        total_result: aggregate.total_result,
        percentage: aggregate.percentage,
        breakdown: aggregate.breakdown,
        rows,
        ..IndicatorSummary::empty(indicator_id)
    }
}

/// Overlay a catalog entry onto a computed summary.
///
/// Totals are never touched. Without an entry the summary keeps its
/// identifier as title, the default threshold and no link.
pub fn attach_config(
    mut summary: IndicatorSummary,
    config: Option<&IndicatorConfig>,
) -> IndicatorSummary {
    match config {
        Some(config) => {
            summary.title = config.title.clone();
            summary.threshold = config.effective_threshold();
            summary.link = config.link.clone();
            summary.order = Some(config.order);
        }
        None => {
            summary.threshold = DEFAULT_THRESHOLD;
            summary.link = None;
            summary.order = None;
        }
    }
    summary
}

/// Quarterly indicators get a cumulative label once the current quarter is
/// known; everything else is annual.
pub fn period_label(quarterly: bool, current_quarter: u8) -> PeriodLabel {
    if quarterly && current_quarter > 0 {
        PeriodLabel::CumulativeQuarter {
            quarter: current_quarter,
        }
    } else {
        PeriodLabel::Annual
    }
}

pub fn find_config<'a>(
    configs: &'a [IndicatorConfig],
    indicator_id: &str,
) -> Option<&'a IndicatorConfig> {
    configs.iter().find(|c| c.indicator_id == indicator_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BreakdownEntry;
    use std::collections::BTreeMap;

    fn computed() -> IndicatorSummary {
        let mut breakdown = BTreeMap::new();
        breakdown.insert(
            "10677".to_string(),
            BreakdownEntry {
                target: 10.0,
                result: 9.0,
                percentage: 90.0,
            },
        );
        let aggregate = Aggregate {
            total_target: 10.0,
            total_result: 9.0,
            percentage: 90.0,
            breakdown,
        };
        summarize("s_anc5", Vec::new(), aggregate)
    }

    #[test]
    fn overlays_threshold_link_and_order() {
        let config = IndicatorConfig::new("s_anc5", "ANC 5 visits")
            .with_threshold(60.0)
            .with_order(2)
            .with_link("https://example.org/anc5");
        let summary = attach_config(computed(), Some(&config));
        assert_eq!(summary.title, "ANC 5 visits");
        assert_eq!(summary.threshold, 60.0);
        assert_eq!(summary.order, Some(2));
        assert_eq!(summary.link.as_deref(), Some("https://example.org/anc5"));
        assert_eq!(summary.total_target, 10.0);
        assert_eq!(summary.total_result, 9.0);
        assert_eq!(summary.breakdown.len(), 1);
    }

    #[test]
    fn missing_entry_uses_defaults() {
        let summary = attach_config(computed(), None);
        assert_eq!(summary.title, "s_anc5");
        assert_eq!(summary.threshold, 80.0);
        assert!(summary.link.is_none());
        assert!(summary.passes());
    }

    #[test]
    fn period_label_needs_flag_and_known_quarter() {
        assert_eq!(
            period_label(true, 2),
            PeriodLabel::CumulativeQuarter { quarter: 2 }
        );
        assert_eq!(period_label(true, 0), PeriodLabel::Annual);
        assert_eq!(period_label(false, 3), PeriodLabel::Annual);
    }
}
