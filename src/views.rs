// Presentation adapters over computed summaries: column ordering, cell
// rendering, drill-down and the flat tables the exporters write.
use crate::reports::Freshness;
use crate::resolver::StrategyTable;
use crate::types::{
    AreaDirectory, DetailRow, FacilityDirectory, IndicatorSummary, IndicatorTableRow, RawRow,
};
use crate::util::{format_count, format_number, meets_threshold, percentage};
use serde::Serialize;
use std::collections::BTreeSet;

pub const NO_DATA: &str = "-";

/// Area codes start with the six-digit sub-district id; two more digits
/// name the village.
const AREA_ID_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStatus {
    Pass,
    Fail,
    /// Raw counts and empty cells are not judged.
    Neutral,
}

impl CellStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CellStatus::Pass => "Pass",
            CellStatus::Fail => "Fail",
            CellStatus::Neutral => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub status: CellStatus,
}

/// Every breakdown key across all summaries, grouped by the facility's
/// area group and then ordered by code. Keys with no known group come last.
pub fn facility_keys(summaries: &[IndicatorSummary], facilities: &FacilityDirectory) -> Vec<String> {
    let keys: BTreeSet<&String> = summaries
        .iter()
        .flat_map(|summary| summary.breakdown.keys())
        .collect();
    let mut keys: Vec<String> = keys.into_iter().cloned().collect();
    keys.sort_by(|a, b| {
        let group_a = group_of(facilities, a);
        let group_b = group_of(facilities, b);
        group_a
            .is_none()
            .cmp(&group_b.is_none())
            .then_with(|| group_a.cmp(&group_b))
            .then_with(|| a.cmp(b))
    });
    keys
}

fn group_of<'a>(facilities: &'a FacilityDirectory, key: &str) -> Option<&'a str> {
    facilities
        .get(key)
        .and_then(|detail| detail.area_group_id.as_deref())
        .filter(|group| !group.is_empty())
}

/// Display name for a breakdown key: the facility name when known.
pub fn facility_name(facilities: &FacilityDirectory, key: &str) -> String {
    facilities
        .get(key)
        .map(|detail| detail.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| key.to_string())
}

/// Column label for a breakdown key: facility name, followed by the name of
/// its area group when the area directory knows it.
pub fn column_label(facilities: &FacilityDirectory, areas: &AreaDirectory, key: &str) -> String {
    let name = facility_name(facilities, key);
    match group_of(facilities, key).and_then(|group| areas.get(group)) {
        Some(area) => format!("{name} ({area})"),
        None => name,
    }
}

/// Retained rows behind one breakdown cell.
pub fn rows_for_key<'a>(summary: &'a IndicatorSummary, key: &str) -> Vec<&'a RawRow> {
    summary
        .rows
        .iter()
        .filter(|row| {
            row.facility_code().as_deref() == Some(key) || row.area_code().as_deref() == Some(key)
        })
        .collect()
}

/// Retained rows for a facility selection. An empty selection means the
/// whole district.
pub fn rows_for_keys<'a>(summary: &'a IndicatorSummary, selected: &[String]) -> Vec<&'a RawRow> {
    if selected.is_empty() {
        return summary.rows.iter().collect();
    }
    summary
        .rows
        .iter()
        .filter(|row| {
            row.facility_code()
                .map(|code| selected.contains(&code))
                .unwrap_or(false)
        })
        .collect()
}

/// Location of a row for drill-down: `ต.<area name>`, plus `หมู่ <n>` when the
/// code carries a village number. Codes shorter than an area id render `-`.
pub fn location_label(areas: &AreaDirectory, area_code: Option<&str>) -> String {
    let Some(code) = area_code else {
        return NO_DATA.to_string();
    };
    let Some(area_id) = code.get(..AREA_ID_LEN) else {
        return NO_DATA.to_string();
    };
    let name = areas.get(area_id).map(String::as_str).unwrap_or(area_id);
    let village = if code.len() == AREA_ID_LEN + 2 {
        code.get(AREA_ID_LEN..)
            .and_then(|moo| moo.parse::<u32>().ok())
            .map(|moo| format!(" หมู่ {moo}"))
            .unwrap_or_default()
    } else {
        String::new()
    };
    format!("ต.{name}{village}")
}

/// Per-row breakdown of `rows`, each resolved on its own and judged against
/// the summary's threshold. Rows with a zero target are shown as counts.
pub fn detail_rows(
    summary: &IndicatorSummary,
    rows: &[&RawRow],
    areas: &AreaDirectory,
    table: &StrategyTable,
) -> Vec<DetailRow> {
    rows.iter()
        .map(|row| {
            let pair = table.resolve(row, &summary.indicator_id);
            let (percentage_text, status) = if pair.is_raw_count() {
                ("(N/A)".to_string(), CellStatus::Neutral)
            } else {
                let pct = percentage(pair.target, pair.result);
                let status = if meets_threshold(pct, summary.threshold) {
                    CellStatus::Pass
                } else {
                    CellStatus::Fail
                };
                (format!("{}%", format_number(pct, 2)), status)
            };
            DetailRow {
                location: location_label(areas, row.area_code().as_deref()),
                target: format_count(pair.target),
                result: format_count(pair.result),
                percentage: percentage_text,
                status: status.label().to_string(),
            }
        })
        .collect()
}

/// Footer of a drill-down: row count, summed pair and the stamp of the
/// first row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailFooter {
    pub villages: usize,
    pub total_target: f64,
    pub total_result: f64,
    pub last_updated: String,
}

pub fn detail_footer(
    summary: &IndicatorSummary,
    rows: &[&RawRow],
    table: &StrategyTable,
) -> DetailFooter {
    let (total_target, total_result) = rows
        .iter()
        .map(|row| table.resolve(row, &summary.indicator_id))
        .fold((0.0, 0.0), |(t, r), pair| (t + pair.target, r + pair.result));
    let stamp = rows.first().and_then(|row| row.report_timestamp());
    DetailFooter {
        villages: rows.len(),
        total_target,
        total_result,
        last_updated: Freshness::from_stamp(stamp.as_deref()).display(),
    }
}

/// Render one indicator × facility cell.
pub fn breakdown_cell(summary: &IndicatorSummary, key: &str) -> Cell {
    let neutral = |text: String| Cell {
        text,
        status: CellStatus::Neutral,
    };
    let Some(entry) = summary.breakdown.get(key) else {
        return neutral(NO_DATA.to_string());
    };
    if summary.is_raw_count() {
        return neutral(format_count(entry.result));
    }
    if entry.target == 0.0 {
        return neutral(NO_DATA.to_string());
    }
    Cell {
        text: format_number(entry.percentage, 2),
        status: if meets_threshold(entry.percentage, summary.threshold) {
            CellStatus::Pass
        } else {
            CellStatus::Fail
        },
    }
}

pub fn summary_status(summary: &IndicatorSummary) -> CellStatus {
    if summary.is_raw_count() {
        CellStatus::Neutral
    } else if summary.passes() {
        CellStatus::Pass
    } else {
        CellStatus::Fail
    }
}

pub fn threshold_text(summary: &IndicatorSummary) -> String {
    format!("≥ {}", format_count(summary.threshold))
}

pub fn indicator_table(summaries: &[IndicatorSummary]) -> Vec<IndicatorTableRow> {
    summaries
        .iter()
        .enumerate()
        .map(|(idx, summary)| {
            let result = if summary.is_raw_count() {
                format!("{} (count)", summary.display_result())
            } else {
                summary.display_result()
            };
            IndicatorTableRow {
                index: idx + 1,
                indicator: summary.title.clone(),
                period: summary.period.to_string(),
                target: threshold_text(summary),
                result,
                status: summary_status(summary).label().to_string(),
            }
        })
        .collect()
}

/// Indicator × facility grid: a header row and one row per indicator.
pub fn indicator_matrix(
    summaries: &[IndicatorSummary],
    keys: &[String],
    facilities: &FacilityDirectory,
    areas: &AreaDirectory,
) -> (Vec<String>, Vec<Vec<String>>) {
    let mut header: Vec<String> = ["#", "Indicator", "Target", "Result"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(keys.iter().map(|key| column_label(facilities, areas, key)));

    let rows = summaries
        .iter()
        .enumerate()
        .map(|(idx, summary)| {
            let mut cells = vec![
                (idx + 1).to_string(),
                summary.title.clone(),
                threshold_text(summary),
                summary.display_result(),
            ];
            cells.extend(keys.iter().map(|key| breakdown_cell(summary, key).text));
            cells
        })
        .collect();
    (header, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BreakdownEntry, FacilityDetail};
    use serde_json::json;

    fn entry(target: f64, result: f64) -> BreakdownEntry {
        BreakdownEntry {
            target,
            result,
            percentage: crate::util::percentage(target, result),
        }
    }

    fn ratio_summary() -> IndicatorSummary {
        let mut summary = IndicatorSummary::empty("s_anc5");
        summary.title = "ANC 5 visits".to_string();
        summary.total_target = 50.0;
        summary.total_result = 45.0;
        summary.percentage = 90.0;
        summary.breakdown.insert("10677".to_string(), entry(40.0, 38.0));
        summary.breakdown.insert("03866".to_string(), entry(10.0, 7.0));
        summary.breakdown.insert("54060101".to_string(), entry(0.0, 3.0));
        summary
    }

    fn directory() -> FacilityDirectory {
        let mut facilities = FacilityDirectory::new();
        facilities.insert(
            "10677".to_string(),
            FacilityDetail {
                name: "Song Hospital".to_string(),
                area_group_id: Some("540601".to_string()),
            },
        );
        facilities.insert(
            "03866".to_string(),
            FacilityDetail {
                name: "Ban Klang HPH".to_string(),
                area_group_id: Some("540602".to_string()),
            },
        );
        facilities.insert(
            "03865".to_string(),
            FacilityDetail {
                name: "Huai Mak HPH".to_string(),
                area_group_id: Some("540602".to_string()),
            },
        );
        facilities
    }

    #[test]
    fn keys_group_by_area_then_code() {
        let mut other = IndicatorSummary::empty("s_dm_screen");
        other.breakdown.insert("03865".to_string(), entry(1.0, 1.0));
        let keys = facility_keys(&[ratio_summary(), other], &directory());
        assert_eq!(keys, vec!["10677", "03865", "03866", "54060101"]);
    }

    #[test]
    fn cells_follow_display_rules() {
        let summary = ratio_summary();
        let pass = breakdown_cell(&summary, "10677");
        assert_eq!(pass.text, "95.00");
        assert_eq!(pass.status, CellStatus::Pass);

        let fail = breakdown_cell(&summary, "03866");
        assert_eq!(fail.text, "70.00");
        assert_eq!(fail.status, CellStatus::Fail);

        assert_eq!(breakdown_cell(&summary, "54060101").text, NO_DATA);
        assert_eq!(breakdown_cell(&summary, "99999").text, NO_DATA);
    }

    #[test]
    fn raw_count_cells_show_counts() {
        let mut summary = IndicatorSummary::empty("s_ncd_screen_repleate1");
        summary.total_result = 1200.0;
        summary.breakdown.insert("10677".to_string(), entry(0.0, 1200.0));
        let cell = breakdown_cell(&summary, "10677");
        assert_eq!(cell.text, "1,200");
        assert_eq!(cell.status, CellStatus::Neutral);

        let table = indicator_table(&[summary]);
        assert_eq!(table[0].result, "1,200 (count)");
        assert_eq!(table[0].status, "-");
        assert_eq!(table[0].target, "≥ 80");
    }

    #[test]
    fn drill_down_matches_facility_or_area() {
        let mut summary = ratio_summary();
        summary.rows = vec![
            RawRow::from_value(json!({ "hospcode": "10677", "areacode": "54060101" })).expect("row"),
            RawRow::from_value(json!({ "areacode": "54060101" })).expect("row"),
            RawRow::from_value(json!({ "hospcode": "03866", "areacode": "54060201" })).expect("row"),
        ];
        assert_eq!(rows_for_key(&summary, "10677").len(), 1);
        assert_eq!(rows_for_key(&summary, "54060101").len(), 2);
        assert_eq!(rows_for_keys(&summary, &[]).len(), 3);
        assert_eq!(
            rows_for_keys(&summary, &["03866".to_string(), "10677".to_string()]).len(),
            2
        );
    }

    #[test]
    fn location_label_adds_village_number() {
        let mut areas = AreaDirectory::new();
        areas.insert("540601".to_string(), "Song".to_string());
        assert_eq!(location_label(&areas, Some("54060105")), "ต.Song หมู่ 5");
        assert_eq!(location_label(&areas, Some("54060112")), "ต.Song หมู่ 12");
        assert_eq!(location_label(&areas, Some("540601")), "ต.Song");
        assert_eq!(location_label(&areas, Some("54060201")), "ต.540602 หมู่ 1");
    }

    #[test]
    fn location_label_needs_an_area_id() {
        let areas = AreaDirectory::new();
        assert_eq!(location_label(&areas, Some("5406")), NO_DATA);
        assert_eq!(location_label(&areas, Some("")), NO_DATA);
        assert_eq!(location_label(&areas, None), NO_DATA);
    }

    #[test]
    fn detail_rows_resolve_and_judge_each_row() {
        let mut summary = ratio_summary();
        summary.rows = vec![
            RawRow::from_value(json!({
                "hospcode": "10677", "areacode": "54060103",
                "target": 20, "result": 19, "date_com": "202602011200"
            }))
            .expect("row"),
            RawRow::from_value(json!({
                "hospcode": "10677", "areacode": "54060104",
                "target": 20, "result": 10, "date_com": "202602031415"
            }))
            .expect("row"),
            RawRow::from_value(json!({ "hospcode": "10677", "areacode": "5406", "result1": 3 }))
                .expect("row"),
        ];
        let mut areas = AreaDirectory::new();
        areas.insert("540601".to_string(), "Song".to_string());
        let rows = rows_for_key(&summary, "10677");
        let table = StrategyTable::standard();

        let detail = detail_rows(&summary, &rows, &areas, &table);
        assert_eq!(detail.len(), 3);
        assert_eq!(detail[0].location, "ต.Song หมู่ 3");
        assert_eq!(detail[0].percentage, "95.00%");
        assert_eq!(detail[0].status, "Pass");
        assert_eq!(detail[1].percentage, "50.00%");
        assert_eq!(detail[1].status, "Fail");
        assert_eq!(detail[2].location, NO_DATA);
        assert_eq!(detail[2].target, "0");
        assert_eq!(detail[2].result, "3");
        assert_eq!(detail[2].percentage, "(N/A)");
        assert_eq!(detail[2].status, "-");

        let footer = detail_footer(&summary, &rows, &table);
        assert_eq!(footer.villages, 3);
        assert_eq!(footer.total_target, 40.0);
        assert_eq!(footer.total_result, 32.0);
        assert_eq!(footer.last_updated, "1 February 2026 12:00");
    }

    #[test]
    fn empty_drill_down_has_no_stamp() {
        let summary = ratio_summary();
        let table = StrategyTable::standard();
        let footer = detail_footer(&summary, &[], &table);
        assert_eq!(footer.villages, 0);
        assert_eq!(footer.last_updated, "N/A");
        assert!(detail_rows(&summary, &[], &AreaDirectory::new(), &table).is_empty());
    }

    #[test]
    fn matrix_uses_facility_names_in_header() {
        let summaries = vec![ratio_summary()];
        let facilities = directory();
        let mut areas = AreaDirectory::new();
        areas.insert("540601".to_string(), "Song".to_string());
        let keys = facility_keys(&summaries, &facilities);
        let (header, rows) = indicator_matrix(&summaries, &keys, &facilities, &areas);
        assert_eq!(
            header,
            vec![
                "#",
                "Indicator",
                "Target",
                "Result",
                "Song Hospital (Song)",
                "Ban Klang HPH",
                "54060101"
            ]
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][..4], ["1", "ANC 5 visits", "≥ 80", "90.00"]);
        assert_eq!(rows[0][4], "95.00");
        assert_eq!(rows[0][6], NO_DATA);
    }
}
