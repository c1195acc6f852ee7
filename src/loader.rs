use crate::error::AppError;
use crate::types::{
    AreaDirectory, BatchMeta, BatchPayload, FacilityDetail, FacilityDirectory, IndicatorConfig,
    IndicatorRows, RawRow,
};
use crate::util::{coerce_flag, coerce_number, coerce_text};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CATALOG_SHEET: &str = "kpi_master";
pub const FACILITY_SHEET: &str = "hospitals";
pub const AREA_SHEET: &str = "tambon_master";
pub const BATCH_SHEET: &str = "BATCH_ALL";

/// Sort position for catalog rows that leave `order` blank.
pub const DEFAULT_ORDER: i64 = 999;
pub const UNKNOWN_TITLE: &str = "Unknown KPI";

/// Everything read from the sheet exports for one refresh.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub catalog: Vec<IndicatorConfig>,
    pub facilities: FacilityDirectory,
    pub areas: AreaDirectory,
    pub payload: BatchPayload,
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub catalog_entries: usize,
    pub facilities: usize,
    pub areas: usize,
    pub indicators: usize,
    pub total_rows: usize,
    pub current_quarter: u8,
}

pub fn sheet_path(dir: &Path, sheet: &str) -> PathBuf {
    dir.join(format!("{sheet}.json"))
}

/// Read the four sheet exports from `dir`.
///
/// The catalog and the batch payload are required. The facility and area
/// directories only feed display names, so a missing file degrades to an
/// empty directory.
pub fn load_sheets(dir: &Path) -> Result<(SheetData, LoadReport), AppError> {
    let catalog = parse_catalog(&read_sheet(dir, CATALOG_SHEET)?);
    let payload = parse_batch(read_sheet(dir, BATCH_SHEET)?);
    let facilities = read_optional_sheet(dir, FACILITY_SHEET)?
        .map(|v| parse_facilities(&v))
        .unwrap_or_default();
    let areas = read_optional_sheet(dir, AREA_SHEET)?
        .map(|v| parse_areas(&v))
        .unwrap_or_default();

    let report = LoadReport {
        catalog_entries: catalog.len(),
        facilities: facilities.len(),
        areas: areas.len(),
        indicators: payload.indicators.len(),
        total_rows: payload.total_rows(),
        current_quarter: payload.meta.current_quarter,
    };
    info!(
        catalog = report.catalog_entries,
        indicators = report.indicators,
        rows = report.total_rows,
        "sheets loaded from {}",
        dir.display()
    );

    let data = SheetData {
        catalog,
        facilities,
        areas,
        payload,
    };
    Ok((data, report))
}

fn read_sheet(dir: &Path, sheet: &str) -> Result<Value, AppError> {
    let path = sheet_path(dir, sheet);
    let raw = std::fs::read_to_string(&path).map_err(|source| AppError::SheetRead {
        path: path.clone(),
        source,
    })?;
    debug!(sheet, bytes = raw.len(), "read sheet");
    serde_json::from_str(&raw).map_err(|source| AppError::SheetDecode { path, source })
}

fn read_optional_sheet(dir: &Path, sheet: &str) -> Result<Option<Value>, AppError> {
    if !sheet_path(dir, sheet).exists() {
        warn!(sheet, "sheet export missing; continuing without it");
        return Ok(None);
    }
    read_sheet(dir, sheet).map(Some)
}

fn rows_of(value: &Value) -> &[Value] {
    value.as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// Catalog rows with an identifier, stably sorted by `order`.
pub fn parse_catalog(value: &Value) -> Vec<IndicatorConfig> {
    let mut configs: Vec<IndicatorConfig> = rows_of(value)
        .iter()
        .filter_map(|row| {
            let indicator_id = row.get("table_name").and_then(coerce_text)?;
            let title = row
                .get("title")
                .and_then(coerce_text)
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
            let threshold = row
                .get("target")
                .and_then(coerce_number)
                .filter(|t| *t > 0.0);
            // a zero order reads as unset, like a blank cell
            let order = row
                .get("order")
                .and_then(coerce_number)
                .filter(|o| *o != 0.0)
                .map(|o| o as i64)
                .unwrap_or(DEFAULT_ORDER);
            let link = row.get("link").and_then(coerce_text);
            let quarterly = row.get("quarterly").map(coerce_flag).unwrap_or(false);
            Some(IndicatorConfig {
                indicator_id,
                title,
                threshold,
                order,
                link,
                quarterly,
            })
        })
        .collect();
    configs.sort_by_key(|config| config.order);
    configs
}

/// Facility directory keyed by code.
///
/// Column headers in this sheet are not stable, so columns are read by
/// position: code, name, then the optional area-group id.
pub fn parse_facilities(value: &Value) -> FacilityDirectory {
    let mut facilities = FacilityDirectory::new();
    for row in rows_of(value) {
        let Some(fields) = row.as_object() else {
            continue;
        };
        let columns: Vec<Option<String>> = fields.values().take(3).map(coerce_text).collect();
        if columns.len() < 2 {
            continue;
        }
        let Some(code) = columns[0].clone() else {
            continue;
        };
        let name = columns[1].clone().unwrap_or_default();
        let area_group_id = columns.get(2).cloned().flatten();
        facilities.insert(
            code,
            FacilityDetail {
                name,
                area_group_id,
            },
        );
    }
    facilities
}

pub fn parse_areas(value: &Value) -> AreaDirectory {
    rows_of(value)
        .iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(coerce_text)?;
            let name = row.get("name_th").and_then(coerce_text)?;
            Some((id, name))
        })
        .collect()
}

/// Accepts either a flat `{indicator: [rows]}` map or the
/// `{data: {...}, meta: {...}}` envelope. Indicators whose value is not an
/// array come through with no rows.
pub fn parse_batch(value: Value) -> BatchPayload {
    let Value::Object(mut root) = value else {
        warn!("batch payload is not an object; treating as empty");
        return BatchPayload::default();
    };

    let is_envelope = root.get("data").map(Value::is_object).unwrap_or(false)
        && root.get("meta").map(Value::is_object).unwrap_or(false);

    let (data, meta) = if is_envelope {
        let meta = root.remove("meta").map(|m| parse_meta(&m)).unwrap_or_default();
        let data = match root.remove("data") {
            Some(Value::Object(data)) => data,
            _ => Default::default(),
        };
        (data, meta)
    } else {
        (root, BatchMeta::default())
    };

    let indicators = data
        .into_iter()
        .map(|(indicator_id, rows)| {
            let rows: Vec<RawRow> = match rows {
                Value::Array(items) => items.into_iter().filter_map(RawRow::from_value).collect(),
                _ => {
                    warn!(indicator = %indicator_id, "indicator payload is not an array");
                    Vec::new()
                }
            };
            IndicatorRows { indicator_id, rows }
        })
        .collect();

    BatchPayload { indicators, meta }
}

fn parse_meta(meta: &Value) -> BatchMeta {
    let current_quarter = meta
        .get("current_quarter")
        .and_then(coerce_number)
        .filter(|q| (0.0..=4.0).contains(q))
        .map(|q| q as u8)
        .unwrap_or(0);
    let quarterly_indicators: HashSet<String> = meta
        .get("kpi_config")
        .map(rows_of)
        .unwrap_or(&[])
        .iter()
        .filter(|entry| entry.get("isQuarterly").map(coerce_flag).unwrap_or(false))
        .filter_map(|entry| entry.get("table").and_then(coerce_text))
        .collect();
    BatchMeta {
        current_quarter,
        quarterly_indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_applies_defaults_and_sorts_stably() {
        let sheet = json!([
            { "table_name": "s_dm_screen", "title": "DM screening", "target": "90", "order": 2 },
            { "table_name": "", "title": "ignored" },
            { "table_name": "s_anc5", "order": "1", "link": "https://example.org" },
            { "table_name": "s_aged9_w", "title": "Elderly", "quarterly": true },
            { "table_name": "s_ht_screen", "title": "HT screening", "order": 2 }
        ]);
        let catalog = parse_catalog(&sheet);
        let ids: Vec<&str> = catalog.iter().map(|c| c.indicator_id.as_str()).collect();
        assert_eq!(ids, vec!["s_anc5", "s_dm_screen", "s_ht_screen", "s_aged9_w"]);

        assert_eq!(catalog[0].title, UNKNOWN_TITLE);
        assert_eq!(catalog[0].link.as_deref(), Some("https://example.org"));
        assert_eq!(catalog[0].effective_threshold(), 80.0);
        assert_eq!(catalog[1].threshold, Some(90.0));
        assert_eq!(catalog[3].order, DEFAULT_ORDER);
        assert!(catalog[3].quarterly);
    }

    #[test]
    fn facilities_are_read_by_column_position() {
        let sheet = json!([
            { "hcode": "10677", "hname": "Song Hospital", "tambon": "540601" },
            { "code": "03866", "name": "Ban Klang HPH" },
            { "only": "x" },
            { "code": "", "name": "blank code" }
        ]);
        let facilities = parse_facilities(&sheet);
        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities["10677"].name, "Song Hospital");
        assert_eq!(facilities["10677"].area_group_id.as_deref(), Some("540601"));
        assert_eq!(facilities["03866"].area_group_id, None);
    }

    #[test]
    fn areas_need_id_and_name() {
        let sheet = json!([
            { "id": 540601, "name_th": "Ban Klang" },
            { "id": "540602" },
            { "name_th": "orphan" }
        ]);
        let areas = parse_areas(&sheet);
        assert_eq!(areas.len(), 1);
        assert_eq!(areas["540601"], "Ban Klang");
    }

    #[test]
    fn batch_envelope_carries_meta() {
        let payload = parse_batch(json!({
            "data": {
                "s_anc5": [{ "areacode": "54060101", "target": 1 }, "junk"],
                "s_dm_screen": { "error": "timeout" }
            },
            "meta": {
                "current_quarter": 2,
                "kpi_config": [
                    { "table": "s_anc5", "isQuarterly": true },
                    { "table": "s_dm_screen", "isQuarterly": false }
                ]
            }
        }));
        assert_eq!(payload.meta.current_quarter, 2);
        assert!(payload.is_quarterly("s_anc5"));
        assert!(!payload.is_quarterly("s_dm_screen"));
        assert_eq!(payload.rows_for("s_anc5").len(), 1);
        assert!(payload.rows_for("s_dm_screen").is_empty());
        assert_eq!(payload.indicators[0].indicator_id, "s_anc5");
    }

    #[test]
    fn flat_batch_has_default_meta() {
        let payload = parse_batch(json!({ "s_anc5": [{ "target": 1 }], "s_b": [] }));
        assert_eq!(payload.meta, BatchMeta::default());
        assert_eq!(payload.indicators.len(), 2);
        assert_eq!(payload.total_rows(), 1);
    }

    #[test]
    fn non_object_batch_is_empty() {
        assert_eq!(parse_batch(json!([1, 2, 3])), BatchPayload::default());
    }
}
