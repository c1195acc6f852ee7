use crate::util::{
    coerce_number, coerce_text, format_count, format_number, meets_threshold, DEFAULT_THRESHOLD,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use tabled::Tabled;

pub const ID_FIELD: &str = "id";
pub const AREA_CODE_FIELD: &str = "areacode";
pub const FACILITY_CODE_FIELD: &str = "hospcode";
pub const TIMESTAMP_FIELD: &str = "date_com";

/// One record of an indicator sheet.
///
/// Column layouts differ per indicator, so the row keeps every field it was
/// given and exposes coercing accessors instead of typed members. Numeric
/// cells may arrive as numbers or strings; anything missing or unparseable
/// reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(Map<String, Value>);

impl RawRow {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Accepts JSON objects only; other values are not rows.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get_number(&self, field: &str) -> f64 {
        self.get_number_or(field, 0.0)
    }

    pub fn get_number_or(&self, field: &str, default: f64) -> f64 {
        self.0.get(field).and_then(coerce_number).unwrap_or(default)
    }

    pub fn get_text(&self, field: &str) -> Option<String> {
        self.0.get(field).and_then(coerce_text)
    }

    pub fn id(&self) -> Option<String> {
        self.get_text(ID_FIELD)
    }

    pub fn area_code(&self) -> Option<String> {
        self.get_text(AREA_CODE_FIELD)
    }

    pub fn facility_code(&self) -> Option<String> {
        self.get_text(FACILITY_CODE_FIELD)
    }

    /// Report generation stamp, `YYYYMMDDhhmm` when well formed.
    pub fn report_timestamp(&self) -> Option<String> {
        self.get_text(TIMESTAMP_FIELD)
    }

    /// Facility code, falling back to the area code.
    pub fn breakdown_key(&self) -> Option<String> {
        self.facility_code().or_else(|| self.area_code())
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Canonical (target, result) reduction of one row for one indicator.
///
/// Both sides are clamped to be non-negative. A zero target marks a raw
/// count: the result is meaningful on its own but there is no ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ValuePair {
    pub target: f64,
    pub result: f64,
}

impl ValuePair {
    pub fn new(target: f64, result: f64) -> Self {
        Self {
            target: target.max(0.0),
            result: result.max(0.0),
        }
    }

    pub fn is_raw_count(&self) -> bool {
        self.target == 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BreakdownEntry {
    pub target: f64,
    pub result: f64,
    pub percentage: f64,
}

/// Reporting period attached to a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeriodLabel {
    /// Quarterly indicator, cumulative up to the given quarter.
    CumulativeQuarter { quarter: u8 },
    #[default]
    Annual,
}

impl PeriodLabel {
    pub fn months(&self) -> Option<u32> {
        match self {
            PeriodLabel::CumulativeQuarter { quarter } => Some(u32::from(*quarter) * 3),
            PeriodLabel::Annual => None,
        }
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::CumulativeQuarter { quarter } => write!(
                f,
                "cumulative {} months (Q{})",
                u32::from(*quarter) * 3,
                quarter
            ),
            PeriodLabel::Annual => write!(f, "annual"),
        }
    }
}

impl Serialize for PeriodLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Aggregated view of one indicator across every in-scope row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub title: String,
    pub indicator_id: String,
    pub total_target: f64,
    pub total_result: f64,
    pub percentage: f64,
    /// In-scope rows, kept for drill-down.
    pub rows: Vec<RawRow>,
    pub breakdown: BTreeMap<String, BreakdownEntry>,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    pub period: PeriodLabel,
}

impl IndicatorSummary {
    /// Zero-valued summary with no catalog data attached.
    pub fn empty(indicator_id: &str) -> Self {
        Self {
            title: indicator_id.to_string(),
            indicator_id: indicator_id.to_string(),
            total_target: 0.0,
            total_result: 0.0,
            percentage: 0.0,
            rows: Vec::new(),
            breakdown: BTreeMap::new(),
            threshold: DEFAULT_THRESHOLD,
            link: None,
            order: None,
            period: PeriodLabel::Annual,
        }
    }

    pub fn is_raw_count(&self) -> bool {
        self.total_target == 0.0
    }

    /// Judged on the two-decimal value that is displayed.
    pub fn passes(&self) -> bool {
        meets_threshold(self.percentage, self.threshold)
    }

    /// Count for raw-count indicators, two-decimal percentage otherwise.
    pub fn display_result(&self) -> String {
        if self.is_raw_count() {
            format_count(self.total_result)
        } else {
            format_number(self.percentage, 2)
        }
    }
}

/// Operator-maintained catalog entry for one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorConfig {
    pub indicator_id: String,
    pub title: String,
    /// `None` when the sheet leaves the target blank or zero.
    pub threshold: Option<f64>,
    pub order: i64,
    pub link: Option<String>,
    pub quarterly: bool,
}

impl IndicatorConfig {
    pub fn new(indicator_id: &str, title: &str) -> Self {
        Self {
            indicator_id: indicator_id.to_string(),
            title: title.to_string(),
            threshold: None,
            order: crate::loader::DEFAULT_ORDER,
            link: None,
            quarterly: false,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn mark_quarterly(mut self) -> Self {
        self.quarterly = true;
        self
    }

    pub fn effective_threshold(&self) -> f64 {
        self.threshold
            .filter(|t| *t > 0.0)
            .unwrap_or(DEFAULT_THRESHOLD)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityDetail {
    pub name: String,
    pub area_group_id: Option<String>,
}

pub type FacilityDirectory = HashMap<String, FacilityDetail>;
pub type AreaDirectory = HashMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorRows {
    pub indicator_id: String,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMeta {
    /// 0 when the payload does not say.
    pub current_quarter: u8,
    pub quarterly_indicators: HashSet<String>,
}

/// Bulk row payload keyed by indicator identifier, in payload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPayload {
    pub indicators: Vec<IndicatorRows>,
    pub meta: BatchMeta,
}

impl BatchPayload {
    pub fn with_rows(mut self, indicator_id: &str, rows: Vec<RawRow>) -> Self {
        self.indicators.push(IndicatorRows {
            indicator_id: indicator_id.to_string(),
            rows,
        });
        self
    }

    /// Rows for an indicator; absent indicators read as empty.
    pub fn rows_for(&self, indicator_id: &str) -> &[RawRow] {
        self.indicators
            .iter()
            .find(|entry| entry.indicator_id == indicator_id)
            .map(|entry| entry.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn total_rows(&self) -> usize {
        self.indicators.iter().map(|entry| entry.rows.len()).sum()
    }

    pub fn is_quarterly(&self, indicator_id: &str) -> bool {
        self.meta.quarterly_indicators.contains(indicator_id)
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct IndicatorTableRow {
    #[serde(rename = "#")]
    #[tabled(rename = "#")]
    pub index: usize,
    #[serde(rename = "Indicator")]
    #[tabled(rename = "Indicator")]
    pub indicator: String,
    #[serde(rename = "Period")]
    #[tabled(rename = "Period")]
    pub period: String,
    #[serde(rename = "Target")]
    #[tabled(rename = "Target")]
    pub target: String,
    #[serde(rename = "Result")]
    #[tabled(rename = "Result")]
    pub result: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

/// One retained row of an indicator drill-down.
#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct DetailRow {
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: String,
    #[serde(rename = "Target")]
    #[tabled(rename = "Target")]
    pub target: String,
    #[serde(rename = "Result")]
    #[tabled(rename = "Result")]
    pub result: String,
    #[serde(rename = "%")]
    #[tabled(rename = "%")]
    pub percentage: String,
    #[serde(rename = "Status")]
    #[tabled(rename = "Status")]
    pub status: String,
}

#[derive(Debug, Serialize, Tabled, Clone, Copy, PartialEq)]
pub struct DashboardStats {
    #[serde(rename = "TotalIndicators")]
    #[tabled(rename = "TotalIndicators")]
    pub total: usize,
    #[serde(rename = "Passed")]
    #[tabled(rename = "Passed")]
    pub passed: usize,
    #[serde(rename = "Failed")]
    #[tabled(rename = "Failed")]
    pub failed: usize,
    #[serde(rename = "SuccessRate")]
    #[tabled(rename = "SuccessRate")]
    #[tabled(display_with = "display_rate")]
    pub success_rate: f64,
}

fn display_rate(rate: &f64) -> String {
    format!("{}%", format_number(*rate, 1))
}
