use crate::types::RawRow;

/// Area-code prefix of the district the dashboard reports on.
pub const DEFAULT_SCOPE_PREFIX: &str = "5406";

/// Geographic boundary of interest, expressed as an area-code prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaScope {
    prefix: String,
}

impl AreaScope {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A row is in scope when it carries an area code starting with the
    /// prefix. Rows without an area code never are.
    pub fn contains(&self, row: &RawRow) -> bool {
        row.area_code()
            .map(|code| code.starts_with(&self.prefix))
            .unwrap_or(false)
    }

    pub fn filter_in_scope(&self, rows: &[RawRow]) -> Vec<RawRow> {
        rows.iter().filter(|row| self.contains(row)).cloned().collect()
    }
}

impl Default for AreaScope {
    fn default() -> Self {
        Self::new(DEFAULT_SCOPE_PREFIX)
    }
}
