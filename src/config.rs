use crate::scope::{AreaScope, DEFAULT_SCOPE_PREFIX};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub const DATA_DIR_VAR: &str = "KPI_DATA_DIR";
pub const SCOPE_PREFIX_VAR: &str = "KPI_SCOPE_PREFIX";
pub const OUTPUT_DIR_VAR: &str = "KPI_OUTPUT_DIR";
pub const LOG_LEVEL_VAR: &str = "KPI_LOG_LEVEL";
pub const PREVIEW_ROWS_VAR: &str = "KPI_PREVIEW_ROWS";

/// Top-level configuration for the dashboard.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scope_prefix: String,
    pub preview_rows: usize,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Read `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let data_dir = PathBuf::from(env::var(DATA_DIR_VAR).unwrap_or_else(|_| "data".to_string()));
        let output_dir = PathBuf::from(env::var(OUTPUT_DIR_VAR).unwrap_or_else(|_| ".".to_string()));

        let scope_prefix = env::var(SCOPE_PREFIX_VAR)
            .unwrap_or_else(|_| DEFAULT_SCOPE_PREFIX.to_string())
            .trim()
            .to_string();
        if scope_prefix.is_empty() || !scope_prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidScopePrefix(scope_prefix));
        }

        let preview_rows = env::var(PREVIEW_ROWS_VAR)
            .unwrap_or_else(|_| "5".to_string())
            .trim()
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidPreviewRows)?;

        let log_level = env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            data_dir,
            output_dir,
            scope_prefix,
            preview_rows,
            telemetry: TelemetryConfig { log_level },
        })
    }

    pub fn scope(&self) -> AreaScope {
        AreaScope::new(self.scope_prefix.clone())
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KPI_SCOPE_PREFIX must be a non-empty string of digits, got '{0}'")]
    InvalidScopePrefix(String),

    #[error("KPI_PREVIEW_ROWS must be a non-negative integer")]
    InvalidPreviewRows,
}
