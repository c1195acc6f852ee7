use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),

    #[error("failed to read sheet {}: {source}", .path.display())]
    SheetRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("sheet {} is not valid JSON: {source}", .path.display())]
    SheetDecode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
