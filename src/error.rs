//! Error types for dataset loading and configuration
//!
//! Graph construction itself never fails: schema anomalies are defaulted,
//! resolution misses fall back to literal text and cache failures degrade to
//! "not stored". Only reading the source datasets and the configuration can
//! surface an error.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for jigen operations
pub type Result<T> = std::result::Result<T, JigenError>;

/// Loader and configuration errors
#[derive(Error, Debug)]
pub enum JigenError {
    #[error("Dataset not found: {name} at {path}")]
    MissingDataset { name: String, path: PathBuf },

    #[error("Invalid dataset {name}: {reason}")]
    InvalidDataset { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Cache store error: {0}")]
    Store(#[from] crate::cache::StoreError),
}
