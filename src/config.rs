//! Runtime configuration.
//!
//! There are no CLI flags or environment variables; everything runs from
//! defaults, with the catalog file as the only optional override point.

use crate::error::{AppError, AppResult};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3030;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub db_path: PathBuf,
    /// Optional catalog JSON replacing the embedded doctors/hospitals.
    pub catalog_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_defaults() -> AppResult<Self> {
        Ok(Self {
            port: DEFAULT_PORT,
            db_path: default_db_path()?,
            catalog_path: None,
        })
    }
}

/// Database location under the platform's app-data directory.
fn default_db_path() -> AppResult<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| AppError::Custom("Cannot find data directory".to_string()))?;
    let app_dir = data_dir.join("arogya");
    std::fs::create_dir_all(&app_dir)?;
    Ok(app_dir.join("portal.db"))
}
