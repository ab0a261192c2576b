use crate::warehouse::CatalogWriteMode;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Settings read from an optional TOML file. Every key mirrors a CLI flag.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub db: Option<String>,
    pub song_data: Option<String>,
    pub log_data: Option<String>,
    pub catalog_write_mode: Option<CatalogWriteMode>,
    pub duration_tolerance: Option<f64>,
    pub sort_files: Option<bool>,
    pub continue_on_error: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
