mod file_config;

pub use file_config::FileConfig;

use crate::etl::BatchOptions;
use crate::warehouse::{CatalogWriteMode, WarehouseSettings, DEFAULT_DURATION_TOLERANCE};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub const DEFAULT_SONG_DATA: &str = "data/song_data";
pub const DEFAULT_LOG_DATA: &str = "data/log_data";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db: Option<PathBuf>,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub catalog_write_mode: CatalogWriteMode,
    pub duration_tolerance: f64,
    pub sort_files: bool,
    pub continue_on_error: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db: None,
            song_data: PathBuf::from(DEFAULT_SONG_DATA),
            log_data: PathBuf::from(DEFAULT_LOG_DATA),
            catalog_write_mode: CatalogWriteMode::default(),
            duration_tolerance: DEFAULT_DURATION_TOLERANCE,
            sort_files: true,
            continue_on_error: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub warehouse: WarehouseSettings,
    pub batch: BatchOptions,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db
            .map(PathBuf::from)
            .or_else(|| cli.db.clone())
            .ok_or_else(|| anyhow::anyhow!("db must be specified via --db or in config file"))?;

        // The warehouse is provisioned out of band, never created here
        if !db_path.exists() {
            bail!("Database file does not exist: {:?}", db_path);
        }
        if !db_path.is_file() {
            bail!("db is not a file: {:?}", db_path);
        }

        let song_data = file
            .song_data
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.song_data.clone());
        let log_data = file
            .log_data
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.log_data.clone());
        for (name, dir) in [("song_data", &song_data), ("log_data", &log_data)] {
            if !dir.exists() {
                bail!("{} directory does not exist: {:?}", name, dir);
            }
            if !dir.is_dir() {
                bail!("{} is not a directory: {:?}", name, dir);
            }
        }

        let duration_tolerance = file.duration_tolerance.unwrap_or(cli.duration_tolerance);
        if !duration_tolerance.is_finite() || duration_tolerance < 0.0 {
            bail!(
                "duration_tolerance must be a non-negative number, got {}",
                duration_tolerance
            );
        }

        let warehouse = WarehouseSettings {
            catalog_write_mode: file
                .catalog_write_mode
                .unwrap_or(cli.catalog_write_mode),
            duration_tolerance,
        };
        let batch = BatchOptions {
            sort_files: file.sort_files.unwrap_or(cli.sort_files),
            continue_on_error: file.continue_on_error.unwrap_or(cli.continue_on_error),
        };

        Ok(Self {
            db_path,
            song_data,
            log_data,
            warehouse,
            batch,
        })
    }
}
