use anyhow::{Context, Result};
use clap::Parser;
use sparkify_etl::config::{AppConfig, CliConfig, FileConfig, DEFAULT_LOG_DATA, DEFAULT_SONG_DATA};
use sparkify_etl::etl::{BatchReport, Pipeline, PipelineReport};
use sparkify_etl::warehouse::{CatalogWriteMode, SqliteWarehouse, DEFAULT_DURATION_TOLERANCE};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(name = "sparkify-etl")]
#[command(about = "Load Sparkify song and log data into the warehouse database")]
struct CliArgs {
    /// Path to the existing SQLite warehouse database.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Root directory of the song-catalog JSON files.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_SONG_DATA)]
    pub song_data: PathBuf,

    /// Root directory of the event-log JSON files.
    #[clap(long, value_parser = parse_path, default_value = DEFAULT_LOG_DATA)]
    pub log_data: PathBuf,

    /// Path to a TOML config file. Its values override the command line.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// What to do when a song or artist id is already in the warehouse.
    #[clap(long, value_enum, default_value_t = CatalogWriteMode::Strict)]
    pub catalog_write_mode: CatalogWriteMode,

    /// Maximum difference in seconds between an event length and a song duration.
    #[clap(long, default_value_t = DEFAULT_DURATION_TOLERANCE)]
    pub duration_tolerance: f64,

    /// Process files in directory order instead of sorted by name.
    #[clap(long, default_value_t = false)]
    pub no_sort: bool,

    /// Roll back and skip failing files instead of aborting.
    #[clap(long, default_value_t = false)]
    pub continue_on_error: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db: self.db.clone(),
            song_data: self.song_data.clone(),
            log_data: self.log_data.clone(),
            catalog_write_mode: self.catalog_write_mode,
            duration_tolerance: self.duration_tolerance,
            sort_files: !self.no_sort,
            continue_on_error: self.continue_on_error,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening warehouse database at {:?}...", config.db_path);
    let warehouse = SqliteWarehouse::open(&config.db_path, config.warehouse)?;

    let mut pipeline = Pipeline::new(warehouse, config.batch);
    let report = pipeline
        .run(&config.song_data, &config.log_data)
        .context("ETL run failed")?;

    log_summary(&report);
    Ok(())
}

fn log_batch(name: &str, batch: &BatchReport) {
    info!(
        "{}: {}/{} files processed",
        name, batch.files_processed, batch.files_found
    );
    if !batch.skipped.is_empty() {
        warn!("{}: {} files skipped", name, batch.skipped.len());
        for path in &batch.skipped {
            warn!("  {}", path.display());
        }
    }
}

fn log_summary(report: &PipelineReport) {
    info!("");
    info!("Load Summary");
    info!("============");
    log_batch("Song data", &report.song_data);
    log_batch("Log data", &report.log_data);

    info!("");
    info!("Warehouse contains:");
    info!("  {} songs", report.counts.songs);
    info!("  {} artists", report.counts.artists);
    info!("  {} users", report.counts.users);
    info!("  {} time rows", report.counts.time);
    info!("  {} songplays", report.counts.songplays);

    info!("");
    info!("Load completed successfully!");
}
