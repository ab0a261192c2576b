//! Two-stage run: the song catalog first, then the event logs.

use super::batch::{process_data, BatchOptions, BatchReport};
use super::log_file::process_log_file;
use super::song_file::process_song_file;
use super::EtlError;
use crate::warehouse::{SqliteWarehouse, TableCounts};
use std::path::Path;
use tracing::info;

/// Proof that a song-catalog batch ran to completion.
///
/// Only [`Pipeline::load_song_data`] hands these out, and log loading requires
/// one, so songplays are never resolved against a partially loaded catalog.
#[derive(Debug)]
pub struct CatalogLoaded {
    report: BatchReport,
}

impl CatalogLoaded {
    pub(crate) fn new(report: BatchReport) -> Self {
        Self { report }
    }

    pub fn report(&self) -> &BatchReport {
        &self.report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub song_data: BatchReport,
    pub log_data: BatchReport,
    /// Row counts after both batches.
    pub counts: TableCounts,
}

pub struct Pipeline {
    warehouse: SqliteWarehouse,
    options: BatchOptions,
}

impl Pipeline {
    pub fn new(warehouse: SqliteWarehouse, options: BatchOptions) -> Self {
        Self { warehouse, options }
    }

    pub fn warehouse(&self) -> &SqliteWarehouse {
        &self.warehouse
    }

    pub fn load_song_data(&mut self, song_root: &Path) -> Result<CatalogLoaded, EtlError> {
        info!("Loading song data from {}...", song_root.display());
        let report = process_data(
            &mut self.warehouse,
            song_root,
            self.options,
            process_song_file,
        )?;
        Ok(CatalogLoaded::new(report))
    }

    pub fn load_log_data(
        &mut self,
        log_root: &Path,
        catalog: &CatalogLoaded,
    ) -> Result<BatchReport, EtlError> {
        info!("Loading log data from {}...", log_root.display());
        process_data(
            &mut self.warehouse,
            log_root,
            self.options,
            |writer, path| process_log_file(writer, path, catalog),
        )
    }

    /// Loads every song file under `song_root`, then every log file under
    /// `log_root`.
    pub fn run(&mut self, song_root: &Path, log_root: &Path) -> Result<PipelineReport, EtlError> {
        let catalog = self.load_song_data(song_root)?;
        let log_data = self.load_log_data(log_root, &catalog)?;
        let counts = self.warehouse.get_counts()?;
        Ok(PipelineReport {
            song_data: catalog.report,
            log_data,
            counts,
        })
    }
}
