//! Extract-transform-load of Sparkify song and log files.
//!
//! Song-catalog files feed the `songs` and `artists` dimensions. Log files feed
//! `time`, `users` and the `songplays` facts, whose song and artist ids are
//! resolved against the catalog loaded beforehand.

mod batch;
mod log_file;
mod pipeline;
mod record;
mod song_file;
mod time_dimension;

pub use batch::{find_json_files, process_data, BatchOptions, BatchReport};
pub use log_file::{
    build_songplays, derive_time_rows, extract_users, next_song_events, process_log_file,
    LogEvent, NEXT_SONG_PAGE,
};
pub use pipeline::{CatalogLoaded, Pipeline, PipelineReport};
pub use record::{read_records, ParseError, Record};
pub use song_file::{extract_song_and_artist, process_song_file};
pub use time_dimension::time_row_from_millis;

use crate::warehouse::WarehouseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to process {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: Box<EtlError>,
    },
}
