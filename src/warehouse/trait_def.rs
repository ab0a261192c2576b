//! Write-side interface the file handlers use.

use super::models::{ArtistRow, SongMatch, SongRow, SongplayRow, TimeRow, UserRow};
use thiserror::Error;

/// Errors raised by warehouse writes and lookups.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// A write violated a uniqueness or foreign-key constraint.
    #[error("Write conflict on table {table} for key {key}: {message}")]
    WriteConflict {
        table: &'static str,
        key: String,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Writes warehouse rows inside the transaction of the file being processed.
///
/// Catalog rows (`songs`, `artists`) follow the configured
/// [`CatalogWriteMode`](super::CatalogWriteMode). Users are always upserted so
/// the latest `level` wins. A repeated `time` row is a no-op.
pub trait WarehouseWriter {
    fn insert_song(&self, song: &SongRow) -> Result<(), WarehouseError>;

    fn insert_artist(&self, artist: &ArtistRow) -> Result<(), WarehouseError>;

    fn insert_times(&self, rows: &[TimeRow]) -> Result<(), WarehouseError>;

    fn upsert_users(&self, rows: &[UserRow]) -> Result<(), WarehouseError>;

    fn insert_songplays(&self, rows: &[SongplayRow]) -> Result<(), WarehouseError>;

    /// Resolves a (title, artist name, duration) triple to catalog identifiers.
    ///
    /// Returns `None` unless exactly one song matches.
    fn find_song_and_artist(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>, WarehouseError>;
}
