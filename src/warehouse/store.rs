//! SQLite-backed warehouse writer.
//!
//! A single connection is used serially for the whole run. Every input file is
//! processed inside its own [`FileTransaction`], committed once the file is done.

use super::models::*;
use super::schema::current_schema;
use super::trait_def::{WarehouseError, WarehouseWriter};
use anyhow::{Context, Result};
use clap::ValueEnum;
use rusqlite::{params, Connection, OpenFlags, Transaction, TransactionBehavior};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// What a catalog insert (`songs`, `artists`) does when the primary key exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogWriteMode {
    /// Plain insert, a duplicate key is a write conflict.
    #[default]
    Strict,
    /// A duplicate key leaves the existing row untouched.
    Ignore,
    /// A duplicate key overwrites the existing row.
    Upsert,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarehouseSettings {
    pub catalog_write_mode: CatalogWriteMode,
    /// Maximum absolute difference, in seconds, between a log event `length`
    /// and a catalog song `duration` for the two to be considered the same song.
    pub duration_tolerance: f64,
}

pub const DEFAULT_DURATION_TOLERANCE: f64 = 1e-3;

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            catalog_write_mode: CatalogWriteMode::default(),
            duration_tolerance: DEFAULT_DURATION_TOLERANCE,
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

const SONG_INSERT: &str =
    "INSERT INTO songs (song_id, title, artist_id, year, duration) VALUES (?1, ?2, ?3, ?4, ?5)";
const SONG_INSERT_IGNORE: &str =
    "INSERT INTO songs (song_id, title, artist_id, year, duration) VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(song_id) DO NOTHING";
const SONG_UPSERT: &str =
    "INSERT INTO songs (song_id, title, artist_id, year, duration) VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(song_id) DO UPDATE SET
        title = excluded.title,
        artist_id = excluded.artist_id,
        year = excluded.year,
        duration = excluded.duration";

const ARTIST_INSERT: &str =
    "INSERT INTO artists (artist_id, name, location, latitude, longitude) VALUES (?1, ?2, ?3, ?4, ?5)";
const ARTIST_INSERT_IGNORE: &str =
    "INSERT INTO artists (artist_id, name, location, latitude, longitude) VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(artist_id) DO NOTHING";
const ARTIST_UPSERT: &str =
    "INSERT INTO artists (artist_id, name, location, latitude, longitude) VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(artist_id) DO UPDATE SET
        name = excluded.name,
        location = excluded.location,
        latitude = excluded.latitude,
        longitude = excluded.longitude";

const TIME_INSERT: &str =
    "INSERT INTO time (start_time, hour, day, week, month, year, weekday)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(start_time) DO NOTHING";

const USER_UPSERT: &str =
    "INSERT INTO users (user_id, first_name, last_name, gender, level) VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(user_id) DO UPDATE SET
        first_name = excluded.first_name,
        last_name = excluded.last_name,
        gender = excluded.gender,
        level = excluded.level";

const SONGPLAY_INSERT: &str =
    "INSERT INTO songplays (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

// LIMIT 2 is enough to tell a unique match from an ambiguous one.
const SONG_LOOKUP: &str = "SELECT songs.song_id, songs.artist_id FROM songs
     JOIN artists ON songs.artist_id = artists.artist_id
     WHERE songs.title = ?1 AND artists.name = ?2 AND ABS(songs.duration - ?3) <= ?4
     LIMIT 2";

impl CatalogWriteMode {
    fn song_statement(&self) -> &'static str {
        match self {
            CatalogWriteMode::Strict => SONG_INSERT,
            CatalogWriteMode::Ignore => SONG_INSERT_IGNORE,
            CatalogWriteMode::Upsert => SONG_UPSERT,
        }
    }

    fn artist_statement(&self) -> &'static str {
        match self {
            CatalogWriteMode::Strict => ARTIST_INSERT,
            CatalogWriteMode::Ignore => ARTIST_INSERT_IGNORE,
            CatalogWriteMode::Upsert => ARTIST_UPSERT,
        }
    }
}

/// Turns constraint violations into [`WarehouseError::WriteConflict`].
fn map_write_error(table: &'static str, key: impl ToString, err: rusqlite::Error) -> WarehouseError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, message)
            if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            WarehouseError::WriteConflict {
                table,
                key: key.to_string(),
                message: message.unwrap_or_else(|| sqlite_err.to_string()),
            }
        }
        other => WarehouseError::Database(other),
    }
}

// =============================================================================
// Warehouse
// =============================================================================

pub struct SqliteWarehouse {
    conn: Connection,
    settings: WarehouseSettings,
}

impl SqliteWarehouse {
    /// Opens an existing warehouse database and validates its schema.
    ///
    /// The database file must already exist; it is never created here.
    pub fn open<P: AsRef<Path>>(db_path: P, settings: WarehouseSettings) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open warehouse database {}", db_path.display()))?;

        Self::from_connection(conn, settings)
    }

    pub fn from_connection(conn: Connection, settings: WarehouseSettings) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        current_schema()
            .validate(&conn)
            .context("Warehouse schema validation failed")?;

        let warehouse = SqliteWarehouse { conn, settings };
        let counts = warehouse.get_counts()?;
        info!(
            "Opened warehouse: {} songs, {} artists, {} users, {} time rows, {} songplays",
            counts.songs, counts.artists, counts.users, counts.time, counts.songplays
        );
        Ok(warehouse)
    }

    /// Starts the transaction all writes for one input file go through.
    pub fn begin_file(&mut self) -> Result<FileTransaction<'_>, WarehouseError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(FileTransaction {
            tx,
            settings: self.settings,
        })
    }

    pub fn get_counts(&self) -> Result<TableCounts, WarehouseError> {
        let count = |table: &str| -> Result<usize, WarehouseError> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(TableCounts {
            songs: count("songs")?,
            artists: count("artists")?,
            users: count("users")?,
            time: count("time")?,
            songplays: count("songplays")?,
        })
    }

    #[cfg(test)]
    pub(crate) fn in_memory(settings: WarehouseSettings) -> Self {
        let conn = Connection::open_in_memory().unwrap();
        current_schema().create(&conn).unwrap();
        Self::from_connection(conn, settings).unwrap()
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Transaction scoped to one input file. Dropping it without [`commit`](Self::commit)
/// rolls every write back.
pub struct FileTransaction<'conn> {
    tx: Transaction<'conn>,
    settings: WarehouseSettings,
}

impl FileTransaction<'_> {
    pub fn commit(self) -> Result<(), WarehouseError> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> Result<(), WarehouseError> {
        self.tx.rollback()?;
        Ok(())
    }
}

impl WarehouseWriter for FileTransaction<'_> {
    fn insert_song(&self, song: &SongRow) -> Result<(), WarehouseError> {
        let mut stmt = self
            .tx
            .prepare_cached(self.settings.catalog_write_mode.song_statement())?;
        stmt.execute(params![
            &song.song_id,
            &song.title,
            &song.artist_id,
            song.year,
            song.duration
        ])
        .map_err(|e| map_write_error("songs", &song.song_id, e))?;
        Ok(())
    }

    fn insert_artist(&self, artist: &ArtistRow) -> Result<(), WarehouseError> {
        let mut stmt = self
            .tx
            .prepare_cached(self.settings.catalog_write_mode.artist_statement())?;
        stmt.execute(params![
            &artist.artist_id,
            &artist.name,
            &artist.location,
            artist.latitude,
            artist.longitude
        ])
        .map_err(|e| map_write_error("artists", &artist.artist_id, e))?;
        Ok(())
    }

    fn insert_times(&self, rows: &[TimeRow]) -> Result<(), WarehouseError> {
        let mut stmt = self.tx.prepare_cached(TIME_INSERT)?;
        for row in rows {
            stmt.execute(params![
                row.start_time,
                row.hour,
                row.day,
                row.week,
                row.month,
                row.year,
                row.weekday
            ])
            .map_err(|e| map_write_error("time", row.start_time, e))?;
        }
        Ok(())
    }

    fn upsert_users(&self, rows: &[UserRow]) -> Result<(), WarehouseError> {
        let mut stmt = self.tx.prepare_cached(USER_UPSERT)?;
        for row in rows {
            stmt.execute(params![
                row.user_id,
                &row.first_name,
                &row.last_name,
                &row.gender,
                row.level.as_str()
            ])
            .map_err(|e| map_write_error("users", row.user_id, e))?;
        }
        Ok(())
    }

    fn insert_songplays(&self, rows: &[SongplayRow]) -> Result<(), WarehouseError> {
        let mut stmt = self.tx.prepare_cached(SONGPLAY_INSERT)?;
        for row in rows {
            stmt.execute(params![
                row.start_time,
                row.user_id,
                row.level.as_str(),
                &row.song_id,
                &row.artist_id,
                row.session_id,
                &row.location,
                &row.user_agent
            ])
            .map_err(|e| {
                map_write_error(
                    "songplays",
                    format!("{}@{}", row.user_id, row.start_time),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn find_song_and_artist(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>, WarehouseError> {
        let mut stmt = self.tx.prepare_cached(SONG_LOOKUP)?;
        let mut matches = stmt
            .query_map(
                params![title, artist_name, duration, self.settings.duration_tolerance],
                |r| {
                    Ok(SongMatch {
                        song_id: r.get(0)?,
                        artist_id: r.get(1)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        if matches.len() > 1 {
            debug!(
                "Ambiguous catalog match for '{}' by '{}' ({}s), leaving ids empty",
                title, artist_name, duration
            );
            return Ok(None);
        }
        Ok(matches.pop())
    }
}
