//! SQLite schema of the Sparkify warehouse.
//!
//! Star schema with one fact table (`songplays`) and four dimensions
//! (`songs`, `artists`, `users`, `time`). The tool writes into an existing
//! database with this layout; it never creates or migrates it at run time.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

// =============================================================================
// Dimension Tables
// =============================================================================

const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("song_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        // Not a foreign key: within a catalog file the song is written before its artist.
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("duration", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_songs_title", "title")],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("latitude", &SqlType::Real),
        sqlite_column!("longitude", &SqlType::Real),
    ],
    indices: &[("idx_artists_name", "name")],
};

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("first_name", &SqlType::Text),
        sqlite_column!("last_name", &SqlType::Text),
        sqlite_column!("gender", &SqlType::Text),
        sqlite_column!("level", &SqlType::Text, non_null = true), // 'free', 'paid'
    ],
    indices: &[],
};

/// Calendar decomposition of a songplay start time (epoch milliseconds, UTC).
const TIME_TABLE: Table = Table {
    name: "time",
    columns: &[
        sqlite_column!("start_time", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("hour", &SqlType::Integer, non_null = true),
        sqlite_column!("day", &SqlType::Integer, non_null = true),
        sqlite_column!("week", &SqlType::Integer, non_null = true), // ISO week
        sqlite_column!("month", &SqlType::Integer, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("weekday", &SqlType::Integer, non_null = true), // 0 = Monday
    ],
    indices: &[],
};

// =============================================================================
// Fact Table
// =============================================================================

const SONGPLAYS_START_TIME_FK: ForeignKey = ForeignKey {
    foreign_table: "time",
    foreign_column: "start_time",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SONGPLAYS_USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "user_id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SONGPLAYS_SONG_FK: ForeignKey = ForeignKey {
    foreign_table: "songs",
    foreign_column: "song_id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SONGPLAYS_ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "artist_id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const SONGPLAYS_TABLE: Table = Table {
    name: "songplays",
    columns: &[
        sqlite_column!("songplay_id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "start_time",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONGPLAYS_START_TIME_FK)
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&SONGPLAYS_USER_FK)
        ),
        sqlite_column!("level", &SqlType::Text, non_null = true),
        sqlite_column!(
            "song_id",
            &SqlType::Text,
            foreign_key = Some(&SONGPLAYS_SONG_FK)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            foreign_key = Some(&SONGPLAYS_ARTIST_FK)
        ),
        sqlite_column!("session_id", &SqlType::Integer, non_null = true),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("user_agent", &SqlType::Text),
    ],
    indices: &[("idx_songplays_user", "user_id")],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const WAREHOUSE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SONGS_TABLE,
        ARTISTS_TABLE,
        USERS_TABLE,
        TIME_TABLE,
        SONGPLAYS_TABLE,
    ],
}];

/// The schema the loader writes into.
pub fn current_schema() -> &'static VersionedSchema {
    &WAREHOUSE_VERSIONED_SCHEMAS[WAREHOUSE_VERSIONED_SCHEMAS.len() - 1]
}
