//! Row types written into the warehouse tables.

use std::str::FromStr;

/// One row of the `songs` dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i64,
    /// Seconds.
    pub duration: f64,
}

/// One row of the `artists` dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Subscription level of a user at the time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Free,
    Paid,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Free => "free",
            Level::Paid => "paid",
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Level::Free),
            "paid" => Ok(Level::Paid),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

/// One row of the `users` dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Level,
}

/// One row of the `time` dimension. Every field is a function of `start_time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRow {
    /// Epoch milliseconds.
    pub start_time: i64,
    pub hour: u32,
    pub day: u32,
    /// ISO 8601 week number.
    pub week: u32,
    pub month: u32,
    pub year: i32,
    /// 0 = Monday, 6 = Sunday.
    pub weekday: u32,
}

/// One row of the `songplays` fact table. `songplay_id` is assigned by the database.
#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub start_time: i64,
    pub user_id: i64,
    pub level: Level,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Identity of a catalog entry resolved from a log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Row counts of every warehouse table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub songs: usize,
    pub artists: usize,
    pub users: usize,
    pub time: usize,
    pub songplays: usize,
}
