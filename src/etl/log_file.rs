//! Event-log handling: time dimension, users and songplay facts.

use super::pipeline::CatalogLoaded;
use super::record::{read_records, ParseError, Record};
use super::time_dimension::time_row_from_millis;
use super::EtlError;
use crate::warehouse::{
    Level, SongMatch, SongplayRow, TimeRow, UserRow, WarehouseError, WarehouseWriter,
};
use std::path::Path;
use tracing::debug;

/// The only page value that represents a song playback.
pub const NEXT_SONG_PAGE: &str = "NextSong";

/// A song-playback event read from a log file.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    /// Line of the event in its log file.
    pub line: usize,
    /// Epoch milliseconds.
    pub ts: i64,
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Level,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl LogEvent {
    pub fn from_record(record: &Record) -> Result<Self, ParseError> {
        let owned = |value: Option<&str>| value.map(str::to_string);
        Ok(LogEvent {
            line: record.line(),
            ts: record.i64("ts")?,
            user_id: record.i64("userId")?,
            first_name: owned(record.opt_str("firstName")?),
            last_name: owned(record.opt_str("lastName")?),
            gender: owned(record.opt_str("gender")?),
            level: record.parsed("level", "'free' or 'paid'")?,
            song: owned(record.opt_str("song")?),
            artist: owned(record.opt_str("artist")?),
            length: record.opt_f64("length")?,
            session_id: record.i64("sessionId")?,
            location: owned(record.opt_str("location")?),
            user_agent: owned(record.opt_str("userAgent")?),
        })
    }

    pub fn user_row(&self) -> UserRow {
        UserRow {
            user_id: self.user_id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level,
        }
    }

    pub fn songplay_row(&self, song_match: Option<SongMatch>) -> SongplayRow {
        let (song_id, artist_id) = match song_match {
            Some(found) => (Some(found.song_id), Some(found.artist_id)),
            None => (None, None),
        };
        SongplayRow {
            start_time: self.ts,
            user_id: self.user_id,
            level: self.level,
            song_id,
            artist_id,
            session_id: self.session_id,
            location: self.location.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Keeps the `NextSong` records, in file order, and reads them as events.
///
/// Other pages are dropped before their fields are looked at, so they may
/// carry empty user ids and the like.
pub fn next_song_events(records: &[Record]) -> Result<Vec<LogEvent>, ParseError> {
    let mut events = Vec::new();
    for record in records {
        if record.opt_str("page")? == Some(NEXT_SONG_PAGE) {
            events.push(LogEvent::from_record(record)?);
        }
    }
    Ok(events)
}

/// One time row per event, in event order. Repeated timestamps are kept.
pub fn derive_time_rows(events: &[LogEvent]) -> Result<Vec<TimeRow>, ParseError> {
    events
        .iter()
        .map(|event| {
            time_row_from_millis(event.ts).ok_or(ParseError::InvalidField {
                field: "ts",
                line: event.line,
                expected: "an epoch-millisecond timestamp",
            })
        })
        .collect()
}

/// One user row per event, in event order, so the last event wins on upsert.
pub fn extract_users(events: &[LogEvent]) -> Vec<UserRow> {
    events.iter().map(LogEvent::user_row).collect()
}

/// Builds one songplay per event, resolving song and artist ids against the
/// catalog. Events whose song cannot be resolved to exactly one catalog entry
/// get null ids.
///
/// Takes a [`CatalogLoaded`] because resolution is only meaningful once every
/// song-catalog file has been committed.
pub fn build_songplays(
    writer: &dyn WarehouseWriter,
    events: &[LogEvent],
    _catalog: &CatalogLoaded,
) -> Result<Vec<SongplayRow>, WarehouseError> {
    let mut songplays = Vec::with_capacity(events.len());
    for event in events {
        let song_match = match (&event.song, &event.artist, event.length) {
            (Some(song), Some(artist), Some(length)) => {
                writer.find_song_and_artist(song, artist, length)?
            }
            _ => None,
        };
        if song_match.is_none() {
            debug!(
                "No catalog match for {:?} by {:?} ({:?}s) on line {}",
                event.song, event.artist, event.length, event.line
            );
        }
        songplays.push(event.songplay_row(song_match));
    }
    Ok(songplays)
}

/// Loads one log file: time rows, then users, then songplays.
pub fn process_log_file(
    writer: &dyn WarehouseWriter,
    path: &Path,
    catalog: &CatalogLoaded,
) -> Result<(), EtlError> {
    let records = read_records(path)?;
    let events = next_song_events(&records)?;

    let time_rows = derive_time_rows(&events)?;
    writer.insert_times(&time_rows)?;

    let users = extract_users(&events);
    writer.upsert_users(&users)?;

    let songplays = build_songplays(writer, &events, catalog)?;
    writer.insert_songplays(&songplays)?;

    debug!(
        "{}: {} records, {} songplays, {} resolved",
        path.display(),
        records.len(),
        songplays.len(),
        songplays.iter().filter(|s| s.song_id.is_some()).count()
    );
    Ok(())
}
