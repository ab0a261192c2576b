//! Test fixture creation for data directories and the warehouse database

use super::constants::*;
use rusqlite::Connection;
use serde_json::{json, Value};
use sparkify_etl::etl::{BatchOptions, EtlError};
use sparkify_etl::warehouse::{current_schema, SqliteWarehouse, WarehouseSettings};
use sparkify_etl::{Pipeline, PipelineReport};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn song_record(
    song_id: &str,
    title: &str,
    duration: f64,
    artist_id: &str,
    artist_name: &str,
) -> Value {
    json!({
        "num_songs": 1,
        "artist_id": artist_id,
        "artist_latitude": null,
        "artist_longitude": null,
        "artist_location": "",
        "artist_name": artist_name,
        "song_id": song_id,
        "title": title,
        "duration": duration,
        "year": 0
    })
}

/// A `NextSong` event as found in the event logs. `userId` is a string there.
pub fn log_event(ts: i64, user_id: i64, level: &str, song: &str, artist: &str, length: f64) -> Value {
    json!({
        "artist": artist,
        "auth": "Logged In",
        "firstName": "Lily",
        "gender": "F",
        "itemInSession": 0,
        "lastName": "Koch",
        "length": length,
        "level": level,
        "location": "Chicago-Naperville-Elgin, IL-IN-WI",
        "method": "PUT",
        "page": "NextSong",
        "registration": 1541048010796.0,
        "sessionId": 818,
        "song": song,
        "status": 200,
        "ts": ts,
        "userAgent": "Mozilla/5.0 (X11; Linux x86_64)",
        "userId": user_id.to_string()
    })
}

/// A non-playback event. These carry no song fields and may have no user.
pub fn other_page_event(ts: i64, page: &str) -> Value {
    json!({
        "artist": null,
        "auth": "Logged Out",
        "firstName": null,
        "gender": null,
        "itemInSession": 0,
        "lastName": null,
        "length": null,
        "level": "free",
        "location": null,
        "method": "GET",
        "page": page,
        "registration": null,
        "sessionId": 52,
        "song": null,
        "status": 200,
        "ts": ts,
        "userAgent": null,
        "userId": ""
    })
}

/// A provisioned warehouse database plus song and log data roots, all inside
/// one temporary directory.
pub struct TestWarehouse {
    _dir: TempDir,
    pub db_path: PathBuf,
    pub song_root: PathBuf,
    pub log_root: PathBuf,
}

impl TestWarehouse {
    /// Empty data roots and a database holding the warehouse schema.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("sparkify.db");
        let song_root = dir.path().join("song_data");
        let log_root = dir.path().join("log_data");
        fs::create_dir_all(&song_root).unwrap();
        fs::create_dir_all(&log_root).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        current_schema().create(&conn).unwrap();

        Self {
            _dir: dir,
            db_path,
            song_root,
            log_root,
        }
    }

    /// Two song files and one log file with three `NextSong` events (one of
    /// them resolvable against the catalog) and one other-page event.
    pub fn with_sample_data() -> Self {
        let env = Self::new();
        env.write_song_file(
            "A/A/A/TRAAAAW128F429D538.json",
            &song_record(SONG_1_ID, SONG_1_TITLE, SONG_1_DURATION, ARTIST_1_ID, ARTIST_1_NAME),
        );
        env.write_song_file(
            "A/A/B/TRAABJL12903CDCF1A.json",
            &song_record(SONG_2_ID, SONG_2_TITLE, SONG_2_DURATION, ARTIST_2_ID, ARTIST_2_NAME),
        );
        env.write_log_file(
            "2018/11/2018-11-01-events.json",
            &[
                other_page_event(TS_OTHER, "Home"),
                log_event(TS_1, USER_1_ID, "free", SONG_1_TITLE, ARTIST_1_NAME, SONG_1_DURATION),
                log_event(TS_2, USER_2_ID, "free", UNKNOWN_SONG_TITLE, ARTIST_1_NAME, 200.0),
                log_event(TS_3, USER_1_ID, "paid", SONG_2_TITLE, ARTIST_1_NAME, SONG_2_DURATION),
            ],
        );
        env
    }

    pub fn write_song_file(&self, relative: &str, record: &Value) -> PathBuf {
        write_lines(&self.song_root.join(relative), std::slice::from_ref(record))
    }

    pub fn write_log_file(&self, relative: &str, events: &[Value]) -> PathBuf {
        write_lines(&self.log_root.join(relative), events)
    }

    pub fn open(&self, settings: WarehouseSettings) -> SqliteWarehouse {
        SqliteWarehouse::open(&self.db_path, settings).unwrap()
    }

    pub fn run_pipeline(&self, options: BatchOptions) -> Result<PipelineReport, EtlError> {
        self.run_pipeline_with(WarehouseSettings::default(), options)
    }

    pub fn run_pipeline_with(
        &self,
        settings: WarehouseSettings,
        options: BatchOptions,
    ) -> Result<PipelineReport, EtlError> {
        let mut pipeline = Pipeline::new(self.open(settings), options);
        pipeline.run(&self.song_root, &self.log_root)
    }

    /// Separate read connection for assertions.
    pub fn connection(&self) -> Connection {
        Connection::open(&self.db_path).unwrap()
    }

    pub fn count(&self, sql: &str) -> i64 {
        self.connection().query_row(sql, [], |r| r.get(0)).unwrap()
    }
}

fn write_lines(path: &Path, records: &[Value]) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let content: Vec<String> = records.iter().map(Value::to_string).collect();
    fs::write(path, content.join("\n")).unwrap();
    path.to_path_buf()
}
