use super::record::{read_records, ParseError, Record};
use super::EtlError;
use crate::warehouse::{ArtistRow, SongRow, WarehouseWriter};
use std::path::Path;
use tracing::debug;

/// Derives the song and artist rows of a catalog file.
///
/// Catalog files hold a single record; any further record is ignored.
pub fn extract_song_and_artist(records: &[Record]) -> Result<(SongRow, ArtistRow), ParseError> {
    let record = records.first().ok_or(ParseError::EmptyFile)?;

    let song = SongRow {
        song_id: record.str("song_id")?.to_string(),
        title: record.str("title")?.to_string(),
        artist_id: record.str("artist_id")?.to_string(),
        year: record.i64("year")?,
        duration: record.f64("duration")?,
    };

    let artist = ArtistRow {
        artist_id: song.artist_id.clone(),
        name: record.str("artist_name")?.to_string(),
        location: record.opt_str("artist_location")?.map(str::to_string),
        latitude: record.opt_f64("artist_latitude")?,
        longitude: record.opt_f64("artist_longitude")?,
    };

    Ok((song, artist))
}

/// Loads one song-catalog file: the song row first, then its artist.
pub fn process_song_file(writer: &dyn WarehouseWriter, path: &Path) -> Result<(), EtlError> {
    let records = read_records(path)?;
    if records.len() > 1 {
        debug!(
            "{} holds {} records, loading the first one only",
            path.display(),
            records.len()
        );
    }

    let (song, artist) = extract_song_and_artist(&records)?;
    writer.insert_song(&song)?;
    writer.insert_artist(&artist)?;
    Ok(())
}
