use crate::warehouse::TimeRow;
use chrono::{DateTime, Datelike, Timelike, Utc};

/// Decomposes an epoch-millisecond timestamp into its UTC calendar parts.
///
/// Returns `None` when the timestamp is outside the range chrono can represent.
pub fn time_row_from_millis(start_time: i64) -> Option<TimeRow> {
    let instant = DateTime::<Utc>::from_timestamp_millis(start_time)?;
    Some(TimeRow {
        start_time,
        hour: instant.hour(),
        day: instant.day(),
        week: instant.iso_week().week(),
        month: instant.month(),
        year: instant.year(),
        weekday: instant.weekday().num_days_from_monday(),
    })
}
