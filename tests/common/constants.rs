//! Shared constants for end-to-end tests
//!
//! When the sample data changes, update only this file.

// ============================================================================
// Song Catalog
// ============================================================================

/// Song resolved by the sample log events
pub const SONG_1_ID: &str = "SOZCTXZ12AB0182364";
pub const SONG_1_TITLE: &str = "Setanta matins";
pub const SONG_1_DURATION: f64 = 269.58322;
pub const ARTIST_1_ID: &str = "AR5KOSW1187FB35FF4";
pub const ARTIST_1_NAME: &str = "Elena";

/// Song never played in the sample logs
pub const SONG_2_ID: &str = "SOMZWCG12A8C13C480";
pub const SONG_2_TITLE: &str = "I Didn't Mean To";
pub const SONG_2_DURATION: f64 = 218.93179;
pub const ARTIST_2_ID: &str = "ARD7TVE1187B99BFB1";
pub const ARTIST_2_NAME: &str = "Casual";

// ============================================================================
// Event Log
// ============================================================================

pub const USER_1_ID: i64 = 15;
pub const USER_2_ID: i64 = 39;

/// 2018-11-01T20:57:10.796Z
pub const TS_1: i64 = 1541105830796;
/// 2018-11-01T21:01:46.796Z
pub const TS_2: i64 = 1541106106796;
/// 2018-11-01T21:05:52.796Z
pub const TS_3: i64 = 1541106352796;
/// Timestamp of the non-playback event
pub const TS_OTHER: i64 = 1541106496796;

pub const UNKNOWN_SONG_TITLE: &str = "Unknown Song";
