//! Common test infrastructure
//!
//! This module provides everything the end-to-end tests need: a provisioned
//! warehouse database next to song and log data directories.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestWarehouse;
//!
//! #[test]
//! fn test_run() {
//!     let env = TestWarehouse::with_sample_data();
//!     let report = env.run_pipeline(Default::default()).unwrap();
//!     assert_eq!(report.counts.songs, 2);
//! }
//! ```

mod constants;
mod fixtures;

// Public API - this is what tests import
pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{log_event, other_page_event, song_record, TestWarehouse};
