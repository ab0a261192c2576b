//! Sparkify ETL Library
//!
//! Loads the song catalog and the user-activity logs into the star-schema
//! warehouse. This library exposes the internal modules for the binary and the
//! integration tests.

pub mod config;
pub mod etl;
pub mod sqlite_persistence;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use etl::{BatchOptions, EtlError, Pipeline, PipelineReport};
pub use warehouse::{SqliteWarehouse, WarehouseSettings, WarehouseWriter};
