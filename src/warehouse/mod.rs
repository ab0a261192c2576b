mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use schema::{current_schema, WAREHOUSE_VERSIONED_SCHEMAS};
pub use store::{
    CatalogWriteMode, FileTransaction, SqliteWarehouse, WarehouseSettings,
    DEFAULT_DURATION_TOLERANCE,
};
pub use trait_def::{WarehouseError, WarehouseWriter};
