use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Offset added to the schema version before it is stored in `PRAGMA user_version`,
/// so that a database stamped by this tool is distinguishable from one that
/// was never stamped (version 0).
pub const BASE_DB_VERSION: usize = 4200;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }

    fn from_sql(declared: &str) -> Option<&'static SqlType> {
        match declared {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            _ => None,
        }
    }
}

pub enum ForeignKeyOnChange {
    NoAction,
}

impl ForeignKeyOnChange {
    fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyOnChange::NoAction => "NO ACTION",
        }
    }
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
    pub on_delete: ForeignKeyOnChange,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub foreign_key: Option<&'static ForeignKey>,
}

impl Column {
    fn definition(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type.as_sql());
        if self.is_primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.non_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(foreign_key) = self.foreign_key {
            sql.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                foreign_key.foreign_table,
                foreign_key.foreign_column,
                foreign_key.on_delete.as_sql()
            ));
        }
        sql
    }
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

/// A column as reported by `PRAGMA table_info`.
struct ActualColumn {
    name: String,
    sql_type: Option<&'static SqlType>,
    non_null: bool,
    is_primary_key: bool,
}

struct ActualForeignKey {
    from_column: String,
    to_table: String,
    to_column: String,
    on_delete: String,
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let columns_sql = self
            .columns
            .iter()
            .map(Column::definition)
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, columns_sql),
            params![],
        )
        .with_context(|| format!("Failed to create table {}", self.name))?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn has_index(&self, conn: &Connection, index_name: &str) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                params![index_name, self.name],
                |_| Ok(()),
            )
            .optional()
            .with_context(|| format!("Failed to look up index {}", index_name))?;
        Ok(found.is_some())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns: Vec<ActualColumn> = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: SqlType::from_sql(&row.get::<_, String>(2)?),
                    non_null: row.get::<_, i32>(3)? == 1,
                    is_primary_key: row.get::<_, i32>(5)? >= 1,
                })
            })?
            .collect::<Result<_, _>>()?;

        if actual_columns.is_empty() {
            bail!("Table {} does not exist", self.name);
        }

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found column names: {}, expected: {}",
                self.name,
                actual_columns.len(),
                self.columns.len(),
                actual_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if actual.sql_type != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        for (index_name, _column) in self.indices {
            if !self.has_index(conn, index_name)? {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }

        // PRAGMA foreign_key_list: id, seq, table, from, to, on_update, on_delete, match
        let mut fk_stmt = conn.prepare(&format!("PRAGMA foreign_key_list({});", self.name))?;
        let actual_fks: Vec<ActualForeignKey> = fk_stmt
            .query_map(params![], |row| {
                Ok(ActualForeignKey {
                    from_column: row.get(3)?,
                    to_table: row.get(2)?,
                    to_column: row.get(4)?,
                    on_delete: row.get(6)?,
                })
            })?
            .collect::<Result<_, _>>()?;

        for column in self.columns {
            let Some(expected_fk) = column.foreign_key else {
                continue;
            };
            let found = actual_fks.iter().any(|actual| {
                actual.from_column == column.name
                    && actual.to_table == expected_fk.foreign_table
                    && actual.to_column == expected_fk.foreign_column
                    && actual.on_delete == expected_fk.on_delete.as_sql()
            });
            if !found {
                bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected_fk.foreign_table,
                    expected_fk.foreign_column,
                    expected_fk.on_delete.as_sql()
                );
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.pragma_update(None, "user_version", self.stamped_version() as i64)?;
        Ok(())
    }

    /// Checks that every table, column, index and foreign key of this schema
    /// is present in `conn`. Extra tables are ignored.
    ///
    /// A database whose `user_version` was never set (0) is accepted as long as
    /// its structure matches; any other version must be exactly this one.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let db_version: i64 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .context("Failed to read database version")?;
        if db_version != 0 && db_version != self.stamped_version() as i64 {
            bail!(
                "Unknown database version {}, expected {}",
                db_version,
                self.stamped_version()
            );
        }

        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }

    fn stamped_version(&self) -> usize {
        BASE_DB_VERSION + self.version
    }
}
