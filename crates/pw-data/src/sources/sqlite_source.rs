//! SQLite data source implementation

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pw_core::{CursorSource, OffsetSource};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::DataError;

/// One table row, keyed by its integer key column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: i64,
    pub columns: BTreeMap<String, Value>,
}

/// SQLite table served in key order, by offset or by key
pub struct SqliteSource {
    path: PathBuf,
    table_name: String,
    key_column: String,
    columns: Vec<String>,
    row_count: usize,
    name: String,
}

impl SqliteSource {
    /// Open `table_name` in the database at `path`, paging by `key_column`
    pub async fn open<P: AsRef<Path>>(
        path: P,
        table_name: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Result<Self, DataError> {
        let path = path.as_ref().to_path_buf();
        let table_name = table_name.into();
        let key_column = key_column.into();

        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&path)?;
            let columns = Self::detect_columns(&conn, &table_name)?;
            if !columns.contains(&key_column) {
                return Err(DataError::InvalidTable(format!(
                    "Table '{}' has no column '{}'",
                    table_name, key_column
                )));
            }
            let row_count = Self::count_rows(&conn, &table_name)?;
            let name = format!(
                "{}:{}",
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown.db"),
                table_name
            );

            Ok(Self {
                path,
                table_name,
                key_column,
                columns,
                row_count,
                name,
            })
        })
        .await?
    }

    /// Column names of the table, in declaration order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row count observed when the source was opened
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Detect columns from SQLite table
    fn detect_columns(conn: &Connection, table_name: &str) -> Result<Vec<String>, DataError> {
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table_name],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(DataError::InvalidTable(format!("Table '{}' not found", table_name)));
        }

        let query = format!("PRAGMA table_info({})", quote(table_name));
        let mut stmt = conn.prepare(&query)?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;

        if columns.is_empty() {
            return Err(DataError::InvalidTable(format!("Table '{}' has no columns", table_name)));
        }
        Ok(columns)
    }

    /// Count rows in table
    fn count_rows(conn: &Connection, table_name: &str) -> Result<usize, DataError> {
        let query = format!("SELECT COUNT(*) FROM {}", quote(table_name));
        let count: i64 = conn.query_row(&query, [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    /// Run a row query on a blocking thread
    async fn query_records(&self, sql: String, params: Vec<SqlValue>) -> Result<Vec<Record>, DataError> {
        let path = self.path.clone();
        let columns = self.columns.clone();
        let key_index = columns
            .iter()
            .position(|column| *column == self.key_column)
            .ok_or_else(|| DataError::Other(format!("Key column '{}' disappeared", self.key_column)))?;

        debug!("Running '{}' with {:?}", sql, params);
        tokio::task::spawn_blocking(move || -> Result<Vec<Record>, DataError> {
            let conn = Connection::open(&path)?;
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(params.iter()))?;

            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let id: i64 = row.get(key_index)?;
                let mut values = BTreeMap::new();
                for (index, column) in columns.iter().enumerate() {
                    values.insert(column.clone(), to_json(row.get_ref(index)?));
                }
                records.push(Record { id, columns: values });
            }
            Ok(records)
        })
        .await?
    }

    fn select(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| quote(column))
            .collect::<Vec<_>>()
            .join(", ");
        format!("SELECT {} FROM {}", columns, quote(&self.table_name))
    }
}

#[async_trait]
impl OffsetSource for SqliteSource {
    type Item = Record;

    async fn fetch(&self, offset: usize, page_size: usize) -> anyhow::Result<Vec<Record>> {
        let sql = format!(
            "{} ORDER BY {} LIMIT ?1 OFFSET ?2",
            self.select(),
            quote(&self.key_column)
        );
        let params = vec![
            SqlValue::Integer(page_size as i64),
            SqlValue::Integer(offset as i64),
        ];
        Ok(self.query_records(sql, params).await?)
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl CursorSource for SqliteSource {
    type Item = Record;
    type Id = i64;

    async fn fetch_after(&self, last_id: Option<&i64>, page_size: usize) -> anyhow::Result<Vec<Record>> {
        let key = quote(&self.key_column);
        let (sql, params) = match last_id {
            Some(id) => (
                format!("{} WHERE {} > ?1 ORDER BY {} LIMIT ?2", self.select(), key, key),
                vec![SqlValue::Integer(*id), SqlValue::Integer(page_size as i64)],
            ),
            None => (
                format!("{} ORDER BY {} LIMIT ?1", self.select(), key),
                vec![SqlValue::Integer(page_size as i64)],
            ),
        };
        Ok(self.query_records(sql, params).await?)
    }

    fn id_of(&self, item: &Record) -> i64 {
        item.id
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Quote an identifier for use in SQL text
fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).into_owned()),
        ValueRef::Blob(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
    }
}
