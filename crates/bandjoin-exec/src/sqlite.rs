//! SQLite-backed relations.
//!
//! Each database file holds one relation: its first user table. Cursors walk
//! the table in `rowid` order and fetch fixed-size chunks, so a scan never
//! holds more than `fetch_size` rows in the reader. The rowid doubles as the
//! row ordinal.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use bandjoin_error::{BandJoinError, Result};
use bandjoin_types::{Row, RowValues, Value};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params};
use tracing::debug;

use crate::reader::{KeySet, Relation, RowCursor};

/// Rows fetched per round trip.
pub const DEFAULT_FETCH_SIZE: usize = 1024;

/// The first user table of a SQLite database, opened read-only.
#[derive(Debug)]
pub struct SqliteRelation {
    path: PathBuf,
    conn: Connection,
    table: String,
    columns: Vec<String>,
    fetch_size: usize,
}

impl SqliteRelation {
    /// Open `path` and bind to its first user table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = open_read_only(path)?;
        let table: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                 ORDER BY rowid LIMIT 1",
                [],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
            .map_err(|e| BandJoinError::source_unavailable(path.display().to_string(), e))?;
        let table = table.ok_or_else(|| {
            BandJoinError::source_unavailable(path.display().to_string(), "no user table")
        })?;
        Self::bind(path, conn, table)
    }

    /// Open `path` and bind to a named table.
    pub fn open_table(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let path = path.as_ref();
        let conn = open_read_only(path)?;
        Self::bind(path, conn, table.to_owned())
    }

    fn bind(path: &Path, conn: Connection, table: String) -> Result<Self> {
        let columns = table_columns(&conn, &table)
            .map_err(|e| BandJoinError::source_unavailable(&table, e))?;
        if columns.is_empty() {
            return Err(BandJoinError::source_unavailable(&table, "no such table"));
        }
        debug!(
            path = %path.display(),
            table = %table,
            columns = columns.len(),
            "sqlite relation bound"
        );
        Ok(Self {
            path: path.to_path_buf(),
            conn,
            table,
            columns,
            fetch_size: DEFAULT_FETCH_SIZE,
        })
    }

    /// Override the chunk size (minimum 1).
    #[must_use]
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn scan_sql(&self, key_column: Option<&str>) -> String {
        let table = quote_ident(&self.table);
        match key_column {
            None => format!(
                "SELECT rowid, * FROM {table} WHERE rowid > ?1 ORDER BY rowid LIMIT ?2"
            ),
            Some(column) => format!(
                "SELECT rowid, * FROM {table} WHERE rowid > ?1 AND {} IN \
                 (SELECT value FROM json_each(?2)) ORDER BY rowid LIMIT ?3",
                quote_ident(column)
            ),
        }
    }
}

impl Relation for SqliteRelation {
    fn name(&self) -> &str {
        &self.table
    }

    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn open(&self) -> Result<Box<dyn RowCursor + '_>> {
        Ok(Box::new(SqliteCursor::new(self, self.scan_sql(None), None)))
    }

    fn open_filtered<'a>(
        &'a self,
        key_column: usize,
        keys: &'a KeySet,
    ) -> Result<Box<dyn RowCursor + 'a>> {
        let column = self.columns.get(key_column).ok_or_else(|| {
            BandJoinError::internal(format!(
                "key column {key_column} out of range for `{}`",
                self.table
            ))
        })?;
        let key_list: Vec<&Value> = keys.iter().filter(|k| !k.is_null()).collect();
        let json = serde_json::to_string(&key_list)
            .map_err(|e| BandJoinError::internal(format!("key list encoding: {e}")))?;
        Ok(Box::new(SqliteCursor::new(
            self,
            self.scan_sql(Some(column)),
            Some(json),
        )))
    }
}

struct SqliteCursor<'a> {
    relation: &'a SqliteRelation,
    sql: String,
    key_filter: Option<String>,
    last_rowid: i64,
    buffer: VecDeque<Row>,
    exhausted: bool,
}

impl<'a> SqliteCursor<'a> {
    fn new(relation: &'a SqliteRelation, sql: String, key_filter: Option<String>) -> Self {
        Self {
            relation,
            sql,
            key_filter,
            last_rowid: i64::MIN,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn refill(&mut self) -> Result<()> {
        let relation = self.relation;
        let unavailable = |e: rusqlite::Error| BandJoinError::source_unavailable(&relation.table, e);
        let limit = i64::try_from(relation.fetch_size).unwrap_or(i64::MAX);
        let width = relation.columns.len();

        let mut stmt = relation.conn.prepare_cached(&self.sql).map_err(unavailable)?;
        let mut rows = match &self.key_filter {
            Some(json) => stmt.query(params![self.last_rowid, json, limit]),
            None => stmt.query(params![self.last_rowid, limit]),
        }
        .map_err(unavailable)?;

        let mut fetched = 0_usize;
        while let Some(row) = rows.next().map_err(unavailable)? {
            let rowid: i64 = row.get(0).map_err(unavailable)?;
            let mut values = RowValues::with_capacity(width);
            for idx in 1..=width {
                values.push(value_from_ref(row.get_ref(idx).map_err(unavailable)?));
            }
            self.buffer.push_back(Row::new(rowid as u64, values));
            self.last_rowid = rowid;
            fetched += 1;
        }
        if fetched < relation.fetch_size {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl RowCursor for SqliteCursor<'_> {
    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.buffer.is_empty() && !self.exhausted {
            self.refill()?;
        }
        Ok(self.buffer.pop_front())
    }
}

fn open_read_only(path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| BandJoinError::source_unavailable(path.display().to_string(), e))
}

fn table_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    names.collect()
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        // Neither shape stores blobs; keep them readable rather than failing.
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Quote an SQL identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
