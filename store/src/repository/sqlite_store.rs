//! SQLite Store
//!
//! `rusqlite`-backed implementation of the remote store. Rows map to SQL
//! columns one to one; JSON values convert to SQL values and back.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tokio::sync::Mutex;

use super::change_feed::{ChangeEvent, ChangeFeed, ChangeKind, Subscription};
use super::db::open_connection;
use super::table::{ensure_id, Filter, OrderBy, Row, Table};
use super::traits::{ChangeListener, RemoteStore};
use crate::domain::{DomainError, DomainResult};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    feed: ChangeFeed,
}

impl SqliteStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            feed: ChangeFeed::new(),
        }
    }

    /// Open a database file, running migrations
    pub fn open(db_path: &Path) -> DomainResult<Self> {
        let conn = open_connection(db_path)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    pub fn open_in_memory() -> DomainResult<Self> {
        Self::open(Path::new(":memory:"))
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null | SqlValue::Blob(_) => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
    }
}

fn map_sql_error(err: rusqlite::Error) -> DomainError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_NOTNULL => {
            DomainError::InvalidInput(err.to_string())
        }
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            DomainError::Conflict(err.to_string())
        }
        _ => DomainError::Internal(err.to_string()),
    }
}

fn query_rows(conn: &Connection, table: Table, sql: &str, params: Vec<SqlValue>) -> DomainResult<Vec<Row>> {
    let columns = table.columns();
    let mut stmt = conn.prepare(sql).map_err(map_sql_error)?;
    let mapped = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let mut out = Row::new();
            for (i, column) in columns.iter().enumerate() {
                let value: SqlValue = row.get(i)?;
                out.insert((*column).to_string(), from_sql(value));
            }
            Ok(out)
        })
        .map_err(map_sql_error)?;

    let mut rows = Vec::new();
    for row in mapped {
        rows.push(row.map_err(map_sql_error)?);
    }
    Ok(rows)
}

fn find_by(conn: &Connection, table: Table, column: &str, value: &Value) -> DomainResult<Option<Row>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? LIMIT 1",
        table.columns().join(", "),
        table,
        column
    );
    Ok(query_rows(conn, table, &sql, vec![to_sql(value)])?.into_iter().next())
}

fn insert_row(conn: &Connection, table: Table, row: &Row) -> DomainResult<()> {
    let columns: Vec<&str> = row.keys().map(String::as_str).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders);
    let values: Vec<SqlValue> = row.values().map(to_sql).collect();
    conn.execute(&sql, params_from_iter(values.iter())).map_err(map_sql_error)?;
    Ok(())
}

/// Apply `patch` to the row with `id`; returns whether a row matched
fn update_row(conn: &Connection, table: Table, id: &str, patch: &Row) -> DomainResult<bool> {
    if patch.is_empty() {
        return Ok(find_by(conn, table, "id", &Value::from(id))?.is_some());
    }
    let assignments: Vec<String> = patch.keys().map(|k| format!("{} = ?", k)).collect();
    let sql = format!("UPDATE {} SET {} WHERE id = ?", table, assignments.join(", "));
    let mut values: Vec<SqlValue> = patch.values().map(to_sql).collect();
    values.push(SqlValue::Text(id.to_string()));
    let changed = conn.execute(&sql, params_from_iter(values.iter())).map_err(map_sql_error)?;
    Ok(changed > 0)
}

fn stored_row(conn: &Connection, table: Table, id: &str) -> DomainResult<Row> {
    find_by(conn, table, "id", &Value::from(id))?
        .ok_or_else(|| DomainError::NotFound(format!("{} row {}", table, id)))
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn select(&self, table: Table, filter: &Filter, order_by: Option<&OrderBy>) -> DomainResult<Vec<Row>> {
        let mut sql = format!("SELECT {} FROM {}", table.columns().join(", "), table);
        let mut params = Vec::new();
        if let Filter::Eq { column, value } = filter {
            table.check_column(column)?;
            sql.push_str(&format!(" WHERE {} = ?", column));
            params.push(to_sql(value));
        }
        match order_by {
            Some(order) => {
                table.check_column(&order.column)?;
                let direction = if order.ascending { "ASC" } else { "DESC" };
                sql.push_str(&format!(" ORDER BY {} {}, rowid ASC", order.column, direction));
            }
            None => sql.push_str(" ORDER BY rowid ASC"),
        }

        let conn = self.conn.lock().await;
        query_rows(&conn, table, &sql, params)
    }

    async fn insert(&self, table: Table, mut row: Row) -> DomainResult<Row> {
        table.check_row(&row)?;
        let id = ensure_id(&mut row)?;
        let stored = {
            let conn = self.conn.lock().await;
            insert_row(&conn, table, &row)?;
            stored_row(&conn, table, &id)?
        };
        self.feed.publish(ChangeEvent { table, kind: ChangeKind::Insert, row: stored.clone() });
        Ok(stored)
    }

    async fn update(&self, table: Table, id: &str, mut patch: Row) -> DomainResult<Row> {
        table.check_row(&patch)?;
        patch.remove("id");
        let stored = {
            let conn = self.conn.lock().await;
            if !update_row(&conn, table, id, &patch)? {
                return Err(DomainError::NotFound(format!("{} row {}", table, id)));
            }
            stored_row(&conn, table, id)?
        };
        self.feed.publish(ChangeEvent { table, kind: ChangeKind::Update, row: stored.clone() });
        Ok(stored)
    }

    async fn delete(&self, table: Table, id: &str) -> DomainResult<Row> {
        let removed = {
            let conn = self.conn.lock().await;
            let row = stored_row(&conn, table, id)?;
            conn.execute(&format!("DELETE FROM {} WHERE id = ?", table), [id])
                .map_err(map_sql_error)?;
            row
        };
        self.feed.publish(ChangeEvent { table, kind: ChangeKind::Delete, row: removed.clone() });
        Ok(removed)
    }

    async fn upsert(&self, table: Table, mut row: Row, conflict_key: &str) -> DomainResult<Row> {
        table.check_row(&row)?;
        table.check_column(conflict_key)?;
        let key = row
            .get(conflict_key)
            .cloned()
            .ok_or_else(|| DomainError::InvalidInput(format!("upsert row is missing '{}'", conflict_key)))?;

        let (kind, stored) = {
            let conn = self.conn.lock().await;
            match find_by(&conn, table, conflict_key, &key)? {
                Some(existing) => {
                    let id = existing
                        .get("id")
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .ok_or_else(|| DomainError::Internal(format!("{} row without id", table)))?;
                    row.remove("id");
                    update_row(&conn, table, &id, &row)?;
                    (ChangeKind::Update, stored_row(&conn, table, &id)?)
                }
                None => {
                    let id = ensure_id(&mut row)?;
                    insert_row(&conn, table, &row)?;
                    (ChangeKind::Insert, stored_row(&conn, table, &id)?)
                }
            }
        };
        self.feed.publish(ChangeEvent { table, kind, row: stored.clone() });
        Ok(stored)
    }

    fn subscribe(&self, table: Table, filter: Filter, on_change: ChangeListener) -> Subscription {
        self.feed.subscribe(table, filter, on_change)
    }
}
