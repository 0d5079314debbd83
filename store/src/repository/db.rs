//! Database Connection and Setup
//!
//! Opens the SQLite database and runs schema migrations.

use std::path::Path;

use rusqlite::Connection;

use crate::domain::{DomainError, DomainResult};

/// Open (or create) a database and bring its schema up to date.
/// `":memory:"` opens a private in-memory database.
pub fn open_connection(db_path: &Path) -> DomainResult<Connection> {
    let conn = if db_path.as_os_str() == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open(db_path)
    }
    .map_err(|e| DomainError::Internal(format!("Failed to open db: {}", e)))?;

    run_migrations(&conn)?;
    Ok(conn)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(1) {
            if name == column {
                return true;
            }
        }
    }
    false
}

fn execute(conn: &Connection, sql: &str) -> DomainResult<()> {
    conn.execute(sql, [])
        .map(|_| ())
        .map_err(|e| DomainError::Internal(e.to_string()))
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    execute(
        conn,
        "CREATE TABLE IF NOT EXISTS statuses (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            name TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0
        )",
    )?;

    execute(
        conn,
        "CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            status_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            priority TEXT NOT NULL DEFAULT 'Medium',
            created_by TEXT,
            created_at INTEGER,
            updated_at INTEGER
        )",
    )?;

    // Assignment came after the first schema
    if !column_exists(conn, "tasks", "assigned_to") {
        execute(conn, "ALTER TABLE tasks ADD COLUMN assigned_to TEXT")
            .map_err(|e| DomainError::Internal(format!("Failed to add assigned_to: {}", e)))?;
    }

    execute(
        conn,
        "CREATE TABLE IF NOT EXISTS project_progress (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL UNIQUE,
            percentage INTEGER NOT NULL DEFAULT 0,
            calculated_at INTEGER
        )",
    )?;

    execute(conn, "CREATE INDEX IF NOT EXISTS idx_statuses_project ON statuses(project_id)")?;
    execute(conn, "CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id)")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = open_connection(Path::new(":memory:")).unwrap();
        run_migrations(&conn).unwrap();
        assert!(column_exists(&conn, "tasks", "assigned_to"));
        assert!(column_exists(&conn, "project_progress", "calculated_at"));
        assert!(!column_exists(&conn, "tasks", "position"));
    }

    #[test]
    fn test_file_database_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");
        open_connection(&path).unwrap();
        assert!(path.exists());
    }
}
