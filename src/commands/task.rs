//! Task Commands
//!
//! Bindings for card reads and writes.

use serde::Serialize;

use kanban_store::{DomainResult, Filter, OrderBy, Priority, RemoteStore, Table, Task};

use super::{from_row, from_rows, to_row};

// ========================
// Argument Structs
// ========================

#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskArgs<'a> {
    pub project_id: &'a str,
    pub status_id: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'a str>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<&'a str>,
}

/// Fields left as `None` are not touched
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTaskArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

#[derive(Serialize)]
struct StatusPatch<'a> {
    status_id: &'a str,
    updated_at: i64,
}

#[derive(Serialize)]
struct Timestamps {
    created_at: i64,
    updated_at: i64,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ========================
// Commands
// ========================

/// Cards of a project in arrival order
pub async fn list_tasks(store: &dyn RemoteStore, project_id: &str) -> DomainResult<Vec<Task>> {
    let rows = store
        .select(
            Table::Tasks,
            &Filter::eq("project_id", project_id),
            Some(&OrderBy::asc("created_at")),
        )
        .await?;
    from_rows(rows)
}

/// Move a card to another column
pub async fn set_task_status(store: &dyn RemoteStore, task_id: &str, status_id: &str) -> DomainResult<Task> {
    let patch = to_row(&StatusPatch { status_id, updated_at: now_millis() })?;
    let row = store.update(Table::Tasks, task_id, patch).await?;
    from_row(row)
}

pub async fn create_task(store: &dyn RemoteStore, args: &CreateTaskArgs<'_>) -> DomainResult<Task> {
    let now = now_millis();
    let mut row = to_row(args)?;
    row.extend(to_row(&Timestamps { created_at: now, updated_at: now })?);
    let created = store.insert(Table::Tasks, row).await?;
    from_row(created)
}

pub async fn update_task(store: &dyn RemoteStore, task_id: &str, args: &UpdateTaskArgs) -> DomainResult<Task> {
    let mut patch = to_row(args)?;
    patch.insert("updated_at".to_string(), now_millis().into());
    let row = store.update(Table::Tasks, task_id, patch).await?;
    from_row(row)
}

pub async fn delete_task(store: &dyn RemoteStore, task_id: &str) -> DomainResult<()> {
    store.delete(Table::Tasks, task_id).await?;
    Ok(())
}
