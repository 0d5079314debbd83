//! Status Commands

use kanban_store::{DomainResult, Filter, OrderBy, RemoteStore, Status, Table};

use super::from_rows;

/// Columns of a project, left to right
pub async fn list_statuses(store: &dyn RemoteStore, project_id: &str) -> DomainResult<Vec<Status>> {
    let rows = store
        .select(
            Table::Statuses,
            &Filter::eq("project_id", project_id),
            Some(&OrderBy::asc("display_order")),
        )
        .await?;
    from_rows(rows)
}
