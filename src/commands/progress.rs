//! Project Progress Commands

use kanban_store::{DomainResult, Filter, ProjectProgress, RemoteStore, Table};

use super::{from_row, to_row};

/// Create or replace the progress row of a project
pub async fn upsert_progress(store: &dyn RemoteStore, record: &ProjectProgress) -> DomainResult<ProjectProgress> {
    let row = store
        .upsert(Table::ProjectProgress, to_row(record)?, "project_id")
        .await?;
    from_row(row)
}

pub async fn get_progress(store: &dyn RemoteStore, project_id: &str) -> DomainResult<Option<ProjectProgress>> {
    let rows = store
        .select(Table::ProjectProgress, &Filter::eq("project_id", project_id), None)
        .await?;
    rows.into_iter().next().map(from_row).transpose()
}
