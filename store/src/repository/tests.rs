//! Repository Integration Tests
//!
//! The same behaviour checks run against the in-memory and SQLite stores.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use crate::domain::{DomainError, Task};
    use crate::repository::{
        ChangeKind, Filter, MemoryStore, OrderBy, RemoteStore, Row, SqliteStore, Table,
    };

    fn row(value: Value) -> Row {
        value.as_object().cloned().expect("object literal")
    }

    fn stores() -> Vec<(&'static str, Box<dyn RemoteStore>)> {
        vec![
            ("memory", Box::new(MemoryStore::new())),
            ("sqlite", Box::new(SqliteStore::open_in_memory().expect("Failed to open test DB"))),
        ]
    }

    async fn seed_statuses(store: &dyn RemoteStore) {
        for (id, name, order) in [("s3", "Done", 2), ("s1", "New", 0), ("s2", "In Progress", 1)] {
            store
                .insert(Table::Statuses, row(json!({"id": id, "project_id": "p1", "name": name, "display_order": order})))
                .await
                .unwrap();
        }
        store
            .insert(Table::Statuses, row(json!({"id": "x1", "project_id": "p2", "name": "New", "display_order": 0})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_select_filters_and_orders() {
        for (name, store) in stores() {
            seed_statuses(store.as_ref()).await;
            let rows = store
                .select(Table::Statuses, &Filter::eq("project_id", "p1"), Some(&OrderBy::asc("display_order")))
                .await
                .unwrap();
            let ids: Vec<&str> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
            assert_eq!(ids, vec!["s1", "s2", "s3"], "backend {}", name);

            let unordered = store.select(Table::Statuses, &Filter::All, None).await.unwrap();
            let ids: Vec<&str> = unordered.iter().map(|r| r["id"].as_str().unwrap()).collect();
            assert_eq!(ids, vec!["s3", "s1", "s2", "x1"], "backend {} keeps insertion order", name);
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_rejects_duplicates() {
        for (name, store) in stores() {
            let created = store
                .insert(Table::Tasks, row(json!({"project_id": "p1", "status_id": "s1", "title": "T", "priority": "Must"})))
                .await
                .unwrap();
            let id = created["id"].as_str().unwrap().to_string();
            assert!(!id.is_empty(), "backend {}", name);

            let duplicate = store
                .insert(Table::Tasks, row(json!({"id": id, "project_id": "p1", "status_id": "s1", "title": "T"})))
                .await;
            assert!(matches!(duplicate, Err(DomainError::Conflict(_))), "backend {}", name);
        }
    }

    #[tokio::test]
    async fn test_update_merges_and_reports_missing_rows() {
        for (name, store) in stores() {
            store
                .insert(Table::Tasks, row(json!({"id": "t1", "project_id": "p1", "status_id": "s1", "title": "T", "priority": "Tiny"})))
                .await
                .unwrap();

            let updated = store
                .update(Table::Tasks, "t1", row(json!({"status_id": "s3"})))
                .await
                .unwrap();
            let task: Task = serde_json::from_value(Value::Object(updated)).unwrap();
            assert_eq!(task.status_id, "s3", "backend {}", name);
            assert_eq!(task.title, "T", "backend {}", name);

            let missing = store.update(Table::Tasks, "ghost", row(json!({"status_id": "s3"}))).await;
            assert!(matches!(missing, Err(DomainError::NotFound(_))), "backend {}", name);

            let bad_column = store.update(Table::Tasks, "t1", row(json!({"rank": 1}))).await;
            assert!(matches!(bad_column, Err(DomainError::InvalidInput(_))), "backend {}", name);
        }
    }

    #[tokio::test]
    async fn test_delete_returns_row() {
        for (name, store) in stores() {
            store
                .insert(Table::Tasks, row(json!({"id": "t1", "project_id": "p1", "status_id": "s1", "title": "Gone"})))
                .await
                .unwrap();
            let removed = store.delete(Table::Tasks, "t1").await.unwrap();
            assert_eq!(removed["title"], "Gone", "backend {}", name);

            let again = store.delete(Table::Tasks, "t1").await;
            assert!(matches!(again, Err(DomainError::NotFound(_))), "backend {}", name);
        }
    }

    #[tokio::test]
    async fn test_upsert_never_duplicates_key() {
        for (name, store) in stores() {
            let first = store
                .upsert(Table::ProjectProgress, row(json!({"project_id": "p1", "percentage": 25, "calculated_at": 1})), "project_id")
                .await
                .unwrap();
            let second = store
                .upsert(Table::ProjectProgress, row(json!({"project_id": "p1", "percentage": 75, "calculated_at": 2})), "project_id")
                .await
                .unwrap();
            assert_eq!(first["id"], second["id"], "backend {} keeps the id", name);

            let rows = store
                .select(Table::ProjectProgress, &Filter::eq("project_id", "p1"), None)
                .await
                .unwrap();
            assert_eq!(rows.len(), 1, "backend {}", name);
            assert_eq!(rows[0]["percentage"], 75, "backend {}", name);
        }
    }

    #[tokio::test]
    async fn test_subscribe_delivers_matching_changes() {
        for (name, store) in stores() {
            let seen: Arc<Mutex<Vec<ChangeKind>>> = Arc::new(Mutex::new(Vec::new()));
            let sink = seen.clone();
            let sub = store.subscribe(
                Table::Tasks,
                Filter::eq("project_id", "p1"),
                Box::new(move |event| sink.lock().push(event.kind)),
            );
            assert_eq!(sub.channel(), "tasks_p1");

            store
                .insert(Table::Tasks, row(json!({"id": "t1", "project_id": "p1", "status_id": "s1", "title": "A"})))
                .await
                .unwrap();
            store
                .insert(Table::Tasks, row(json!({"id": "t2", "project_id": "p2", "status_id": "s1", "title": "B"})))
                .await
                .unwrap();
            store.update(Table::Tasks, "t1", row(json!({"status_id": "s2"}))).await.unwrap();
            store.delete(Table::Tasks, "t1").await.unwrap();

            drop(sub);
            store
                .insert(Table::Tasks, row(json!({"id": "t3", "project_id": "p1", "status_id": "s1", "title": "C"})))
                .await
                .unwrap();

            assert_eq!(
                *seen.lock(),
                vec![ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete],
                "backend {}",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_sqlite_rejects_missing_required_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store
            .insert(Table::Tasks, row(json!({"project_id": "p1", "title": "no status"})))
            .await;
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert(Table::Statuses, row(json!({"id": "s1", "project_id": "p1", "name": "New", "display_order": 0})))
                .await
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let rows = store.select(Table::Statuses, &Filter::All, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "New");
    }
}
