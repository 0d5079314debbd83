//! Kanban Board headless entry point
//!
//! Opens a SQLite-backed store, mounts one project board and prints its
//! columns and completion.
//!
//! Usage: `kanban-board [db-path] [project-id]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use kanban_board::{Board, BoardConfig, BoardContext};
use kanban_store::SqliteStore;

#[tokio::main]
async fn main() {
    let config = match BoardConfig::load(Path::new("kanban.json")) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let _logger = match rolling_logger::init_logger_with_level("logs", "KanbanBoard", &config.log_level) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Logging disabled: {}", e);
            None
        }
    };

    let mut args = std::env::args().skip(1);
    let db_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("kanban.db"));
    let project_id = args.next().unwrap_or_else(|| "demo".to_string());

    let remote = match SqliteStore::open(&db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Failed to open {}: {}", db_path.display(), e);
            eprintln!("Failed to open {}: {}", db_path.display(), e);
            std::process::exit(1);
        }
    };

    let context = BoardContext::new();
    context
        .on_notification(|n| match &n.description {
            Some(description) => println!("[{:?}] {}: {}", n.level, n.title, description),
            None => println!("[{:?}] {}", n.level, n.title),
        })
        .forget();

    let board = Board::mount(remote, &project_id, &config, context).await;
    for column in board.columns() {
        println!("{:<20} {}", column.name, board.cards_in_column(&column.id).len());
    }
    println!("Progress: {}%", board.progress().unwrap_or(0));
    board.unmount();
}
