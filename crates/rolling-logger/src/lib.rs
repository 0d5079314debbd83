//! Rolling Logger
//!
//! Installs a `tracing` subscriber that writes formatted lines to a daily
//! log file (`<dir>/<app>.<YYYY-MM-DD>.log`) and keeps the most recent lines
//! in a circular buffer for in-app display. Records emitted through the
//! `log` facade are bridged into the same subscriber.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

/// Lines kept in memory
pub const DEFAULT_BUFFER_LINES: usize = 1000;
/// Daily files kept on disk
pub const DEFAULT_MAX_FILES: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("log directory unavailable: {0}")]
    Io(#[from] io::Error),
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),
    #[error("logger already initialised: {0}")]
    AlreadyInitialised(String),
}

struct LogState {
    dir: PathBuf,
    app_name: String,
    max_files: usize,
    day: NaiveDate,
    file: File,
    recent: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl LogState {
    fn file_path(dir: &Path, app_name: &str, day: NaiveDate) -> PathBuf {
        dir.join(format!("{}.{}.log", app_name, day.format("%Y-%m-%d")))
    }

    fn open(dir: &Path, app_name: &str, day: NaiveDate) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(Self::file_path(dir, app_name, day))
    }

    fn roll_if_needed(&mut self, today: NaiveDate) -> io::Result<()> {
        if today == self.day {
            return Ok(());
        }
        self.file.flush()?;
        self.file = Self::open(&self.dir, &self.app_name, today)?;
        self.day = today;
        prune_old_files(&self.dir, &self.app_name, self.max_files)
    }

    fn remember(&mut self, bytes: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(bytes));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            if self.recent.len() == self.capacity {
                self.recent.pop_front();
            }
            self.recent.push_back(line.trim_end().to_string());
        }
    }
}

/// Remove the oldest `<app>.*.log` files beyond `max_files`
fn prune_old_files(dir: &Path, app_name: &str, max_files: usize) -> io::Result<()> {
    let prefix = format!("{}.", app_name);
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".log"))
                .unwrap_or(false)
        })
        .collect();
    if logs.len() <= max_files {
        return Ok(());
    }
    // Date-stamped names sort chronologically
    logs.sort();
    let excess = logs.len() - max_files;
    for path in logs.into_iter().take(excess) {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Writer shared between the subscriber and the handle
#[derive(Clone)]
pub struct RollingWriter {
    state: Arc<Mutex<LogState>>,
}

impl RollingWriter {
    pub fn new(log_dir: impl AsRef<Path>, app_name: &str) -> Result<Self, LoggerError> {
        Self::with_limits(log_dir, app_name, DEFAULT_MAX_FILES, DEFAULT_BUFFER_LINES)
    }

    pub fn with_limits(
        log_dir: impl AsRef<Path>,
        app_name: &str,
        max_files: usize,
        buffer_lines: usize,
    ) -> Result<Self, LoggerError> {
        let dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let day = Local::now().date_naive();
        let file = LogState::open(&dir, app_name, day)?;
        prune_old_files(&dir, app_name, max_files.max(1))?;
        Ok(Self {
            state: Arc::new(Mutex::new(LogState {
                dir,
                app_name: app_name.to_string(),
                max_files: max_files.max(1),
                day,
                file,
                recent: VecDeque::with_capacity(buffer_lines.max(1)),
                capacity: buffer_lines.max(1),
                partial: String::new(),
            })),
        })
    }

    /// Most recent complete lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        self.state.lock().recent.iter().cloned().collect()
    }

    /// Path of the file currently written to
    pub fn current_file(&self) -> PathBuf {
        let state = self.state.lock();
        LogState::file_path(&state.dir, &state.app_name, state.day)
    }

    fn write_on(&self, day: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.roll_if_needed(day)?;
        state.file.write_all(buf)?;
        state.remember(buf);
        Ok(buf.len())
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_on(Local::now().date_naive(), buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.state.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Handle returned by [`init_logger`]
#[derive(Clone)]
pub struct LoggerHandle {
    writer: RollingWriter,
}

impl LoggerHandle {
    pub fn recent_lines(&self) -> Vec<String> {
        self.writer.recent_lines()
    }

    pub fn current_file(&self) -> PathBuf {
        self.writer.current_file()
    }
}

/// Initialise global logging at `info`
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<LoggerHandle, LoggerError> {
    init_logger_with_level(log_dir, app_name, "info")
}

/// Initialise global logging at the given level (`trace` .. `error`)
pub fn init_logger_with_level(
    log_dir: impl AsRef<Path>,
    app_name: &str,
    level: &str,
) -> Result<LoggerHandle, LoggerError> {
    let level = tracing::Level::from_str(level).map_err(|_| LoggerError::InvalidLevel(level.to_string()))?;
    let writer = RollingWriter::new(log_dir, app_name)?;

    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_max_level(level)
        .try_init()
        .map_err(|e| LoggerError::AlreadyInitialised(e.to_string()))?;

    log::info!("{} logging to {}", app_name, writer.current_file().display());
    Ok(LoggerHandle { writer })
}
