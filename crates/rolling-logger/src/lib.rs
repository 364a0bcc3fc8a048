//! Rolling Logger
//!
//! A `tracing` subscriber that writes formatted events to a size-rotated log
//! file and keeps the most recent lines in memory for in-app display.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Rotate once the active file passes this size
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
/// Number of rotated files kept next to the active one
pub const MAX_BACKUPS: usize = 3;
/// Lines kept in memory for `recent_lines`
pub const RECENT_CAPACITY: usize = 500;

static LOGGER: OnceLock<Arc<LogSink>> = OnceLock::new();

// ========================
// Rolling File
// ========================

/// Append-only log file with size-based rotation.
///
/// Rotation shifts `app.log.1` to `app.log.2` and so on, dropping the
/// oldest backup, then moves the active file to `app.log.1`.
#[derive(Debug)]
pub struct RollingFile {
    path: PathBuf,
    max_bytes: u64,
    max_backups: usize,
    file: File,
    written: u64,
}

impl RollingFile {
    pub fn open(dir: &Path, app_name: &str, max_bytes: u64, max_backups: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{app_name}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            max_backups,
            file,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + bytes.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_backups == 0 {
            self.file = File::create(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

// ========================
// Recent Lines (circular buffer)
// ========================

#[derive(Debug, Clone)]
pub struct RecentLines {
    lines: VecDeque<String>,
    capacity: usize,
}

impl RecentLines {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, text: &str) {
        if self.capacity == 0 {
            return;
        }
        for line in text.lines().filter(|line| !line.is_empty()) {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line.to_string());
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }
}

// ========================
// Sink + tracing glue
// ========================

#[derive(Debug)]
struct LogSink {
    file: Mutex<RollingFile>,
    recent: Mutex<RecentLines>,
}

impl LogSink {
    fn new(file: RollingFile, capacity: usize) -> Self {
        Self {
            file: Mutex::new(file),
            recent: Mutex::new(RecentLines::new(capacity)),
        }
    }

    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        self.recent.lock().push(&String::from_utf8_lossy(bytes));
        self.file.lock().write_record(bytes)
    }
}

struct SinkWriter(Arc<LogSink>);

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct SinkMaker(Arc<LogSink>);

impl<'a> MakeWriter<'a> for SinkMaker {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter(Arc::clone(&self.0))
    }
}

/// Local wall-clock timestamps with millisecond precision
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ========================
// Public API
// ========================

/// Install the global subscriber writing to `<log_dir>/<app_name>.log` and stderr.
///
/// Fails if called twice or if another global subscriber is already set.
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> io::Result<()> {
    let file = RollingFile::open(log_dir.as_ref(), app_name, MAX_FILE_BYTES, MAX_BACKUPS)?;
    let sink = Arc::new(LogSink::new(file, RECENT_CAPACITY));
    LOGGER
        .set(Arc::clone(&sink))
        .map_err(|_| io::Error::new(io::ErrorKind::AlreadyExists, "logger already initialized"))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(LocalTime)
        .with_writer(SinkMaker(sink));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_timer(LocalTime)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))
}

pub fn info(message: &str) {
    tracing::info!(target: "app", "{message}");
}

pub fn warn(message: &str) {
    tracing::warn!(target: "app", "{message}");
}

pub fn error(message: &str) {
    tracing::error!(target: "app", "{message}");
}

/// Most recent log lines, oldest first. Empty before `init_logger`.
pub fn recent_lines() -> Vec<String> {
    LOGGER
        .get()
        .map(|sink| sink.recent.lock().to_vec())
        .unwrap_or_default()
}

/// Path of the active log file once initialized
pub fn log_file_path() -> Option<PathBuf> {
    LOGGER
        .get()
        .map(|sink| sink.file.lock().path().to_path_buf())
}
