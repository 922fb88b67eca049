//! Append-only operation log for one process run.
//!
//! [`OperationLog::start`] spawns a single worker on the blocking pool. The
//! worker opens the log file in append mode, writes one header line (the
//! invocation timestamp and command line) and then writes every line sent
//! through the log, in the order it was enqueued, until the log is closed.
//! Because the worker is the file's only writer no locking is needed.
//!
//! ```no_run
//! # async fn demo() -> Result<(), batchsort::oplog::LogError> {
//! use batchsort::oplog::{OperationLog, invocation_header};
//! use std::path::PathBuf;
//!
//! let log = OperationLog::start(
//!     PathBuf::from("/tmp/batchsort.log"),
//!     invocation_header(std::env::args()),
//! );
//! log.send("copied 3 files");
//! log.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Directory under the home directory that holds the logs.
pub const LOG_HOME_DIR: &str = ".batchsort";

const HEADER_TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";
const FILE_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Could not determine the home directory for the log")]
    HomeNotFound,

    #[error("Failed to open log file {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write log file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Log worker stopped unexpectedly: {0}")]
    WorkerFailed(String),
}

/// Per-user log directory, `~/.batchsort/log`.
pub fn default_log_dir() -> Result<PathBuf, LogError> {
    dirs::home_dir()
        .map(|home| home.join(LOG_HOME_DIR).join("log"))
        .ok_or(LogError::HomeNotFound)
}

/// Today's log file inside `log_dir` (one file per day).
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("{}.log", Local::now().format(FILE_DATE_FORMAT)))
}

/// Header line recorded at the start of every run.
pub fn invocation_header<I, S>(args: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let command_line = args
        .into_iter()
        .map(|arg| arg.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", Local::now().format(HEADER_TIMESTAMP_FORMAT), command_line)
}

/// Reads every line of a log file.
pub fn read_log(path: &Path) -> Result<Vec<String>, LogError> {
    let content = fs::read_to_string(path).map_err(|e| LogError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

#[derive(Debug)]
enum LogMessage {
    Line(String),
    Close,
}

/// Cloneable handle for enqueueing lines from any thread.
///
/// Sending never blocks. Lines sent after the log was closed, or after the
/// worker failed, are dropped.
#[derive(Debug, Clone)]
pub struct LogSender {
    tx: UnboundedSender<LogMessage>,
}

impl LogSender {
    pub fn send(&self, line: impl Into<String>) {
        if self.tx.send(LogMessage::Line(line.into())).is_err() {
            debug!("operation log is closed, dropping line");
        }
    }
}

/// Handle to the running log worker.
#[derive(Debug)]
pub struct OperationLog {
    path: PathBuf,
    sender: LogSender,
    worker: JoinHandle<Result<(), LogError>>,
}

impl OperationLog {
    /// Starts the worker writing to `path`, header first.
    ///
    /// Must be called from within a tokio runtime. Failing to open or write
    /// the file stops the worker only; the error is reported by
    /// [`OperationLog::wait`].
    pub fn start(path: PathBuf, header: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_path = path.clone();
        let worker = tokio::task::spawn_blocking(move || write_log(&worker_path, &header, rx));

        Self {
            path,
            sender: LogSender { tx },
            worker,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle other tasks can send through.
    pub fn sender(&self) -> LogSender {
        self.sender.clone()
    }

    /// Enqueues one line.
    pub fn send(&self, line: impl Into<String>) {
        self.sender.send(line);
    }

    /// Marks the end of the stream.
    ///
    /// Lines enqueued before this call are written; anything sent afterwards,
    /// through any handle, is dropped.
    pub fn close(&self) {
        if self.sender.tx.send(LogMessage::Close).is_err() {
            debug!("operation log already stopped");
        }
    }

    /// Waits for the worker to drain, flush and close the file.
    ///
    /// Call [`OperationLog::close`] first, or this waits until every
    /// [`LogSender`] has been dropped.
    pub async fn wait(self) -> Result<(), LogError> {
        let Self { sender, worker, .. } = self;
        drop(sender);
        worker
            .await
            .map_err(|e| LogError::WorkerFailed(e.to_string()))?
    }

    /// Closes the log and waits for it to drain.
    pub async fn shutdown(self) -> Result<(), LogError> {
        self.close();
        self.wait().await
    }
}

/// Worker body: the only code that touches the log file.
fn write_log(
    path: &Path,
    header: &str,
    mut rx: UnboundedReceiver<LogMessage>,
) -> Result<(), LogError> {
    let open_error = |source| LogError::Open {
        path: path.to_path_buf(),
        source,
    };
    let write_error = |source| LogError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(open_error)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(open_error)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{header}").map_err(write_error)?;

    while let Some(message) = rx.blocking_recv() {
        match message {
            LogMessage::Line(line) => writeln!(writer, "{line}").map_err(write_error)?,
            LogMessage::Close => break,
        }
    }
    rx.close();

    let file = writer
        .into_inner()
        .map_err(|e| write_error(e.into_error()))?;
    if let Err(e) = file.sync_all() {
        warn!(path = %path.display(), error = %e, "could not sync operation log");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_header_then_lines_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log").join("run.log");

        let log = OperationLog::start(path.clone(), "HEADER".to_string());
        for i in 0..100 {
            log.send(format!("line {i}"));
        }
        log.shutdown().await.expect("log failed");

        let lines = read_log(&path).unwrap();
        assert_eq!(lines.len(), 101);
        assert_eq!(lines[0], "HEADER");
        assert_eq!(lines[1], "line 0");
        assert_eq!(lines[100], "line 99");
    }

    #[tokio::test]
    async fn test_appends_across_runs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");

        for run in 0..2 {
            let log = OperationLog::start(path.clone(), format!("run {run}"));
            log.send("body");
            log.shutdown().await.unwrap();
        }

        let lines = read_log(&path).unwrap();
        assert_eq!(lines, vec!["run 0", "body", "run 1", "body"]);
    }

    #[tokio::test]
    async fn test_lines_after_close_are_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");

        let log = OperationLog::start(path.clone(), "HEADER".to_string());
        let sender = log.sender();
        sender.send("before");
        log.close();
        sender.send("after");
        log.wait().await.unwrap();

        let lines = read_log(&path).unwrap();
        assert_eq!(lines, vec!["HEADER", "before"]);
    }

    #[tokio::test]
    async fn test_unwritable_location_reports_error_without_blocking_senders() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        fs::write(&blocker, "file").unwrap();

        let log = OperationLog::start(blocker.join("run.log"), "HEADER".to_string());
        log.send("ignored");
        let result = log.shutdown().await;

        assert!(matches!(result, Err(LogError::Open { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_senders_deliver_every_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("run.log");
        let log = OperationLog::start(path.clone(), "HEADER".to_string());

        let mut handles = Vec::new();
        for worker in 0..4 {
            let sender = log.sender();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    sender.send(format!("{worker}-{i}"));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        log.shutdown().await.unwrap();

        let lines = read_log(&path).unwrap();
        assert_eq!(lines.len(), 101);
        // per-sender order is preserved
        let first_worker: Vec<_> = lines.iter().filter(|l| l.starts_with("0-")).collect();
        let expected: Vec<String> = (0..25).map(|i| format!("0-{i}")).collect();
        assert_eq!(first_worker, expected.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_invocation_header_format() {
        let header = invocation_header(["batchsort", "-r", r"\d{5}"]);
        let (date, rest) = header.split_once(' ').unwrap();
        assert_eq!(date.len(), 10);
        assert!(rest.ends_with(r"batchsort -r \d{5}"));
    }

    #[test]
    fn test_log_file_path_is_daily() {
        let path = log_file_path(Path::new("/logs"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name.len(), "20261019.log".len());
        assert!(name.ends_with(".log"));
    }
}
