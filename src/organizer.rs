//! Copy orchestration for a classified directory.
//!
//! This module materializes a [`Grouping`] on disk: it creates the unique
//! output root of a run, one subdirectory per group key, and copies every
//! classified entry into its group directory. Copies run concurrently on the
//! blocking thread pool and the orchestrator waits for every dispatched copy
//! before returning.
//!
//! A failure is fatal to the whole run. Copies that already completed are
//! left in place; nothing is rolled back.
use crate::grouping::{CopyTask, Grouping};
use crate::oplog::LogSender;
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Timestamp prefix of output root names (`20261019153042_xxxxxxxx`).
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Length of the random suffix appended to output root names.
const OUTPUT_SUFFIX_LEN: usize = 8;

/// Errors that abort the copy phase.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The unique output root could not be created.
    #[error("Failed to create output directory in {}: {source}", .parent.display())]
    OutputRootFailed {
        parent: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A group directory could not be created.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single file copy failed.
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    FileCopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A group key cannot be used as a directory name inside the output root.
    #[error("Group key '{key}' cannot be used as a directory name")]
    UnsafeGroupKey { key: String },

    /// A copy task panicked or was cancelled.
    #[error("Copy task failed: {0}")]
    TaskFailed(String),
}

pub type CopyResult<T> = Result<T, CopyError>;

/// What a successful copy phase did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyReport {
    pub groups_created: usize,
    pub files_copied: usize,
    pub bytes_copied: u64,
}

/// Creates a fresh, uniquely named output root inside `parent`.
///
/// The name is the local timestamp followed by a random suffix. Creation is
/// exclusive, so a concurrent or earlier run can never be reused.
pub fn create_output_root(parent: &Path) -> CopyResult<PathBuf> {
    let prefix = format!("{}_", chrono::Local::now().format(OUTPUT_TIMESTAMP_FORMAT));
    let dir = tempfile::Builder::new()
        .prefix(&prefix)
        .rand_bytes(OUTPUT_SUFFIX_LEN)
        .tempdir_in(parent)
        .map_err(|e| CopyError::OutputRootFailed {
            parent: parent.to_path_buf(),
            source: e,
        })?;

    let path = dir.keep();
    info!(path = %path.display(), "created output root");
    Ok(path)
}

/// Placeholder output root shown by dry runs, where nothing is created.
pub fn preview_output_root(parent: &Path) -> PathBuf {
    parent.join(format!(
        "{}_{}",
        chrono::Local::now().format(OUTPUT_TIMESTAMP_FORMAT),
        "*".repeat(OUTPUT_SUFFIX_LEN)
    ))
}

/// Copies the entries of a grouping into per-group directories.
#[derive(Debug, Clone)]
pub struct CopyOrchestrator {
    source_root: PathBuf,
    output_root: PathBuf,
    verbose: bool,
    log: Option<LogSender>,
    progress: Option<ProgressBar>,
}

impl CopyOrchestrator {
    /// Creates an orchestrator copying from `source_root` into `output_root`.
    ///
    /// `output_root` must already exist; see [`create_output_root`].
    pub fn new(source_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            verbose: false,
            log: None,
            progress: None,
        }
    }

    /// Print a `<source> -> <destination>` line for every copy.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Also send verbose copy lines to the operation log.
    pub fn with_log(mut self, log: LogSender) -> Self {
        self.log = Some(log);
        self
    }

    /// Advance `progress` by one for every finished copy.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Directory that receives the entries of group `key`.
    ///
    /// `""` and `"."` both name the output root itself. `".."` and keys
    /// holding a path separator would leave it and are rejected.
    pub fn group_dir(&self, key: &str) -> CopyResult<PathBuf> {
        match key {
            "" | "." => Ok(self.output_root.clone()),
            ".." => Err(CopyError::UnsafeGroupKey {
                key: key.to_string(),
            }),
            _ if key.chars().any(std::path::is_separator) => Err(CopyError::UnsafeGroupKey {
                key: key.to_string(),
            }),
            _ => Ok(self.output_root.join(key)),
        }
    }

    /// Creates every group directory and copies every entry into it.
    ///
    /// All copies may run in parallel, in no particular order. The call
    /// returns once every dispatched copy has finished. The first error
    /// stops further dispatch and is returned after the in-flight copies
    /// have settled; files copied so far stay where they are.
    pub async fn materialize(&self, grouping: &Grouping) -> CopyResult<CopyReport> {
        // Reject unusable keys before anything is written.
        let planned = grouping
            .iter()
            .map(|(key, names)| Ok((self.group_dir(key)?, names)))
            .collect::<CopyResult<Vec<_>>>()?;

        let mut report = CopyReport::default();
        let mut first_error: Option<CopyError> = None;
        let mut tasks = JoinSet::new();

        for (group_dir, names) in planned {
            if let Err(e) = fs::create_dir_all(&group_dir) {
                first_error = Some(CopyError::DirectoryCreationFailed {
                    path: group_dir,
                    source: e,
                });
                break;
            }
            report.groups_created += 1;
            debug!(dir = %group_dir.display(), files = names.len(), "dispatching group");

            for name in names {
                let task = CopyTask::new(&self.source_root, &group_dir, name);
                let unit = CopyUnit {
                    task,
                    verbose: self.verbose,
                    log: self.log.clone(),
                };
                tasks.spawn_blocking(move || unit.run());
            }
        }

        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| Err(CopyError::TaskFailed(e.to_string())));
            if let Some(progress) = &self.progress {
                progress.inc(1);
            }
            match outcome {
                Ok(bytes) => {
                    report.files_copied += 1;
                    report.bytes_copied += bytes;
                }
                Err(e) => {
                    warn!(error = %e, "copy failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    groups = report.groups_created,
                    files = report.files_copied,
                    bytes = report.bytes_copied,
                    "copy phase complete"
                );
                Ok(report)
            }
        }
    }
}

/// One copy, executed exactly once on the blocking pool.
struct CopyUnit {
    task: CopyTask,
    verbose: bool,
    log: Option<LogSender>,
}

impl CopyUnit {
    fn run(self) -> CopyResult<u64> {
        if self.verbose {
            let line = self.task.describe();
            println!("{line}");
            if let Some(log) = &self.log {
                log.send(line);
            }
        }
        copy_file(&self.task.source, &self.task.destination)
    }
}

/// Streams the bytes of `from` into `to`, replacing any existing file.
fn copy_file(from: &Path, to: &Path) -> CopyResult<u64> {
    let copy_error = |source| CopyError::FileCopyFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let mut reader = File::open(from).map_err(copy_error)?;
    let mut writer = File::create(to).map_err(copy_error)?;
    let bytes = io::copy(&mut reader, &mut writer).map_err(copy_error)?;
    writer.sync_all().map_err(copy_error)?;
    Ok(bytes)
}
