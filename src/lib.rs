//! batchsort - classify the files of a directory and copy each group into its own folder
//!
//! This library provides the pieces of a one-shot classification run: listing
//! a source directory, grouping its entries by a regex match or a fixed-length
//! name window, copying every group concurrently into a fresh output
//! directory, and recording the run in an append-only operation log.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod grouping;
pub mod listing;
pub mod oplog;
pub mod organizer;
pub mod output;
pub mod tree;

pub use classifier::{Anchor, ClassificationConfig, classify};
pub use config::{CompiledFilters, ConfigError, FilterConfig, RunConfig};
pub use grouping::{CopyTask, Grouping, RunManifest};
pub use oplog::{LogSender, OperationLog};
pub use organizer::{CopyError, CopyOrchestrator, CopyReport};

pub use cli::{Cli, RunOutcome, run_cli};
