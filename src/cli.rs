//! Command-line interface module for batchsort.
//!
//! This module owns the argument model and the run pipeline:
//! - Parsing and validating flags into a [`RunConfig`]
//! - Starting and draining the operation log
//! - Listing, classifying and copying the source directory
//! - Reporting the result (summary table, tree, log contents)

use crate::classifier::{Anchor, classify};
use crate::config::{
    ClassificationRequest, CompiledFilters, ConfigError, FilterConfig, RunConfig,
    validate_source_root,
};
use crate::grouping::{Grouping, RunManifest};
use crate::listing::{ListError, list_entries};
use crate::oplog::{
    LogError, OperationLog, default_log_dir, invocation_header, log_file_path, read_log,
};
use crate::organizer::{
    CopyError, CopyOrchestrator, CopyReport, create_output_root, preview_output_root,
};
use crate::output::OutputFormatter;
use crate::tree::render_tree;
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Classify the files of a directory and copy each group into its own folder.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "batchsort",
    version,
    about = "Classify the files of a directory by name and copy each group into its own folder",
    long_about = "batchsort groups the files of a directory either by the text a regular \
                  expression matches in their names or by a fixed number of characters at \
                  the start or end of their names, then copies every group into a \
                  subdirectory of a freshly created, timestamped output directory."
)]
pub struct Cli {
    /// Directory containing the files to classify
    #[arg(short, long, default_value = ".")]
    pub target: PathBuf,

    /// Number of characters used as the classification key
    #[arg(short, long, default_value_t = 0)]
    pub length: usize,

    /// Regular expression whose first match in a name is the classification key
    #[arg(short, long, conflicts_with = "length")]
    pub regexp: Option<String>,

    /// Which end of the name the characters are counted from
    #[arg(long, value_enum, default_value_t = AnchorArg::Head)]
    pub anchor: AnchorArg,

    /// Count characters from the end of the name (same as --anchor tail)
    #[arg(long, conflicts_with = "anchor")]
    pub tail: bool,

    /// Keep the extension in the characters counted from the end
    #[arg(long)]
    pub include_ext: bool,

    /// Print the source and destination of every copy
    #[arg(short, long = "print")]
    pub print: bool,

    /// Print the copied files as a tree
    #[arg(short, long)]
    pub show_tree: bool,

    /// Print the contents of today's log
    #[arg(long)]
    pub print_log: bool,

    /// Directory in which the output directory is created
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Show the classification without creating or copying anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Filter configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the operation logs
    #[arg(long, env = "BATCHSORT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// `--anchor` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnchorArg {
    Head,
    Tail,
    /// Put every file in a single group
    None,
}

impl From<AnchorArg> for Option<Anchor> {
    fn from(arg: AnchorArg) -> Self {
        match arg {
            AnchorArg::Head => Some(Anchor::Head),
            AnchorArg::Tail => Some(Anchor::Tail),
            AnchorArg::None => None,
        }
    }
}

impl Cli {
    /// Validates the flags into a [`RunConfig`].
    pub fn run_config(&self) -> Result<RunConfig, ConfigError> {
        let anchor = if self.tail {
            Some(Anchor::Tail)
        } else {
            self.anchor.into()
        };
        let request = ClassificationRequest {
            regexp: self.regexp.clone(),
            length: self.length,
            anchor,
            include_extension: self.include_ext,
        };

        Ok(RunConfig {
            source_root: validate_source_root(&self.target)?,
            output_parent: self.output.clone(),
            classification: request.resolve()?,
            verbose: self.print,
            show_tree: self.show_tree,
            dry_run: self.dry_run,
            print_log: self.print_log,
            log_dir: self.log_dir.clone(),
        })
    }
}

/// Any error that ends a run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listing(#[from] ListError),

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error(transparent)]
    Log(#[from] LogError),
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No regex and no positive length: nothing was classified or copied.
    NoOp,
    /// Classified only; `manifest.output_root` is a placeholder.
    DryRun { manifest: RunManifest },
    /// Every entry was copied into `manifest.output_root`.
    Completed {
        manifest: RunManifest,
        report: CopyReport,
    },
}

/// Runs one invocation end to end.
///
/// Configuration is validated before anything is written. The operation log
/// is always drained before this returns, whether the run succeeded or not.
///
/// # Examples
///
/// ```no_run
/// use batchsort::cli::{Cli, run_cli};
/// use clap::Parser;
///
/// # async fn demo() -> Result<(), batchsort::cli::CliError> {
/// let cli = Cli::parse_from(["batchsort", "--target", "photos", "--regexp", r"\d{4}"]);
/// let outcome = run_cli(cli).await?;
/// println!("{outcome:?}");
/// # Ok(())
/// # }
/// ```
pub async fn run_cli(cli: Cli) -> Result<RunOutcome, CliError> {
    let filters = FilterConfig::load(cli.config.as_deref())?.compile()?;
    let config = cli.run_config()?;

    let log = start_log(&config);
    let log_path = log.as_ref().map(|log| log.path().to_path_buf());

    let result = execute(&config, &filters, log.as_ref()).await;

    if let Some(log) = log
        && let Err(e) = log.shutdown().await
    {
        warn!(error = %e, "operation log was not written");
        OutputFormatter::warning(&format!("Could not write the log: {}", e));
    }

    let outcome = result?;

    if config.print_log {
        match log_path {
            Some(path) => print_log(&path)?,
            None => OutputFormatter::warning("No log is available"),
        }
    }

    Ok(outcome)
}

/// Starts the operation log, or returns `None` when no log location exists.
fn start_log(config: &RunConfig) -> Option<OperationLog> {
    let log_dir = match &config.log_dir {
        Some(dir) => dir.clone(),
        None => match default_log_dir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "running without an operation log");
                return None;
            }
        },
    };

    let path = log_file_path(&log_dir);
    debug!(path = %path.display(), "starting operation log");
    let args = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    Some(OperationLog::start(path, invocation_header(args)))
}

async fn execute(
    config: &RunConfig,
    filters: &CompiledFilters,
    log: Option<&OperationLog>,
) -> Result<RunOutcome, CliError> {
    let Some(classification) = &config.classification else {
        debug!("no classification criteria given");
        return Ok(RunOutcome::NoOp);
    };

    let names = list_entries(&config.source_root, filters)?;
    let grouping = classify(&names, classification);
    debug!(
        entries = names.len(),
        groups = grouping.len(),
        classified = grouping.entry_count(),
        "classification complete"
    );

    if config.dry_run {
        return Ok(dry_run(config, grouping));
    }

    OutputFormatter::info(&format!(
        "Copying {} of {} files from {} into {} groups",
        grouping.entry_count(),
        names.len(),
        config.source_root.display(),
        grouping.len()
    ));

    let output_root = create_output_root(&config.output_parent)?;

    let progress = if config.verbose {
        ProgressBar::hidden()
    } else {
        OutputFormatter::create_progress_bar(grouping.entry_count() as u64)
    };
    let mut orchestrator = CopyOrchestrator::new(&config.source_root, &output_root)
        .verbose(config.verbose)
        .with_progress(progress.clone());
    if let Some(log) = log {
        orchestrator = orchestrator.with_log(log.sender());
    }

    let copied = orchestrator.materialize(&grouping).await;
    progress.finish_and_clear();
    let report = match copied {
        Ok(report) => report,
        Err(e) => {
            OutputFormatter::warning(&format!(
                "{} may be partially populated; copies already made were kept",
                output_root.display()
            ));
            return Err(e.into());
        }
    };

    let manifest = RunManifest::new(output_root, grouping);
    let tree = render_tree(&manifest);
    if let Some(log) = log {
        log.send(tree.as_str());
    }
    if config.show_tree {
        OutputFormatter::plain(&tree);
    }

    OutputFormatter::summary_table(&manifest.grouping);
    OutputFormatter::success(&format!(
        "Copied {} files into {}",
        report.files_copied,
        manifest.output_root.display()
    ));

    Ok(RunOutcome::Completed { manifest, report })
}

fn dry_run(config: &RunConfig, grouping: Grouping) -> RunOutcome {
    let manifest = RunManifest::new(preview_output_root(&config.output_parent), grouping);

    OutputFormatter::dry_run_notice("Files would be copied as follows:");
    OutputFormatter::plain(&render_tree(&manifest));
    OutputFormatter::summary_table(&manifest.grouping);
    OutputFormatter::dry_run_notice("No directories were created and no files were copied.");

    RunOutcome::DryRun { manifest }
}

fn print_log(path: &Path) -> Result<(), LogError> {
    for line in read_log(path)? {
        OutputFormatter::plain(&line);
    }
    OutputFormatter::plain(&path.display().to_string());
    Ok(())
}
