//! Directory listing for the classifier.
//!
//! Only the direct entries of the source directory are considered. Each
//! entry's skip check (is it a directory, do the filters exclude it) runs on
//! the rayon pool, and survivors are collected through rayon's
//! order-preserving `collect`, so no worker ever writes into shared state.

use crate::config::CompiledFilters;
use rayon::prelude::*;
use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ListError {
    #[error("Error reading directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lists the names of the non-directory entries of `path`, sorted.
///
/// Entries rejected by `filters` and entries whose names are not valid
/// UTF-8 are skipped.
pub fn list_entries(path: &Path, filters: &CompiledFilters) -> Result<Vec<String>, ListError> {
    let read_error = |source| ListError::ReadDir {
        path: path.to_path_buf(),
        source,
    };

    let entries = fs::read_dir(path)
        .map_err(read_error)?
        .collect::<Result<Vec<DirEntry>, _>>()
        .map_err(read_error)?;

    let mut names: Vec<String> = entries
        .into_par_iter()
        .filter_map(|entry| keep_entry(entry, filters))
        .collect();
    names.sort();

    debug!(path = %path.display(), count = names.len(), "listed source entries");
    Ok(names)
}

/// Returns the entry's name when it should be classified.
fn keep_entry(entry: DirEntry, filters: &CompiledFilters) -> Option<String> {
    match entry.file_type() {
        Ok(file_type) if file_type.is_dir() => return None,
        Ok(_) => {}
        Err(e) => {
            warn!(path = %entry.path().display(), error = %e, "skipping unreadable entry");
            return None;
        }
    }

    let name = match entry.file_name().into_string() {
        Ok(name) => name,
        Err(raw) => {
            warn!(name = ?raw, "skipping entry with a non UTF-8 name");
            return None;
        }
    };

    filters.should_include(&name).then_some(name)
}
