//! Shared data model for a classification run.
//!
//! A [`Grouping`] is built once by the classifier and only read afterwards:
//! the organizer plans copy tasks from it, the tree renderer and the operation
//! log receive it wrapped in a [`RunManifest`] once every copy has finished.

use indexmap::IndexMap;
use indexmap::map::Iter;
use std::path::{Path, PathBuf};

/// Mapping from a computed pattern key to the entry names that produced it.
///
/// Keys keep first-seen order and names keep classification order within
/// their bucket. The empty string is a valid key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    groups: IndexMap<String, Vec<String>>,
}

impl Grouping {
    /// Creates an empty grouping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` to the bucket for `key`, creating the bucket on first use.
    pub fn push(&mut self, key: impl Into<String>, name: impl Into<String>) {
        self.groups.entry(key.into()).or_default().push(name.into());
    }

    /// Returns the names grouped under `key`.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Iterates over `(key, names)` pairs in first-seen key order.
    pub fn iter(&self) -> Iter<'_, String, Vec<String>> {
        self.groups.iter()
    }

    /// Iterates over the group keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of entry names across all groups.
    pub fn entry_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

impl<'a> IntoIterator for &'a Grouping {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Grouping
where
    K: Into<String>,
    V: IntoIterator,
    V::Item: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut grouping = Grouping::new();
        for (key, names) in iter {
            let key = key.into();
            let bucket = grouping.groups.entry(key).or_default();
            bucket.extend(names.into_iter().map(Into::into));
        }
        grouping
    }
}

/// A single file copy derived from one entry name and its group directory.
///
/// Built at fan-out time and consumed by exactly one copy attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// File to read from inside the source root.
    pub source: PathBuf,
    /// File to create or overwrite inside the group directory.
    pub destination: PathBuf,
}

impl CopyTask {
    pub fn new(source_root: &Path, group_dir: &Path, name: &str) -> Self {
        Self {
            source: source_root.join(name),
            destination: group_dir.join(name),
        }
    }

    /// The `<source> -> <destination>` line reported for verbose runs.
    pub fn describe(&self) -> String {
        format!("{} -> {}", self.source.display(), self.destination.display())
    }
}

/// Final snapshot of a run: where the output went and how it was grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunManifest {
    pub output_root: PathBuf,
    pub grouping: Grouping,
}

impl RunManifest {
    pub fn new(output_root: PathBuf, grouping: Grouping) -> Self {
        Self {
            output_root,
            grouping,
        }
    }
}
