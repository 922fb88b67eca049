//! Pattern classification of directory entry names.
//!
//! Two interchangeable strategies turn a list of names into a [`Grouping`]:
//!
//! - **Regex**: the key is the first substring of the name matched by the
//!   pattern. Names the pattern does not match are dropped.
//! - **Length**: the key is a fixed-size window of characters taken from the
//!   start ([`Anchor::Head`]) or the end ([`Anchor::Tail`]) of the name,
//!   optionally ignoring the extension. Every name lands in a group.
//!
//! Classification is pure: the same names in the same order always produce
//! the same grouping.
//!
//! # Examples
//!
//! ```
//! use batchsort::classifier::{Anchor, ClassificationConfig, classify};
//!
//! let names = ["csv_data1.csv", "csv_data2.csv", "s.txt"];
//! let config = ClassificationConfig::length(5, Some(Anchor::Head), false);
//! let grouping = classify(&names, &config);
//!
//! assert_eq!(grouping.get("csv_d").map(|g| g.len()), Some(2));
//! assert_eq!(grouping.get("s.txt").map(|g| g.len()), Some(1));
//! ```

use crate::grouping::Grouping;
use regex::Regex;

/// Which end of a name a length-based key is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Count characters from the beginning of the name.
    Head,
    /// Count characters from the end of the name.
    Tail,
}

/// How entry names are turned into group keys.
#[derive(Debug, Clone)]
pub enum ClassificationConfig {
    /// Group by the first substring matched by the pattern.
    Regex(Regex),
    /// Group by a fixed number of characters at one end of the name.
    Length {
        length: usize,
        /// `None` puts every name under the empty key.
        anchor: Option<Anchor>,
        /// Only meaningful for [`Anchor::Tail`].
        include_extension: bool,
    },
}

impl ClassificationConfig {
    pub fn regex(pattern: Regex) -> Self {
        Self::Regex(pattern)
    }

    pub fn length(length: usize, anchor: Option<Anchor>, include_extension: bool) -> Self {
        Self::Length {
            length,
            anchor,
            include_extension,
        }
    }
}

/// Classifies `names` into groups according to `config`.
pub fn classify<S: AsRef<str>>(names: &[S], config: &ClassificationConfig) -> Grouping {
    match config {
        ClassificationConfig::Regex(pattern) => classify_by_regex(names, pattern),
        ClassificationConfig::Length {
            length,
            anchor,
            include_extension,
        } => classify_by_length(names, *length, *anchor, *include_extension),
    }
}

/// Groups names by the substring `pattern` first matches in each of them.
///
/// A zero-width match still counts as a match and produces the empty key;
/// only names with no match at all are left out.
pub fn classify_by_regex<S: AsRef<str>>(names: &[S], pattern: &Regex) -> Grouping {
    let mut grouping = Grouping::new();
    for name in names {
        let name = name.as_ref();
        if let Some(found) = pattern.find(name) {
            grouping.push(found.as_str(), name);
        }
    }
    grouping
}

/// Groups names by a `length`-character window at the chosen end of the name.
pub fn classify_by_length<S: AsRef<str>>(
    names: &[S],
    length: usize,
    anchor: Option<Anchor>,
    include_extension: bool,
) -> Grouping {
    let mut grouping = Grouping::new();
    for name in names {
        let name = name.as_ref();
        grouping.push(length_key(name, length, anchor, include_extension), name);
    }
    grouping
}

/// Computes the length-strategy key for a single name.
pub fn length_key(
    name: &str,
    length: usize,
    anchor: Option<Anchor>,
    include_extension: bool,
) -> String {
    match anchor {
        Some(Anchor::Head) => head(name, length).to_string(),
        Some(Anchor::Tail) if include_extension => tail(name, length).to_string(),
        Some(Anchor::Tail) => {
            let (stem, _extension) = split_extension(name);
            tail(stem, length).to_string()
        }
        None => String::new(),
    }
}

/// First `count` characters of `s`, or all of `s` when it is shorter.
fn head(s: &str, count: usize) -> &str {
    match s.char_indices().nth(count) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Last `count` characters of `s`, or all of `s` when it is shorter.
fn tail(s: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    match s.char_indices().rev().nth(count - 1) {
        Some((start, _)) => &s[start..],
        None => s,
    }
}

/// Splits a name into stem and extension at the last `.`.
///
/// The extension keeps its dot. Names without a dot have an empty extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    }
}
