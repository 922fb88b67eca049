//! Run configuration and entry filtering rules.
//!
//! Two kinds of configuration live here:
//!
//! - [`RunConfig`], the single validated description of one invocation. It is
//!   built once from the command line before any listing, classification or
//!   copying starts, so every configuration error surfaces with nothing
//!   touched on disk.
//! - [`FilterConfig`], optional TOML rules deciding which directory entries
//!   are offered to the classifier at all.
//!
//! # Filter File Format
//!
//! ```toml
//! [listing]
//! include_hidden = true
//!
//! [listing.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.tmp"]
//! extensions = ["bak", "part"]
//! regex = []
//!
//! [listing.include]
//! patterns = []
//! ```

use crate::classifier::{Anchor, ClassificationConfig};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Name of the per-directory filter file.
pub const LOCAL_CONFIG_FILE: &str = ".batchsortrc.toml";

/// Errors detected while building the configuration of a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filter file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Invalid glob pattern in the filter rules.
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    /// A regex (classification or filter) failed to compile.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    /// IO error while reading the filter file.
    #[error("IO error reading configuration: {0}")]
    IoError(String),

    /// The source directory is missing or is not a directory.
    #[error("Source {} is not a readable directory", .path.display())]
    InvalidSourceRoot { path: PathBuf },
}

/// Validated settings for a single invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory whose entries are classified and copied.
    pub source_root: PathBuf,
    /// Directory in which the unique output root is created.
    pub output_parent: PathBuf,
    /// `None` when neither a regex nor a positive length was given.
    pub classification: Option<ClassificationConfig>,
    /// Report every copy as `<source> -> <destination>`.
    pub verbose: bool,
    pub show_tree: bool,
    pub dry_run: bool,
    pub print_log: bool,
    /// Overrides the per-user log directory.
    pub log_dir: Option<PathBuf>,
}

impl RunConfig {
    /// Returns true when the run has nothing to classify or copy.
    pub fn is_noop(&self) -> bool {
        self.classification.is_none()
    }
}

/// Raw classification criteria as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRequest {
    pub regexp: Option<String>,
    pub length: usize,
    pub anchor: Option<Anchor>,
    pub include_extension: bool,
}

impl ClassificationRequest {
    /// Turns the criteria into a classifier configuration.
    ///
    /// A regex takes precedence over a length. Returns `Ok(None)` when neither
    /// a regex nor a positive length was requested.
    pub fn resolve(&self) -> Result<Option<ClassificationConfig>, ConfigError> {
        if let Some(pattern) = &self.regexp {
            let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            return Ok(Some(ClassificationConfig::regex(regex)));
        }

        if self.length == 0 {
            return Ok(None);
        }

        Ok(Some(ClassificationConfig::length(
            self.length,
            self.anchor,
            self.include_extension,
        )))
    }
}

/// Checks that `path` names an existing directory.
pub fn validate_source_root(path: &Path) -> Result<PathBuf, ConfigError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(path.to_path_buf()),
        _ => Err(ConfigError::InvalidSourceRoot {
            path: path.to_path_buf(),
        }),
    }
}

/// Rules deciding which directory entries take part in a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub listing: FilterRules,
}

/// Root-level filter rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether entries starting with "." are classified. Defaults to true.
    #[serde(default = "default_include_hidden")]
    pub include_hidden: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist, overrides every exclude rule.
    #[serde(default)]
    pub include: IncludeRules,
}

fn default_include_hidden() -> bool {
    true
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            include_hidden: default_include_hidden(),
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for leaving entries out of the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact entry names (e.g., ".DS_Store", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the entry name (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions without the dot, compared case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub regex: Vec<String>,
}

/// Glob patterns that keep an entry even when an exclude rule matches it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl FilterConfig {
    /// Load filter rules, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, when given
    /// 2. `.batchsortrc.toml` in the current directory
    /// 3. `batchsort/config.toml` in the user's config directory
    /// 4. built-in defaults (everything included)
    ///
    /// # Errors
    ///
    /// Returns an error if a file is explicitly provided but cannot be read,
    /// or if any file found is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("batchsort").join("config.toml");
            if user_config.exists() {
                return Self::load_from_file(&user_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        debug!(path = %path.display(), "loading filter configuration");
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile the rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob pattern is invalid.
    pub fn compile(self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self.listing)
    }
}

/// Pre-compiled filter rules, cheap to share across listing workers.
#[derive(Debug)]
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self {
            include_hidden: true,
            exclude_filenames: HashSet::new(),
            exclude_extensions: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
        }
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

impl CompiledFilters {
    fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Check if an entry name takes part in the run.
    ///
    /// Checks, in order: include patterns (always keep), hidden entries,
    /// exact names, extensions, glob patterns, regexes. Anything left over
    /// is kept.
    pub fn should_include(&self, name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(name)) {
            return true;
        }

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name) {
            return false;
        }

        if let Some(ext) = Path::new(name).extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rules(exclude: ExcludeRules) -> FilterConfig {
        FilterConfig {
            listing: FilterRules {
                include_hidden: true,
                exclude,
                include: IncludeRules::default(),
            },
        }
    }

    #[test]
    fn test_default_config_keeps_everything() {
        let compiled = FilterConfig::default().compile().unwrap();

        assert!(compiled.should_include(".gitignore"));
        assert!(compiled.should_include("photo.jpg"));
    }

    #[test]
    fn test_hidden_entries_excluded_when_disabled() {
        let config = FilterConfig {
            listing: FilterRules {
                include_hidden: false,
                ..Default::default()
            },
        };
        let compiled = config.compile().unwrap();

        assert!(!compiled.should_include(".DS_Store"));
        assert!(compiled.should_include("notes.md"));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let compiled = rules(ExcludeRules {
            filenames: vec!["Thumbs.db".to_string()],
            ..Default::default()
        })
        .compile()
        .unwrap();

        assert!(!compiled.should_include("Thumbs.db"));
        assert!(compiled.should_include("image.jpg"));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let compiled = rules(ExcludeRules {
            extensions: vec!["bak".to_string(), ".tmp".to_string()],
            ..Default::default()
        })
        .compile()
        .unwrap();

        assert!(!compiled.should_include("file.bak"));
        assert!(!compiled.should_include("file.BAK"));
        assert!(!compiled.should_include("file.tmp"));
        assert!(compiled.should_include("file.txt"));
    }

    #[test]
    fn test_exclude_glob_and_regex() {
        let compiled = rules(ExcludeRules {
            patterns: vec!["[0-9]*.part".to_string()],
            regex: vec![r"^draft_.*\.txt$".to_string()],
            ..Default::default()
        })
        .compile()
        .unwrap();

        assert!(!compiled.should_include("1movie.part"));
        assert!(compiled.should_include("movie.part"));
        assert!(!compiled.should_include("draft_notes.txt"));
        assert!(compiled.should_include("notes.txt"));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let config = FilterConfig {
            listing: FilterRules {
                include_hidden: false,
                exclude: ExcludeRules {
                    extensions: vec!["log".to_string()],
                    ..Default::default()
                },
                include: IncludeRules {
                    patterns: vec![".keep".to_string(), "keep_*.log".to_string()],
                },
            },
        };
        let compiled = config.compile().unwrap();

        assert!(compiled.should_include(".keep"));
        assert!(!compiled.should_include(".other"));
        assert!(compiled.should_include("keep_this.log"));
        assert!(!compiled.should_include("drop_this.log"));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = rules(ExcludeRules {
            regex: vec!["[invalid(".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            bad_regex.compile(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = rules(ExcludeRules {
            patterns: vec!["[invalid".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            bad_glob.compile(),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("filters.toml");
        fs::write(
            &path,
            "[listing]\ninclude_hidden = false\n\n[listing.exclude]\nextensions = [\"bak\"]\n",
        )
        .expect("Failed to write config");

        let config = FilterConfig::load(Some(&path)).expect("Failed to load config");
        assert!(!config.listing.include_hidden);
        assert_eq!(config.listing.exclude.extensions, vec!["bak".to_string()]);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let result = FilterConfig::load(Some(Path::new("/non/existent/filters.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("filters.toml");
        fs::write(&path, "[listing\ninclude_hidden = ").expect("Failed to write config");

        let result = FilterConfig::load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_resolve_regex_wins_over_length() {
        let request = ClassificationRequest {
            regexp: Some(r"\d+".to_string()),
            length: 3,
            anchor: Some(Anchor::Head),
            include_extension: false,
        };

        let resolved = request.resolve().unwrap();
        assert!(matches!(resolved, Some(ClassificationConfig::Regex(_))));
    }

    #[test]
    fn test_resolve_without_criteria_is_noop() {
        let request = ClassificationRequest {
            anchor: Some(Anchor::Tail),
            ..Default::default()
        };
        assert!(request.resolve().unwrap().is_none());
    }

    #[test]
    fn test_resolve_length() {
        let request = ClassificationRequest {
            length: 4,
            anchor: Some(Anchor::Tail),
            include_extension: true,
            ..Default::default()
        };

        match request.resolve().unwrap() {
            Some(ClassificationConfig::Length {
                length,
                anchor,
                include_extension,
            }) => {
                assert_eq!(length, 4);
                assert_eq!(anchor, Some(Anchor::Tail));
                assert!(include_extension);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_invalid_regex() {
        let request = ClassificationRequest {
            regexp: Some("(unclosed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            request.resolve(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));
    }

    #[test]
    fn test_validate_source_root() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(validate_source_root(temp_dir.path()).is_ok());

        let file = temp_dir.path().join("file.txt");
        fs::write(&file, "content").expect("Failed to write file");
        assert!(matches!(
            validate_source_root(&file),
            Err(ConfigError::InvalidSourceRoot { .. })
        ));
        assert!(validate_source_root(Path::new("/non/existent/path")).is_err());
    }
}
