use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a search or search-and-replace run.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.greplace.yaml` in the current directory
/// 3. Global `$HOME/.config/greplace/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Search pattern (regex unless `regex: false`)
/// pattern: "TODO|FIXME"
///
/// # Root directory to search in
/// root_path: "."
///
/// # File name filter, '|'-separated wildcards; '-' prefix excludes
/// include_files: "*.rs|*.toml|-*.lock"
///
/// # Directory names to skip while recursing
/// exclude_dirs: "target|\\.git"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// # CLI Integration
///
/// When using the CLI, command-line arguments take precedence over config file
/// values. The merging behavior is defined in the `merge_with_cli` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The search pattern (regex unless `regex` is false)
    pub pattern: String,

    /// Root directory to start the search from
    pub root_path: PathBuf,

    /// Replacement text; only consulted when a replace run is requested
    #[serde(default)]
    pub replace_text: Option<String>,

    /// Whether `pattern` is a regular expression (false means literal text)
    #[serde(default = "default_true")]
    pub regex: bool,

    /// Case-insensitive matching
    #[serde(default)]
    pub ignore_case: bool,

    /// Match only at word boundaries
    #[serde(default)]
    pub whole_words: bool,

    /// Let `.` match line terminators
    #[serde(default)]
    pub dot_all: bool,

    /// Anchor `^`/`$` at line boundaries instead of buffer boundaries
    #[serde(default)]
    pub multi_line: bool,

    /// Regex matched (case-insensitively) against directory names to skip
    #[serde(default)]
    pub exclude_dirs: Option<String>,

    /// File name filter. With `include_files_regex` false this is a
    /// '|'-separated wildcard list where a '-' prefix excludes; otherwise
    /// a single regex matched against the file name.
    #[serde(default)]
    pub include_files: Option<String>,

    /// Interpret `include_files` as a regex instead of wildcards
    #[serde(default)]
    pub include_files_regex: bool,

    /// Descend into subdirectories
    #[serde(default = "default_true")]
    pub recurse: bool,

    /// Search files that fail text detection byte-by-byte
    #[serde(default)]
    pub include_binary: bool,

    /// Write a `.bak` copy before the first modification of each file
    #[serde(default = "default_true")]
    pub create_backups: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            // Global config
            dirs::config_dir().map(|p| p.join("greplace/config.yaml")),
            // Local config
            Some(PathBuf::from(".greplace.yaml")),
            // Custom config
            config_path.map(PathBuf::from),
        ];

        // Add existing config files
        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // Build and deserialize
        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        // CLI values take precedence over config file values
        if !cli_config.pattern.is_empty() {
            self.pattern = cli_config.pattern;
        }
        if cli_config.root_path != PathBuf::from(".") {
            self.root_path = cli_config.root_path;
        }
        if cli_config.replace_text.is_some() {
            self.replace_text = cli_config.replace_text;
        }
        if !cli_config.regex {
            self.regex = false;
        }
        if cli_config.ignore_case {
            self.ignore_case = true;
        }
        if cli_config.whole_words {
            self.whole_words = true;
        }
        if cli_config.dot_all {
            self.dot_all = true;
        }
        if cli_config.multi_line {
            self.multi_line = true;
        }
        if cli_config.exclude_dirs.is_some() {
            self.exclude_dirs = cli_config.exclude_dirs;
        }
        if cli_config.include_files.is_some() {
            self.include_files = cli_config.include_files;
            self.include_files_regex = cli_config.include_files_regex;
        }
        if !cli_config.recurse {
            self.recurse = false;
        }
        if cli_config.include_binary {
            self.include_binary = true;
        }
        if !cli_config.create_backups {
            self.create_backups = false;
        }
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        self
    }
}
