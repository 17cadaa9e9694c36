//! Compiled, validated form of a search request.

use std::path::PathBuf;

use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::filters::WildcardSet;
use crate::pattern::{Pattern, PatternFlags};

/// How candidate file names are admitted into the search.
#[derive(Debug, Clone)]
pub enum IncludeFilter {
    /// No filter configured; every file qualifies.
    All,
    /// A '|'-separated wildcard list, '-'-prefixed entries excluding.
    Wildcards(WildcardSet),
    /// A single regex matched case-insensitively against the file name.
    Regex(Pattern),
}

impl IncludeFilter {
    pub fn admits(&self, name: &str) -> bool {
        match self {
            IncludeFilter::All => true,
            IncludeFilter::Wildcards(set) => set.matches(name),
            IncludeFilter::Regex(rx) => rx.search(name, 0).is_some(),
        }
    }
}

/// Everything the engine needs, with all patterns compiled up front so a
/// malformed request fails before any file is touched.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub root: PathBuf,
    pub rx_search: Pattern,
    /// Byte-widened variant of a literal pattern, used to also find UTF-16LE
    /// encoded occurrences inside files treated as binary.
    pub rx_search_wide: Option<Pattern>,
    pub rx_exclude: Option<Pattern>,
    pub include: IncludeFilter,
    pub replace_text: String,
    pub do_replace: bool,
    pub recurse: bool,
    pub include_binary: bool,
    pub create_backups: bool,
}

impl SearchParams {
    /// Validates `config` and compiles every pattern it mentions.
    pub fn prepare(config: &SearchConfig, do_replace: bool) -> SearchResult<Self> {
        if config.root_path.as_os_str().is_empty() {
            return Err(SearchError::config_error("root path must not be empty"));
        }
        if config.pattern.is_empty() {
            return Err(SearchError::config_error("search pattern must not be empty"));
        }
        let replace_text = if do_replace {
            config
                .replace_text
                .clone()
                .ok_or_else(|| SearchError::config_error("replace requires replacement text"))?
        } else {
            String::new()
        };

        let flags = PatternFlags {
            literal: !config.regex,
            ignore_case: config.ignore_case,
            whole_words: config.whole_words,
            dot_all: config.dot_all,
            multi_line: config.multi_line,
        };
        let rx_search = Pattern::compile(&config.pattern, flags)?;

        // Case-insensitivity carries over; word boundaries are meaningless in
        // the widened byte stream and are dropped.
        let rx_search_wide = if flags.literal && config.include_binary {
            let wide_flags = PatternFlags {
                literal: true,
                ignore_case: config.ignore_case,
                ..PatternFlags::default()
            };
            Some(Pattern::compile(&widen(&config.pattern), wide_flags)?)
        } else {
            None
        };

        let name_flags = PatternFlags {
            ignore_case: true,
            ..PatternFlags::default()
        };
        let rx_exclude = match config.exclude_dirs.as_deref() {
            Some(rx) if !rx.is_empty() => Some(Pattern::compile(rx, name_flags)?),
            _ => None,
        };

        let include = match config.include_files.as_deref() {
            None | Some("") => IncludeFilter::All,
            Some(rx) if config.include_files_regex => {
                IncludeFilter::Regex(Pattern::compile(rx, name_flags)?)
            }
            Some(wildcards) => IncludeFilter::Wildcards(WildcardSet::parse(wildcards)?),
        };

        Ok(Self {
            root: config.root_path.clone(),
            rx_search,
            rx_search_wide,
            rx_exclude,
            include,
            replace_text,
            do_replace,
            recurse: config.recurse,
            include_binary: config.include_binary,
            create_backups: config.create_backups,
        })
    }
}

/// Re-expresses `text` as the byte-per-char form a UTF-16LE occurrence of it
/// takes when the file is read byte-by-byte: each code unit contributes its
/// low byte, then its high byte.
fn widen(text: &str) -> String {
    let mut wide = String::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        wide.push(char::from((unit & 0xFF) as u8));
        wide.push(char::from((unit >> 8) as u8));
    }
    wide
}
