//! Filename filtering with glob-style wildcard lists.
//!
//! An include list is a `|`-separated sequence of wildcard patterns, each
//! optionally prefixed with `-`. Evaluation starts from "excluded";
//! `-`-patterns AND-exclude (a match forces the outcome false) and plain
//! patterns OR-include (a match forces it true). An empty list includes
//! everything. Matching is case-insensitive and against the bare file name.

use glob::Pattern;
use tracing::trace;

use crate::errors::{SearchError, SearchResult};

/// One parsed entry of a wildcard list.
#[derive(Debug, Clone)]
struct WildcardPattern {
    negate: bool,
    pattern: Pattern,
}

/// An ordered, possibly empty set of wildcard patterns.
#[derive(Debug, Clone, Default)]
pub struct WildcardSet {
    patterns: Vec<WildcardPattern>,
}

impl WildcardSet {
    /// Parses a `|`-separated pattern list such as `"*.txt|-*.bak"`.
    /// Blank entries are skipped; a malformed glob is a configuration error.
    pub fn parse(text: &str) -> SearchResult<Self> {
        let mut patterns = Vec::new();
        for raw in text.split('|') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (negate, body) = match raw.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, raw),
            };
            let pattern = Pattern::new(&body.to_lowercase()).map_err(|e| {
                SearchError::config_error(format!("bad wildcard pattern '{raw}': {e}"))
            })?;
            patterns.push(WildcardPattern { negate, pattern });
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Evaluates the list against a bare file name.
    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let name = name.to_lowercase();
        let mut include = false;
        for p in &self.patterns {
            if p.negate {
                include = include && !p.pattern.matches(&name);
            } else {
                include = include || p.pattern.matches(&name);
            }
        }
        trace!("wildcard filter: '{}' -> {}", name, include);
        include
    }
}
