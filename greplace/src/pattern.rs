//! Pattern compilation and matching on top of the `regex` crate.
//!
//! The engine's native options do not directly expose every semantic flag we
//! need, so compilation composes them onto the pattern source. The order is
//! fixed: literal escaping must happen before the word-boundary wrap, because
//! `\b` is itself special syntax and must not be escaped away.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};
use crate::results::ByteRange;

/// Global cache of compiled programs, keyed by composed source plus the
/// builder options. Compiling the same pattern for every run of a dialog-
/// style caller is common, and compilation dominates short searches.
static PATTERN_CACHE: Lazy<DashMap<(String, u8), Arc<Regex>>> = Lazy::new(DashMap::new);

/// Orthogonal semantic flags. All default to off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternFlags {
    /// Remove the special meaning from every character of the pattern.
    pub literal: bool,
    /// Caseless matching.
    pub ignore_case: bool,
    /// Only match between word-boundary transitions.
    pub whole_words: bool,
    /// `.` also matches line terminators.
    pub dot_all: bool,
    /// `^` and `$` match at every line boundary, not just buffer ends.
    pub multi_line: bool,
}

impl PatternFlags {
    fn option_bits(&self) -> u8 {
        (self.ignore_case as u8) | (self.dot_all as u8) << 1 | (self.multi_line as u8) << 2
    }
}

/// A compiled pattern. Immutable once built; reusable across sequential
/// searches. Cloning shares the compiled program.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Arc<Regex>,
}

impl Pattern {
    /// Compiles `pattern` under the given flags. A syntax error yields an
    /// error value with no partial state.
    pub fn compile(pattern: &str, flags: PatternFlags) -> SearchResult<Self> {
        // Literal first: escaping turns every metacharacter into its quoted
        // form. Whole-words second: the anchors have to stay live syntax.
        let mut source = if flags.literal {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };
        if flags.whole_words {
            source = format!(r"\b{source}\b");
        }

        let key = (source, flags.option_bits());
        if let Some(cached) = PATTERN_CACHE.get(&key) {
            debug!("pattern cache hit: {}", key.0);
            return Ok(Self {
                regex: cached.clone(),
            });
        }

        let regex = RegexBuilder::new(&key.0)
            .case_insensitive(flags.ignore_case)
            .dot_matches_new_line(flags.dot_all)
            .multi_line(flags.multi_line)
            .build()
            .map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
        let regex = Arc::new(regex);
        PATTERN_CACHE.insert(key, regex.clone());
        Ok(Self { regex })
    }

    /// Returns the first match at or after `offset`.
    pub fn search(&self, subject: &str, offset: usize) -> Option<ByteRange> {
        if offset > subject.len() {
            return None;
        }
        self.regex
            .find_at(subject, offset)
            .map(|m| ByteRange::new(m.start(), m.end()))
    }

    /// Returns all matches, in order of strictly increasing start offset.
    ///
    /// A zero-width match still advances the scan position by one code
    /// point; otherwise a pattern like `a*` would loop forever.
    pub fn find_all(&self, subject: &str) -> Vec<ByteRange> {
        let mut result = Vec::new();
        let mut pos = 0;
        while let Some(found) = self.search(subject, pos) {
            pos = advance_past(subject, &found);
            result.push(found);
            if pos > subject.len() {
                break;
            }
        }
        result
    }

    /// Replaces every match in `subject` with `replacement` (which may use
    /// `$n` group references) and returns the new text. With no matches the
    /// result is byte-identical to the input.
    pub fn replace(&self, subject: &str, replacement: &str) -> String {
        self.regex.replace_all(subject, replacement).into_owned()
    }
}

/// Scan position after consuming `found`; steps over one code point when the
/// match was zero-width so that repeated searching makes forward progress.
pub(crate) fn advance_past(subject: &str, found: &ByteRange) -> usize {
    if !found.is_empty() {
        return found.end;
    }
    match subject[found.end..].chars().next() {
        Some(c) => found.end + c.len_utf8(),
        None => subject.len() + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_regex() {
        let p = Pattern::compile(r"\d+", PatternFlags::default()).unwrap();
        let m = p.search("abc 123 def 45", 0).unwrap();
        assert_eq!((m.begin, m.end), (4, 7));
        let m = p.search("abc 123 def 45", 7).unwrap();
        assert_eq!((m.begin, m.end), (12, 14));
        assert!(p.search("abc 123", 8).is_none());
    }

    #[test]
    fn test_compile_failure_is_a_value() {
        let err = Pattern::compile(r"(unclosed", PatternFlags::default());
        assert!(matches!(err, Err(SearchError::InvalidPattern(_))));
    }

    #[test]
    fn test_literal_escapes_metacharacters() {
        let flags = PatternFlags {
            literal: true,
            ..Default::default()
        };
        let p = Pattern::compile("a.b", flags).unwrap();
        assert!(p.search("a.b", 0).is_some());
        assert!(p.search("axb", 0).is_none());
    }

    #[test]
    fn test_literal_whole_word_composition() {
        let flags = PatternFlags {
            literal: true,
            whole_words: true,
            ..Default::default()
        };
        let p = Pattern::compile("a.b", flags).unwrap();
        let m = p.search("x a.b y", 0).unwrap();
        assert_eq!((m.begin, m.end), (2, 5));
        assert!(p.search("xa.by", 0).is_none());
        assert!(p.search("axb", 0).is_none());
    }

    #[test]
    fn test_ignore_case() {
        let flags = PatternFlags {
            ignore_case: true,
            ..Default::default()
        };
        let p = Pattern::compile("needle", flags).unwrap();
        assert!(p.search("some NeEdLe here", 0).is_some());
    }

    #[test]
    fn test_dot_all_and_multi_line() {
        let p = Pattern::compile(
            "a.c",
            PatternFlags {
                dot_all: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(p.search("a\nc", 0).is_some());

        let p = Pattern::compile(
            "^b$",
            PatternFlags {
                multi_line: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(p.search("a\nb\nc", 0).is_some());
    }

    #[test]
    fn test_find_all_zero_width_makes_progress() {
        let p = Pattern::compile("a*", PatternFlags::default()).unwrap();
        let all = p.find_all("bbb");
        // One empty match per position, strictly increasing starts.
        let starts: Vec<usize> = all.iter().map(|r| r.begin).collect();
        assert_eq!(starts, vec![0, 1, 2, 3]);
        let mut prev = None;
        for r in &all {
            if let Some(p) = prev {
                assert!(r.begin > p);
            }
            prev = Some(r.begin);
        }
    }

    #[test]
    fn test_find_all_mixed_width() {
        let p = Pattern::compile("a*", PatternFlags::default()).unwrap();
        let all = p.find_all("baab");
        let spans: Vec<(usize, usize)> = all.iter().map(|r| (r.begin, r.end)).collect();
        assert_eq!(spans, vec![(0, 0), (1, 3), (3, 3), (4, 4)]);
    }

    #[test]
    fn test_replace_no_match_is_identity() {
        let p = Pattern::compile("zzz", PatternFlags::default()).unwrap();
        let subject = "nothing to see here";
        assert_eq!(p.replace(subject, "XXX"), subject);
    }

    #[test]
    fn test_replace_global_with_groups() {
        let p = Pattern::compile(r"(\w+)@(\w+)", PatternFlags::default()).unwrap();
        assert_eq!(p.replace("a@b c@d", "$2@$1"), "b@a d@c");
    }
}
