//! Result types produced by a search run.

use std::path::PathBuf;

use crate::encoding::TextEncoding;

/// Half-open `[begin, end)` span of code units inside a text buffer.
///
/// Offsets count UTF-8 code units of the buffer's normalized content, not
/// bytes of the on-disk file. Repeated searching produces ranges with
/// non-decreasing `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub begin: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end);
        Self { begin, end }
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// One line touched by at least one match.
///
/// For binary buffers no line structure exists; the record degenerates to
/// the range begin as a pseudo line number and empty text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// 1-based line number (or a range begin for binary buffers).
    pub line_number: usize,
    /// The full text of the line, without its terminator.
    pub text: String,
}

/// All match information for a single file. Never mutated after being
/// handed to the reporting callback.
#[derive(Debug, Clone)]
pub struct FileMatch {
    pub path: PathBuf,
    /// Display-prefix length of the search root; rendering `path` from this
    /// offset on yields a root-relative name.
    pub prefix_len: usize,
    pub encoding: TextEncoding,
    /// On-disk size in bytes at the time the file was searched.
    pub raw_size: usize,
    pub lines: Vec<LineRecord>,
}
