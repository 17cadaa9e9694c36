//! In-memory text buffer: load, normalize, map matches to lines, store.
//!
//! A loaded file is normalized into a single `String`; every offset handed
//! to or returned from the pattern engine counts UTF-8 code units of that
//! string. The original on-disk encoding is recorded so that `store` can
//! serialize the (possibly mutated) content back to the exact byte form it
//! came from, BOM included.
//!
//! Loading fails softly: a file that is too large, unreadable, or binary
//! (when binary content was not requested) simply yields `None` and the
//! caller moves on. Nothing here ever aborts a run.

use encoding_rs::WINDOWS_1252;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use sysinfo::System;
use tracing::{debug, trace};

use crate::encoding::{self, TextEncoding, UTF16_LE_BOM, UTF8_BOM};
use crate::results::{ByteRange, LineRecord};

/// Hard cap on loadable content, bounded by the 32-bit text-length
/// representation of the original file format this engine grew out of.
const MAX_TEXT_LEN: u64 = u32::MAX as u64;

/// A file may additionally claim at most this share of the currently
/// available physical memory. A resource-safety guard, not a correctness
/// requirement.
const MEM_THRESHOLD_PERCENT: u64 = 20;

fn memory_budget() -> u64 {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory() / (100 / MEM_THRESHOLD_PERCENT)
}

/// A file's decoded content plus everything needed to write it back.
#[derive(Debug)]
pub struct TextFile {
    path: PathBuf,
    raw_size: usize,
    encoding: TextEncoding,
    content: String,
    line_ends: Vec<usize>,
}

impl TextFile {
    /// Loads and normalizes a file. Returns `None` for every per-file soft
    /// failure: unreadable, over the size caps, undecodable, or binary
    /// while `include_binary` is false.
    pub fn load(path: &Path, prefer_utf8: bool, include_binary: bool) -> Option<TextFile> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                debug!("cannot open {}: {}", path.display(), e);
                return None;
            }
        };
        let size = match file.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                debug!("no metadata for {}: {}", path.display(), e);
                return None;
            }
        };
        let budget = memory_budget();
        if size > MAX_TEXT_LEN || (budget > 0 && size > budget) {
            debug!("skipping over-cap file {} ({} bytes)", path.display(), size);
            return None;
        }

        // Mapping a zero-length file is an error on most platforms; an
        // empty slice is equivalent.
        let mapping = if size > 0 {
            match unsafe { Mmap::map(&file) } {
                Ok(m) => Some(m),
                Err(e) => {
                    debug!("cannot map {}: {}", path.display(), e);
                    return None;
                }
            }
        } else {
            None
        };
        let bytes: &[u8] = mapping.as_deref().unwrap_or(&[]);

        let encoding = encoding::detect(bytes, prefer_utf8);
        if encoding == TextEncoding::Binary && !include_binary {
            trace!("skipping binary file {}", path.display());
            return None;
        }

        let content = match encoding {
            // One char per raw byte: a lossless but non-text expansion that
            // only exists so a widened literal pattern can find byte
            // sequences inside non-text content.
            TextEncoding::Binary => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::Ansi | TextEncoding::Unknown => {
                WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
            }
            TextEncoding::Utf8Bom => String::from_utf8_lossy(&bytes[UTF8_BOM.len()..]).into_owned(),
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Utf16Le | TextEncoding::Utf16LeBom => {
                let data = if encoding == TextEncoding::Utf16LeBom {
                    &bytes[UTF16_LE_BOM.len()..]
                } else {
                    bytes
                };
                let units: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        };

        Some(TextFile {
            path: path.to_path_buf(),
            raw_size: size as usize,
            encoding,
            content,
            line_ends: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn raw_size(&self) -> usize {
        self.raw_size
    }

    /// Replaces the content after a successful substitution. The encoding
    /// tag is immutable; the new content will be serialized under it.
    pub fn move_to_content(&mut self, new_content: String) {
        self.content = new_content;
    }

    /// Line-end index: position of the last code unit of each terminator
    /// (`\n` of a CRLF pair, the lone `\r` or `\n` otherwise), plus the
    /// content length as a final implicit boundary.
    fn index_line_ends(&mut self) {
        self.line_ends.clear();
        // Expect an average line length of 32.
        self.line_ends.reserve(self.content.len() / 32 + 1);
        let bytes = self.content.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' => {
                    let mut pos = i;
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                        pos += 1;
                        i += 1;
                    }
                    self.line_ends.push(pos);
                }
                b'\n' => self.line_ends.push(i),
                _ => {}
            }
            i += 1;
        }
        self.line_ends.push(self.content.len());
    }

    /// Maps a sorted sequence of match ranges to the lines they touch, in a
    /// single forward merge over the line-end index: O(ranges + lines).
    ///
    /// A range spanning several lines emits one record per spanned line; a
    /// single line may close out several short ranges; a range ending
    /// exactly on a boundary still belongs to that line. Binary buffers
    /// have no line structure and degenerate to `{range.begin, ""}`.
    pub fn lines_from_ranges(&mut self, ranges: &[ByteRange]) -> Vec<LineRecord> {
        let mut result = Vec::with_capacity(ranges.len());
        if ranges.is_empty() {
            return result;
        }

        if self.encoding == TextEncoding::Binary {
            for r in ranges {
                result.push(LineRecord {
                    line_number: r.begin,
                    text: String::new(),
                });
            }
            return result;
        }

        self.index_line_ends();

        let mut rix = 0;
        let mut wait_for_range_start = true;
        for (lix, &line_end) in self.line_ends.iter().enumerate() {
            let range = ranges[rix];
            let add_line = if wait_for_range_start {
                // Does this line contain a range start?
                if range.begin <= line_end {
                    wait_for_range_start = false;
                    true
                } else {
                    false
                }
            } else if range.end > line_end {
                // Completely inside of a range.
                true
            } else {
                // A range ends on this line.
                wait_for_range_start = true;
                true
            };

            if add_line {
                let line_begin = if lix == 0 {
                    0
                } else {
                    self.line_ends[lix - 1] + 1
                };
                let text = &self.content[line_begin..line_end];
                let text = text.strip_suffix('\r').unwrap_or(text);
                result.push(LineRecord {
                    line_number: lix + 1,
                    text: text.to_string(),
                });
                // We added the line, so skip all ranges that still end on
                // this very line.
                while line_end >= ranges[rix].end {
                    rix += 1;
                    if rix == ranges.len() {
                        return result;
                    }
                }
                // If the next pending range starts behind this line, we are
                // back to waiting for a range start.
                if ranges[rix].begin > line_end {
                    wait_for_range_start = true;
                }
            }
        }
        result
    }

    /// Serializes the content back to the recorded encoding, overwriting
    /// `path`. Re-emits the BOM where the original carried one.
    pub fn store(&self, path: &Path) -> io::Result<()> {
        let mut data: Vec<u8> = Vec::with_capacity(self.content.len() + UTF8_BOM.len());
        match self.encoding {
            TextEncoding::Binary => {
                // Inverse of the byte expansion; chars above U+00FF can
                // only come from replacement text and truncate.
                data.extend(self.content.chars().map(|c| c as u8));
            }
            TextEncoding::Ansi | TextEncoding::Unknown => {
                let (cow, _, _) = WINDOWS_1252.encode(&self.content);
                data.extend_from_slice(&cow);
            }
            TextEncoding::Utf8Bom => {
                data.extend_from_slice(&UTF8_BOM);
                data.extend_from_slice(self.content.as_bytes());
            }
            TextEncoding::Utf8 => data.extend_from_slice(self.content.as_bytes()),
            TextEncoding::Utf16LeBom | TextEncoding::Utf16Le => {
                if self.encoding == TextEncoding::Utf16LeBom {
                    data.extend_from_slice(&UTF16_LE_BOM);
                }
                for unit in self.content.encode_utf16() {
                    data.extend_from_slice(&unit.to_le_bytes());
                }
            }
        }
        fs::write(path, data)
    }
}
