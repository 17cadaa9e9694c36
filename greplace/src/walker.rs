//! Cancellable depth-first directory traversal with caller-controlled
//! descent.
//!
//! The walker holds an explicit stack of per-directory enumerators, the
//! innermost directory on top. Descent into a yielded directory is deferred
//! by one step: the caller inspects the entry, applies its exclude rules,
//! and only then decides, via the `go_down` argument of the *next* call,
//! whether the walker may commit resources to enumerating inside it.
//! Dropping the walker drops the whole stack, releasing every open
//! enumerator even when the traversal is abandoned midway.

use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

#[derive(Debug)]
pub struct DirWalker {
    /// Innermost directory on top. Empty once the traversal is exhausted.
    stack: Vec<ReadDir>,
    /// The previously yielded entry, when it was a directory. Consumed by
    /// the next `next` call to perform the deferred descent.
    pending_dir: Option<PathBuf>,
    prefix_len: usize,
}

impl DirWalker {
    /// Creates a walker rooted at `dir`. A root that is not a directory
    /// (or cannot be enumerated) produces an already-exhausted walker.
    pub fn new(dir: &Path) -> Self {
        trace!("dir walker: '{}'", dir.display());
        let mut stack = Vec::new();
        let mut prefix_len = 0;
        if dir.is_dir() {
            let display = dir.display().to_string();
            prefix_len = display.len();
            if !display.ends_with(std::path::MAIN_SEPARATOR) {
                prefix_len += 1;
            }
            match fs::read_dir(dir) {
                Ok(rd) => stack.push(rd),
                Err(e) => debug!("cannot enumerate {}: {}", dir.display(), e),
            }
        }
        Self {
            stack,
            pending_dir: None,
            prefix_len,
        }
    }

    /// Display-prefix length of the root; stripping this many characters
    /// from a yielded path's display form gives a root-relative name.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Yields the next entry as `(path, is_directory)`, or `None` once the
    /// traversal is exhausted.
    ///
    /// When the previously yielded entry was a directory and `go_down` is
    /// true, that directory is entered first. `ReadDir` never reports the
    /// `.`/`..` pseudo-entries, so no skipping is needed here; entries that
    /// error (e.g. vanished mid-walk) are logged and passed over.
    pub fn next(&mut self, go_down: bool) -> Option<(PathBuf, bool)> {
        if let Some(dir) = self.pending_dir.take() {
            if go_down {
                match fs::read_dir(&dir) {
                    Ok(rd) => self.stack.push(rd),
                    Err(e) => debug!("cannot enumerate {}: {}", dir.display(), e),
                }
            }
        }

        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Ok(entry)) => {
                    let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                    let path = entry.path();
                    trace!("dir walker found: '{}'", path.display());
                    if is_dir {
                        self.pending_dir = Some(path.clone());
                    }
                    return Some((path, is_dir));
                }
                Some(Err(e)) => debug!("skipping unreadable entry: {}", e),
                // Current directory exhausted: release it and resume the
                // parent enumeration.
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
