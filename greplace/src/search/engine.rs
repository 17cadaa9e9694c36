//! Background search engine.
//!
//! A [`SearchEngine`] runs one traversal at a time on a dedicated thread and
//! reports through a [`SearchObserver`]: one progress tick per regular file
//! encountered, one match record per file with hits, and a completion signal
//! when the walk ends or is cancelled. Cancellation is cooperative; the
//! worker polls a shared flag between directory entries and between matches
//! inside large files.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, info, warn};

use crate::pattern::{advance_past, Pattern};
use crate::results::{ByteRange, FileMatch};
use crate::search::params::SearchParams;
use crate::text_file::TextFile;
use crate::walker::DirWalker;

/// Receives engine events. All methods default to no-ops so implementors
/// override only what they care about. Calls arrive on the worker thread.
pub trait SearchObserver: Send + Sync {
    /// A regular file was passed; `was_searched` is false when the name
    /// filter rejected it.
    fn on_progress(&self, _was_searched: bool) {}

    /// A file produced `match_count` hits, summarized in `file_match`.
    fn on_match(&self, _match_count: usize, _file_match: FileMatch) {}

    /// The traversal finished, whether exhausted or cancelled.
    fn on_complete(&self) {}
}

/// Handle to the background worker. Cheap to share; all state lives behind
/// atomics and a mutex.
#[derive(Default)]
pub struct SearchEngine {
    running: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
    current_file: Arc<Mutex<Option<PathBuf>>>,
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a search on a background thread. Returns false without side
    /// effects when a previous run is still active (including one that has
    /// been cancelled but not yet wound down).
    pub fn start(&self, params: SearchParams, observer: Arc<dyn SearchObserver>) -> bool {
        if self.running.load(Ordering::SeqCst) || self.cancel.load(Ordering::SeqCst) {
            debug!("start rejected, previous run still active");
            return false;
        }
        self.running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.running);
        let cancel = Arc::clone(&self.cancel);
        let current_file = Arc::clone(&self.current_file);

        let builder = thread::Builder::new().name("greplace-search".to_string());
        let spawned = builder.spawn(move || {
            info!("search started in '{}'", params.root.display());
            let mut worker = Worker {
                params,
                observer,
                cancel: Arc::clone(&cancel),
                current_file: Arc::clone(&current_file),
                backups: HashSet::new(),
            };
            worker.run();
            worker.observer.on_complete();

            *current_file.lock().unwrap() = None;
            cancel.store(false, Ordering::SeqCst);
            running.store(false, Ordering::SeqCst);
        });
        if spawned.is_err() {
            warn!("failed to spawn search thread");
            self.running.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Requests cancellation of the active run. Calling this while idle does
    /// nothing, so a stray cancel cannot poison the next start.
    pub fn cancel(&self) {
        if self.running.load(Ordering::SeqCst) {
            info!("cancel requested");
            self.cancel.store(true, Ordering::SeqCst);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Snapshot of the file currently being searched, for progress display.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.current_file.lock().unwrap().clone()
    }
}

struct Worker {
    params: SearchParams,
    observer: Arc<dyn SearchObserver>,
    cancel: Arc<AtomicBool>,
    current_file: Arc<Mutex<Option<PathBuf>>>,
    /// Backup files written during this run. The walker may reach them later
    /// in the traversal; they must be neither searched nor counted.
    backups: HashSet<PathBuf>,
}

impl Worker {
    fn run(&mut self) {
        let mut walker = DirWalker::new(&self.params.root);
        let prefix_len = walker.prefix_len();
        let mut go_down = false;

        while !self.cancel.load(Ordering::Relaxed) {
            let Some((path, is_dir)) = walker.next(go_down) else {
                break;
            };
            if is_dir {
                go_down = self.params.recurse && !self.excluded_dir(&path);
                continue;
            }
            go_down = false;

            if self.backups.contains(&path) {
                continue;
            }
            let name = file_name(&path);
            let searched = self.params.include.admits(&name);
            if searched {
                self.search_file(&path, prefix_len);
            }
            self.observer.on_progress(searched);
        }
    }

    /// A directory is excluded when the pattern matches either its bare
    /// name or its full path.
    fn excluded_dir(&self, path: &Path) -> bool {
        let Some(rx) = &self.params.rx_exclude else {
            return false;
        };
        rx.search(&file_name(path), 0).is_some()
            || rx.search(&path.to_string_lossy(), 0).is_some()
    }

    fn search_file(&mut self, path: &Path, prefix_len: usize) {
        *self.current_file.lock().unwrap() = Some(path.to_path_buf());
        self.scan(path, prefix_len);
        *self.current_file.lock().unwrap() = None;
    }

    fn scan(&mut self, path: &Path, prefix_len: usize) {
        let Some(mut file) = TextFile::load(path, true, self.params.include_binary) else {
            return;
        };

        let mut ranges = self.find_all_cancellable(&self.params.rx_search, file.content());
        let primary_hits = ranges.len();

        // The widened form only applies to buffers read byte-by-byte; in
        // decoded text it would find nothing but mojibake.
        if file.encoding().is_binary() {
            if let Some(wide) = &self.params.rx_search_wide {
                ranges.extend(self.find_all_cancellable(wide, file.content()));
            }
        }
        if ranges.is_empty() || self.cancel.load(Ordering::Relaxed) {
            return;
        }

        // Line records describe the file as found, so they are captured
        // before any replacement rewrites the buffer.
        let lines = file.lines_from_ranges(&ranges);

        // Widened hits are reported but never rewritten; without a primary
        // hit there is nothing to substitute.
        if self.params.do_replace && primary_hits > 0 && !self.replace_in(&mut file) {
            return;
        }

        self.observer.on_match(
            ranges.len(),
            FileMatch {
                path: path.to_path_buf(),
                prefix_len,
                encoding: file.encoding(),
                raw_size: file.raw_size(),
                lines,
            },
        );
    }

    fn find_all_cancellable(&self, rx: &Pattern, subject: &str) -> Vec<ByteRange> {
        let mut ranges = Vec::new();
        let mut offset = 0;
        while !self.cancel.load(Ordering::Relaxed) {
            let Some(found) = rx.search(subject, offset) else {
                break;
            };
            offset = advance_past(subject, &found);
            ranges.push(found);
        }
        ranges
    }

    /// Substitutes all matches and writes the file back, taking a backup
    /// first. Returns false when the file could not be rewritten; the
    /// caller then suppresses the match report so every reported
    /// replacement really happened.
    fn replace_in(&mut self, file: &mut TextFile) -> bool {
        let replaced = self
            .params
            .rx_search
            .replace(file.content(), &self.params.replace_text);
        if replaced == file.content() {
            // Nothing changed; succeed without touching the disk.
            return true;
        }

        if self.params.create_backups && !self.backup(file.path()) {
            return false;
        }
        file.move_to_content(replaced);
        self.store(file)
    }

    fn backup(&mut self, path: &Path) -> bool {
        let mut name = path.as_os_str().to_os_string();
        name.push(".bak");
        let backup_path = PathBuf::from(name);

        if let Err(e) = fs::copy(path, &backup_path) {
            // An earlier backup left read-only is the one recoverable case.
            let retried = e.kind() == io::ErrorKind::PermissionDenied
                && clear_readonly(&backup_path)
                && fs::copy(path, &backup_path).is_ok();
            if !retried {
                warn!("backup of {} failed: {}", path.display(), e);
                return false;
            }
        }
        debug!("backed up {} to {}", path.display(), backup_path.display());
        self.backups.insert(backup_path);
        true
    }

    fn store(&self, file: &TextFile) -> bool {
        let path = file.path();
        match file.store(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                let Ok(meta) = fs::metadata(path) else {
                    warn!("store of {} failed: {}", path.display(), e);
                    return false;
                };
                let original = meta.permissions();
                let mut writable = original.clone();
                writable.set_readonly(false);
                if fs::set_permissions(path, writable).is_err() {
                    warn!("store of {} failed: {}", path.display(), e);
                    return false;
                }
                let stored = file.store(path);
                // The file keeps its original permissions either way.
                let _ = fs::set_permissions(path, original);
                match stored {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("store of {} failed: {}", path.display(), e);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("store of {} failed: {}", path.display(), e);
                false
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn clear_readonly(path: &Path) -> bool {
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    let mut perms = meta.permissions();
    if !perms.readonly() {
        return false;
    }
    perms.set_readonly(false);
    fs::set_permissions(path, perms).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;
    impl SearchObserver for Silent {}

    #[test]
    fn test_cancel_while_idle_is_harmless() {
        let engine = SearchEngine::new();
        engine.cancel();
        assert!(!engine.is_running());
        // The stray cancel must not block the next start.
        assert!(!engine.cancel.load(Ordering::SeqCst));
    }

    #[test]
    fn test_observer_defaults_are_noops() {
        let observer = Silent;
        observer.on_progress(true);
        observer.on_complete();
    }

    #[test]
    fn test_current_file_starts_empty() {
        let engine = SearchEngine::new();
        assert_eq!(engine.current_file(), None);
    }

    #[test]
    fn test_clear_readonly_only_lifts_the_readonly_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        fs::write(&path, "x").unwrap();

        // A writable file offers nothing to clear.
        assert!(!clear_readonly(&path));

        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&path, perms).unwrap();

        assert!(clear_readonly(&path));
        assert!(!fs::metadata(&path).unwrap().permissions().readonly());

        // A missing path is not clearable either.
        assert!(!clear_readonly(Path::new("/no/such/file")));
    }
}
