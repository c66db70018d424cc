//! Dispatch engine: snapshot, filter, classify, move, report.
//!
//! A run walks the direct children of one target directory exactly once.
//! Each file passes the filter gates, then the classification rule kinds
//! in priority order; the first matching kind decides the destination
//! folder and the file is moved there under its own name. Every outcome
//! is reported through the [`NotificationSink`], and `Finished` is always
//! the last event.
//!
//! Fatal errors (unloadable rules, missing target, uncreatable folder)
//! end the run before any file is touched. Per-file errors are reported
//! and never stop iteration. Cancellation is cooperative: the token is
//! polled once per file, at the top of the loop, so a requested stop
//! never interrupts a move in flight.

use crate::classifier::{self, FileEntry};
use crate::config::{CompiledRules, RuleSet};
use crate::notify::{Event, NotificationSink};
use crate::planner::FolderPlanner;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation token shared between a host and a run.
///
/// Cancelling stops the run at the next per-file loop boundary; files
/// already moved stay moved.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Errors raised by the dispatch engine.
#[derive(Debug)]
pub enum EngineError {
    /// Target path missing or not a directory; fatal.
    TargetNotFound { path: PathBuf },
    /// Destination already has a same-named entry; the file is marked
    /// failed and the run continues.
    MoveConflict {
        source: PathBuf,
        destination: PathBuf,
    },
    /// File could not be read or relocated; the file is skipped or marked
    /// failed and the run continues.
    FileAccess {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::TargetNotFound { path } => {
                write!(
                    f,
                    "target folder {} does not exist or is not a directory",
                    path.display()
                )
            }
            EngineError::MoveConflict {
                source,
                destination,
            } => {
                write!(
                    f,
                    "cannot move {}: {} already exists",
                    source.display(),
                    destination.display()
                )
            }
            EngineError::FileAccess { path, source } => {
                write!(f, "cannot access {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Terminal state of one file in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// Relocated into its destination folder.
    Moved,
    /// No enabled rule kind matched; left in place.
    Unmatched,
    /// Rejected by a filter rule; never classified.
    Rejected,
    /// Source vanished or was unreadable; nothing relocated.
    Skipped,
    /// Move failed (conflict or I/O error).
    Failed,
}

/// Tallies for one run, carried by [`Event::Finished`].
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Files in the snapshot.
    pub total: usize,
    /// Files that reached a terminal state (equal to `total` unless the
    /// run was cancelled or aborted).
    pub processed: usize,
    pub moved: usize,
    pub unmatched: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
    /// Set when the run aborted before (or without) processing files.
    pub fatal_error: Option<String>,
}

impl RunSummary {
    /// A run succeeded when nothing fatal happened and no file failed.
    pub fn is_success(&self) -> bool {
        self.fatal_error.is_none() && self.failed == 0
    }
}

/// One-directory file organizer: the host API surface.
///
/// Configure a target directory (and optionally a rule document and
/// dry-run mode), hand out a [`CancelToken`], then call [`run`] with a
/// sink for the outbound notifications.
///
/// [`run`]: Organizer::run
#[derive(Debug)]
pub struct Organizer {
    target: PathBuf,
    rule_source: Option<PathBuf>,
    dry_run: bool,
    cancel: CancelToken,
}

impl Organizer {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            rule_source: None,
            dry_run: false,
            cancel: CancelToken::new(),
        }
    }

    /// Sets the rule document path. Without one (or when the path does
    /// not exist) the built-in default rules apply.
    pub fn with_rule_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.rule_source = Some(path.into());
        self
    }

    /// In dry-run mode the full pipeline executes and reports, but no
    /// folder is created and no file is moved.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns a token that cancels this organizer's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Executes one run: load rules → validate target → plan folders →
    /// dispatch files → finished.
    ///
    /// Every error is surfaced as status text through the sink;
    /// [`Event::Finished`] is always the last event. The returned summary
    /// is the same value the finished event carries.
    pub fn run(&self, sink: &dyn NotificationSink) -> RunSummary {
        let mut summary = RunSummary::default();

        let ruleset = match RuleSet::load(self.rule_source.as_deref()) {
            Ok(ruleset) => ruleset,
            Err(e) => return self.abort(sink, summary, format!("Error: {e}")),
        };

        if !self.target.is_dir() {
            let e = EngineError::TargetNotFound {
                path: self.target.clone(),
            };
            return self.abort(sink, summary, format!("Error: {e}"));
        }

        let rules = ruleset.compile();
        info!(
            "organizing {} with {} classification rule kind(s)",
            self.target.display(),
            rules.priority.len()
        );
        sink.notify(Event::Status(format!(
            "Preparing to organize files in {}...",
            self.target.display()
        )));

        let folders = FolderPlanner::plan(&rules);
        if !self.dry_run && let Err(e) = FolderPlanner::ensure(&self.target, &folders) {
            return self.abort(sink, summary, format!("Error: {e}"));
        }

        let files = match self.snapshot() {
            Ok(files) => files,
            Err(e) => return self.abort(sink, summary, format!("Error: {e}")),
        };
        summary.total = files.len();

        if files.is_empty() {
            sink.notify(Event::Progress(100));
            sink.notify(Event::Status("No files to organize.".to_string()));
            return self.finish(sink, summary);
        }

        for path in &files {
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                info!(
                    "run cancelled after {} of {} files",
                    summary.processed, summary.total
                );
                sink.notify(Event::Status("Organization stopped by user.".to_string()));
                break;
            }

            match self.process_file(path, &rules, sink) {
                FileOutcome::Moved => summary.moved += 1,
                FileOutcome::Unmatched => summary.unmatched += 1,
                FileOutcome::Rejected => summary.rejected += 1,
                FileOutcome::Skipped => summary.skipped += 1,
                FileOutcome::Failed => summary.failed += 1,
            }
            summary.processed += 1;

            let percent = (summary.processed as f64 / summary.total as f64 * 100.0).round() as u8;
            sink.notify(Event::Progress(percent));
        }

        if !summary.cancelled {
            sink.notify(Event::Status("File organization complete!".to_string()));
        }
        self.finish(sink, summary)
    }

    /// Enumerates the direct children of the target once; subdirectories
    /// and the active rule document are excluded. Sorted by path for a
    /// deterministic processing order.
    fn snapshot(&self) -> Result<Vec<PathBuf>, EngineError> {
        let entries = fs::read_dir(&self.target).map_err(|e| EngineError::FileAccess {
            path: self.target.clone(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries.flatten() {
            if let Ok(file_type) = entry.file_type()
                && file_type.is_file()
            {
                let path = entry.path();
                if self.rule_source.as_deref() == Some(path.as_path()) {
                    continue;
                }
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Runs one file through the state machine:
    /// filters → priority walk → move.
    fn process_file(
        &self,
        path: &Path,
        rules: &CompiledRules,
        sink: &dyn NotificationSink,
    ) -> FileOutcome {
        let file = match FileEntry::from_path(path.to_path_buf()) {
            Ok(file) => file,
            Err(source) => {
                let e = EngineError::FileAccess {
                    path: path.to_path_buf(),
                    source,
                };
                warn!("{e}");
                sink.notify(Event::Status(format!("Error: {e}")));
                return FileOutcome::Skipped;
            }
        };
        debug!("processing '{}' ({} bytes)", file.name, file.size_bytes);

        if let Some(rule) = &rules.filter_time
            && !classifier::time_filter_passes(&file, rule)
        {
            debug!("'{}' rejected by time filter", file.name);
            return FileOutcome::Rejected;
        }
        if let Some(rule) = &rules.filter_size
            && !classifier::size_filter_passes(&file, rule)
        {
            debug!("'{}' rejected by size filter", file.name);
            return FileOutcome::Rejected;
        }

        for kind in &rules.priority {
            match classifier::evaluate(*kind, &file, rules) {
                Ok(Some(destination)) => return self.move_file(&file, &destination, sink),
                Ok(None) => {}
                Err(e) => {
                    // the rule kind is non-matching for this file; keep walking
                    warn!("{e} while classifying '{}'", file.name);
                    sink.notify(Event::Status(format!("Error: {e} (file '{}')", file.name)));
                }
            }
        }

        FileOutcome::Unmatched
    }

    /// Relocates a file into `destination` under its own name.
    fn move_file(
        &self,
        file: &FileEntry,
        destination: &str,
        sink: &dyn NotificationSink,
    ) -> FileOutcome {
        sink.notify(Event::Status(format!(
            "Moving [{destination}] {} ...",
            file.name
        )));
        if self.dry_run {
            return FileOutcome::Moved;
        }

        // raced by an external actor: not an error
        if !file.path.exists() {
            debug!("'{}' vanished before the move; skipping", file.name);
            return FileOutcome::Skipped;
        }

        let dest_dir = self.target.join(destination);
        if !dest_dir.is_dir()
            && let Err(source) = fs::create_dir(&dest_dir)
        {
            let e = EngineError::FileAccess {
                path: dest_dir.clone(),
                source,
            };
            warn!("{e}");
            sink.notify(Event::Status(format!("Error: {e}")));
            return FileOutcome::Failed;
        }

        let dest_path = dest_dir.join(&file.name);
        if dest_path.exists() {
            let e = EngineError::MoveConflict {
                source: file.path.clone(),
                destination: dest_path,
            };
            warn!("{e}");
            sink.notify(Event::Status(format!("Error: {e}")));
            return FileOutcome::Failed;
        }

        match fs::rename(&file.path, &dest_path) {
            Ok(()) => {
                debug!("moved {} -> {}", file.path.display(), dest_path.display());
                FileOutcome::Moved
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!("'{}' vanished during the move; skipping", file.name);
                FileOutcome::Skipped
            }
            Err(source) => {
                let e = EngineError::FileAccess {
                    path: file.path.clone(),
                    source,
                };
                warn!("{e}");
                sink.notify(Event::Status(format!("Error: {e}")));
                FileOutcome::Failed
            }
        }
    }

    fn abort(
        &self,
        sink: &dyn NotificationSink,
        mut summary: RunSummary,
        message: String,
    ) -> RunSummary {
        warn!("run aborted: {message}");
        summary.fatal_error = Some(message.clone());
        sink.notify(Event::Status(message));
        self.finish(sink, summary)
    }

    fn finish(&self, sink: &dyn NotificationSink, summary: RunSummary) -> RunSummary {
        info!(
            "run finished: {} moved, {} failed, {} of {} processed",
            summary.moved, summary.failed, summary.processed, summary.total
        );
        sink.notify(Event::Finished(summary.clone()));
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct CollectingSink(Mutex<Vec<Event>>);

    impl CollectingSink {
        fn new() -> Self {
            Self(Mutex::new(Vec::new()))
        }

        fn events(&self) -> Vec<Event> {
            self.0.lock().unwrap().clone()
        }
    }

    impl NotificationSink for CollectingSink {
        fn notify(&self, event: Event) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_cancel_token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
        // clones share the flag
        let clone = token.clone();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_missing_target_is_fatal_and_finished_is_last() {
        let sink = CollectingSink::new();
        let summary = Organizer::new("/no/such/directory").run(&sink);

        assert!(summary.fatal_error.is_some());
        assert_eq!(summary.processed, 0);

        let events = sink.events();
        assert!(matches!(events.last(), Some(Event::Finished(_))));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, Event::Status(s) if s.starts_with("Error")))
        );
        assert!(!events.iter().any(|e| matches!(e, Event::Progress(_))));
    }

    #[test]
    fn test_empty_directory_reports_full_progress() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let sink = CollectingSink::new();
        let summary = Organizer::new(temp_dir.path()).run(&sink);

        assert_eq!(summary.total, 0);
        assert!(summary.is_success());
        assert!(
            sink.events()
                .iter()
                .any(|e| matches!(e, Event::Progress(100)))
        );
    }

    #[test]
    fn test_precancelled_run_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("photo.jpg"), b"img").expect("Failed to write file");

        let organizer = Organizer::new(temp_dir.path());
        organizer.cancel_token().cancel();
        let sink = CollectingSink::new();
        let summary = organizer.run(&sink);

        assert!(summary.cancelled);
        assert_eq!(summary.moved, 0);
        assert!(temp_dir.path().join("photo.jpg").exists());
        assert!(
            sink.events()
                .iter()
                .any(|e| matches!(e, Event::Status(s) if s.contains("stopped")))
        );
    }

    #[test]
    fn test_dry_run_moves_and_creates_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("photo.jpg"), b"img").expect("Failed to write file");

        let sink = CollectingSink::new();
        let summary = Organizer::new(temp_dir.path()).dry_run(true).run(&sink);

        assert_eq!(summary.moved, 1);
        assert!(temp_dir.path().join("photo.jpg").exists());
        assert!(!temp_dir.path().join("images").exists());
    }

    #[test]
    fn test_default_run_moves_file_and_finishes_last() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("photo.jpg"), b"img").expect("Failed to write file");

        let sink = CollectingSink::new();
        let summary = Organizer::new(temp_dir.path()).run(&sink);

        assert_eq!(summary.moved, 1);
        assert!(temp_dir.path().join("images").join("photo.jpg").exists());

        let events = sink.events();
        assert!(matches!(events.last(), Some(Event::Finished(_))));
        assert!(events.iter().any(|e| matches!(e, Event::Progress(100))));
    }

    #[test]
    fn test_move_conflict_marks_file_failed_and_continues() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join("photo.jpg"), b"new").expect("Failed to write file");
        std::fs::write(temp_dir.path().join("clip.mp4"), b"vid").expect("Failed to write file");
        std::fs::create_dir(temp_dir.path().join("images")).expect("Failed to create dir");
        std::fs::write(temp_dir.path().join("images").join("photo.jpg"), b"old")
            .expect("Failed to write file");

        let sink = CollectingSink::new();
        let summary = Organizer::new(temp_dir.path()).run(&sink);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.moved, 1);
        // the conflicting source stays in place, the destination is untouched
        assert!(temp_dir.path().join("photo.jpg").exists());
        let kept = std::fs::read(temp_dir.path().join("images").join("photo.jpg")).unwrap();
        assert_eq!(kept, b"old");
        assert!(temp_dir.path().join("videos").join("clip.mp4").exists());
    }
}
