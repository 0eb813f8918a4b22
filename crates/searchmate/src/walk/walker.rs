//! Parallel substring walk.
//!
//! Every directory spawns one rayon task per subdirectory, so fan-out grows
//! with the branching factor at every level. The walker owns a fixed-size pool,
//! which bounds how many of those tasks run at once.
//!
//! The result cap is checked without a global lock: concurrent branches may
//! each add a match after the cap was crossed, so a walk can overshoot by
//! roughly the number of busy workers. Callers that need an exact bound
//! truncate afterwards.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::available_parallelism;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};

use super::roots::collapse_nested;
use crate::error::{Result, SearchError};
use crate::types::ResultSet;

/// Statistics for one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Number of roots walked.
    pub roots: usize,
    /// Matches collected before truncation.
    pub matches: usize,
    /// Directories successfully enumerated.
    pub dirs_scanned: usize,
    /// Directory or entry errors that were skipped.
    pub errors: usize,
    /// Whether the walk stopped early because the cap was reached.
    pub capped: bool,
    pub elapsed: Duration,
}

/// State shared by every branch of a single walk.
#[derive(Debug)]
struct WalkData<'a> {
    /// Lower-cased substring that file names must contain.
    pattern: &'a str,
    /// Nominal result cap.
    cap: usize,
    /// Directory prefixes that are never descended into.
    ignore_directories: &'a [PathBuf],
    /// Number of matches inserted so far.
    matched: AtomicUsize,
    num_dirs: AtomicUsize,
    errors: AtomicUsize,
    results: Mutex<ResultSet>,
}

impl<'a> WalkData<'a> {
    fn new(pattern: &'a str, cap: usize, ignore_directories: &'a [PathBuf]) -> Self {
        Self {
            pattern,
            cap,
            ignore_directories,
            matched: AtomicUsize::new(0),
            num_dirs: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            results: Mutex::new(ResultSet::new()),
        }
    }

    #[inline]
    fn cap_reached(&self) -> bool {
        self.matched.load(Ordering::Relaxed) >= self.cap
    }

    fn should_ignore(&self, path: &Path) -> bool {
        self.ignore_directories
            .iter()
            .any(|ignored| path == ignored || path.starts_with(ignored))
    }

    fn name_matches(&self, name: &str) -> bool {
        name.to_lowercase().contains(self.pattern)
    }

    /// Adds a match. Returns false once the cap has been reached.
    fn offer(&self, path: &Path) -> bool {
        if self.cap_reached() {
            return false;
        }
        let inserted = self
            .results
            .lock()
            .insert(path.to_string_lossy().into_owned());
        if inserted {
            self.matched.fetch_add(1, Ordering::Relaxed) + 1 < self.cap
        } else {
            !self.cap_reached()
        }
    }

    fn record_error(&self, path: &Path, error: &io::Error) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        log::debug!("walk skipped {}: {}", path.display(), error);
    }
}

/// Walks directory trees for file names containing a substring.
#[derive(Debug)]
pub struct PathWalker {
    pool: ThreadPool,
    ignore_directories: Vec<PathBuf>,
}

impl PathWalker {
    /// Creates a walker with `threads` workers. Zero picks the available parallelism.
    pub fn new(threads: usize) -> Result<Self> {
        let threads = if threads == 0 {
            available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            threads
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("searchmate-walk-{index}"))
            .build()
            .map_err(|error| {
                SearchError::Internal(format!("failed to build walker pool: {error}"))
            })?;
        Ok(Self {
            pool,
            ignore_directories: Vec::new(),
        })
    }

    /// Sets directory prefixes that are never descended into.
    pub fn with_ignored(mut self, ignore_directories: Vec<PathBuf>) -> Self {
        self.ignore_directories = ignore_directories;
        self
    }

    pub fn ignored(&self) -> &[PathBuf] {
        &self.ignore_directories
    }

    /// Walks all `roots` in parallel, collecting files whose name contains
    /// `pattern` (already lower-cased) until roughly `cap` matches are found.
    ///
    /// Roots nested under another root are skipped, so every directory is
    /// enumerated at most once. Unreadable directories contribute nothing; the
    /// walk itself never fails.
    pub fn walk(&self, roots: &[PathBuf], pattern: &str, cap: usize) -> (ResultSet, WalkSummary) {
        let started = Instant::now();
        let roots = collapse_nested(roots.to_vec());
        let data = WalkData::new(pattern, cap, &self.ignore_directories);

        if !pattern.is_empty() && cap > 0 {
            let data = &data;
            self.pool.scope(|scope| {
                for root in roots.iter().cloned() {
                    scope.spawn(move |scope| walk_dir(root, data, scope));
                }
            });
        }

        let summary = WalkSummary {
            roots: roots.len(),
            matches: data.matched.load(Ordering::Relaxed),
            dirs_scanned: data.num_dirs.load(Ordering::Relaxed),
            errors: data.errors.load(Ordering::Relaxed),
            capped: data.cap_reached(),
            elapsed: started.elapsed(),
        };
        (data.results.into_inner(), summary)
    }
}

/// Enumerates one directory, records matching files and fans out into subdirectories.
fn walk_dir<'s>(dir: PathBuf, data: &'s WalkData<'_>, scope: &Scope<'s>) {
    if data.cap_reached() || data.should_ignore(&dir) {
        return;
    }

    let read_dir = match fs::read_dir(&dir) {
        Ok(iter) => iter,
        Err(error) => {
            data.record_error(&dir, &error);
            return;
        }
    };
    data.num_dirs.fetch_add(1, Ordering::Relaxed);

    let mut subdirs = Vec::new();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                data.record_error(&dir, &error);
                continue;
            }
        };
        // Does not follow symlinks, so linked directories are never descended.
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(error) => {
                data.record_error(&entry.path(), &error);
                continue;
            }
        };

        if file_type.is_dir() {
            subdirs.push(entry.path());
            continue;
        }
        if !data.name_matches(&entry.file_name().to_string_lossy()) {
            continue;
        }

        let path = entry.path();
        if file_type.is_symlink() && !path.is_file() {
            continue;
        }
        if !data.offer(&path) {
            return;
        }
    }

    for subdir in subdirs {
        scope.spawn(move |scope| walk_dir(subdir, data, scope));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn touch(path: PathBuf) -> String {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn finds_matches_at_every_depth() {
        let temp = TempDir::new().unwrap();
        let shallow = touch(temp.path().join("report.txt"));
        let deep = touch(temp.path().join("a/b/c/d/Report_final.doc"));
        touch(temp.path().join("a/b/unrelated.txt"));

        let walker = PathWalker::new(2).unwrap();
        let (results, summary) = walker.walk(&[temp.path().to_path_buf()], "report", 10);

        assert_eq!(results.len(), 2);
        assert!(results.contains(&shallow));
        assert!(results.contains(&deep));
        assert_eq!(summary.matches, 2);
        assert!(!summary.capped);
        assert_eq!(summary.dirs_scanned, 5);
    }

    #[test]
    fn directories_are_not_matches() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("reports")).unwrap();
        let inside = touch(temp.path().join("reports/q1_report.csv"));

        let walker = PathWalker::new(2).unwrap();
        let (results, _) = walker.walk(&[temp.path().to_path_buf()], "report", 10);

        assert_eq!(results.sorted(), vec![inside]);
    }

    #[test]
    fn cap_stops_the_walk() {
        let temp = TempDir::new().unwrap();
        for i in 0..50 {
            touch(temp.path().join(format!("dir{}/match{i}.txt", i % 5)));
        }

        let walker = PathWalker::new(1).unwrap();
        let (results, summary) = walker.walk(&[temp.path().to_path_buf()], "match", 10);

        // A single worker never races past the cap.
        assert_eq!(results.len(), 10);
        assert!(summary.capped);
    }

    #[test]
    fn concurrent_overshoot_is_bounded() {
        let temp = TempDir::new().unwrap();
        for i in 0..400 {
            touch(temp.path().join(format!("d{}/e{}/hit{i}.log", i % 20, i % 7)));
        }

        let threads = 4;
        let cap = 25;
        let walker = PathWalker::new(threads).unwrap();
        let (results, summary) = walker.walk(&[temp.path().to_path_buf()], "hit", cap);

        assert!(results.len() >= cap);
        assert!(results.len() <= cap + threads);
        assert!(summary.capped);
    }

    #[test]
    fn shares_cap_and_results_across_roots() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let a = touch(first.path().join("x/report.txt"));
        let b = touch(second.path().join("y/report_old.txt"));

        let walker = PathWalker::new(2).unwrap();
        let roots = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let (results, summary) = walker.walk(&roots, "report", 10);

        assert_eq!(summary.roots, 2);
        assert!(results.contains(&a));
        assert!(results.contains(&b));
    }

    #[test]
    fn overlapping_roots_are_deduplicated() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("desk");
        let file = touch(nested.join("plan.txt"));

        let walker = PathWalker::new(2).unwrap();
        let roots = vec![temp.path().to_path_buf(), nested];
        let (results, _) = walker.walk(&roots, "plan", 10);

        assert_eq!(results.sorted(), vec![file]);
    }

    #[test]
    fn nested_roots_are_enumerated_once() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        for i in 0..6 {
            touch(home.join(format!("user{i}/docs/file{i}.txt")));
        }
        touch(temp.path().join("etc/config.txt"));

        let walker = PathWalker::new(2).unwrap();
        let (_, alone) = walker.walk(&[temp.path().to_path_buf()], "file", 100);
        let (results, nested) = walker.walk(
            &[home.clone(), temp.path().to_path_buf(), home.join("user0")],
            "file",
            100,
        );

        assert_eq!(results.len(), 6);
        assert_eq!(nested.roots, 1);
        assert_eq!(nested.dirs_scanned, alone.dirs_scanned);
        // root, etc, home, and user/docs for each of the six users
        assert_eq!(alone.dirs_scanned, 3 + 6 * 2);
    }

    #[test]
    fn missing_root_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let file = touch(temp.path().join("notes.md"));

        let walker = PathWalker::new(2).unwrap();
        let roots = vec![
            elsewhere.path().join("does-not-exist"),
            temp.path().to_path_buf(),
        ];
        let (results, summary) = walker.walk(&roots, "notes", 10);

        assert_eq!(results.sorted(), vec![file]);
        assert_eq!(summary.errors, 1);
    }

    #[test]
    fn ignored_directories_are_skipped() {
        let temp = TempDir::new().unwrap();
        let kept = touch(temp.path().join("keep/todo.txt"));
        touch(temp.path().join("skip/todo.txt"));

        let walker = PathWalker::new(2)
            .unwrap()
            .with_ignored(vec![temp.path().join("skip")]);
        let (results, _) = walker.walk(&[temp.path().to_path_buf()], "todo", 10);

        assert_eq!(results.sorted(), vec![kept]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let file = touch(temp.path().join("BUDGET_2024.XLSX"));

        let walker = PathWalker::new(1).unwrap();
        let (results, _) = walker.walk(&[temp.path().to_path_buf()], "budget", 10);

        assert_eq!(results.sorted(), vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cycles_terminate() {
        let temp = TempDir::new().unwrap();
        let file = touch(temp.path().join("loop/cycle.txt"));
        std::os::unix::fs::symlink(temp.path(), temp.path().join("loop/back")).unwrap();

        let walker = PathWalker::new(2).unwrap();
        let (results, _) = walker.walk(&[temp.path().to_path_buf()], "cycle", 10);

        assert_eq!(results.sorted(), vec![file]);
    }
}
