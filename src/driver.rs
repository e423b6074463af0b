// src/driver.rs
//
// Two-pass scheduler. Pass 1 indexes every file into the shared
// metadata store (stubs first, then user code); after the barrier the
// store is frozen and pass 2 analyzes each file and collects reports.
// One file per worker; a panic inside a file walk becomes a single
// report for that file and does not poison the others.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::fs;
use std::hash::{Hash, Hasher};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use civet_linter::{
    builtin_function_overrides, index_file, lint_file, LinterConfig, Report, Rule, RuleError,
    Severity,
};
use civet_meta::{decode_file_meta, encode_file_meta, CacheError, MetadataStore};
use thiserror::Error;
use walkdir::WalkDir;

/// Recognized source-file extensions.
const SOURCE_EXTENSIONS: &[&str] = &["php", "inc", "phtml"];

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("could not read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bad rule on line {line}: {source}")]
    BadRule { line: usize, source: RuleError },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
pub struct DriverOptions {
    pub stubs_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub rules_file: Option<PathBuf>,
    /// 0 means "use available parallelism".
    pub workers: usize,
}

struct FileInfo {
    filename: String,
    contents: String,
}

/// Index and analyze the given paths, returning all reports. Reports
/// within one file keep traversal order; file order follows the
/// discovery order.
pub fn run_check(paths: &[PathBuf], options: &DriverOptions) -> Result<Vec<Report>, DriverError> {
    let store = MetadataStore::new();
    let config = build_config(options)?;
    let workers = worker_count(options);

    // Builtin return-type overrides ride along as a synthetic file.
    store.update_file_meta("<builtin>", &builtin_function_overrides());

    if let Some(stubs_dir) = &options.stubs_dir {
        let stubs = read_files(&[stubs_dir.clone()])?;
        tracing::debug!(files = stubs.len(), "indexing stubs");
        index_pass(&store, &config, &stubs, workers, None);
    }

    let files = read_files(paths)?;
    tracing::debug!(files = files.len(), workers, "indexing");
    index_pass(&store, &config, &files, workers, options.cache_dir.as_deref());

    store.set_indexing_complete(true);
    let stats = store.stats();
    tracing::debug!(
        classes = stats.classes,
        functions = stats.functions,
        constants = stats.constants,
        files = stats.files,
        "indexing complete"
    );
    if stats.duplicates > 0 {
        tracing::warn!(count = stats.duplicates, "duplicate symbol definitions");
    }

    tracing::debug!(files = files.len(), workers, "analyzing");
    let reports = analyze_pass(&store, &config, &files, workers);
    Ok(reports)
}

/// Pass 1 only: index the given paths into the cache directory.
pub fn run_index(
    paths: &[PathBuf],
    cache_dir: &Path,
    options: &DriverOptions,
) -> Result<usize, DriverError> {
    let store = MetadataStore::new();
    let config = build_config(options)?;
    let files = read_files(paths)?;
    index_pass(&store, &config, &files, worker_count(options), Some(cache_dir));
    Ok(files.len())
}

fn worker_count(options: &DriverOptions) -> usize {
    if options.workers > 0 {
        return options.workers;
    }
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn build_config(options: &DriverOptions) -> Result<LinterConfig, DriverError> {
    let mut config = LinterConfig::default();
    if let Some(rules_file) = &options.rules_file {
        let text = fs::read_to_string(rules_file).map_err(|source| DriverError::ReadFile {
            path: rules_file.clone(),
            source,
        })?;
        load_rules(&text, &mut config)?;
    }
    Ok(config)
}

/// Rule file format, one rule per line:
/// `name <TAB> severity <TAB> message <TAB> pattern`.
/// Empty lines and `#` comments are skipped.
fn load_rules(text: &str, config: &mut LinterConfig) -> Result<(), DriverError> {
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.splitn(4, '\t').collect();
        let [name, level, message, pattern] = parts.as_slice() else {
            return Err(DriverError::BadRule {
                line: idx + 1,
                source: RuleError::BadPattern(line.to_string()),
            });
        };
        let level = match level.to_ascii_lowercase().as_str() {
            "error" => Severity::Error,
            "warning" => Severity::Warning,
            "info" => Severity::Information,
            "maybe" => Severity::DoNotReject,
            other => {
                return Err(DriverError::BadRule {
                    line: idx + 1,
                    source: RuleError::BadSeverity(other.to_string()),
                })
            }
        };
        let rule = Rule::new(name, level, message, pattern).map_err(|source| {
            DriverError::BadRule {
                line: idx + 1,
                source,
            }
        })?;
        config.rules_any.add(rule);
    }
    Ok(())
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<FileInfo>, DriverError> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = entry.map_err(|e| DriverError::Io(e.into()))?;
                if entry.file_type().is_file() && is_source_file(entry.path()) {
                    out.push(read_file(entry.path())?);
                }
            }
        } else {
            out.push(read_file(path)?);
        }
    }
    Ok(out)
}

fn read_file(path: &Path) -> Result<FileInfo, DriverError> {
    let contents = fs::read_to_string(path).map_err(|source| DriverError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileInfo {
        filename: path.to_string_lossy().into_owned(),
        contents,
    })
}

/// Run `work` over the files with a fixed-size worker pool fed from a
/// shared queue. Results come back keyed by file index so the overall
/// order stays deterministic.
fn for_each_file<T: Send>(
    files: &[FileInfo],
    workers: usize,
    work: impl Fn(&FileInfo) -> T + Sync,
) -> Vec<T> {
    let queue: Mutex<VecDeque<usize>> = Mutex::new((0..files.len()).collect());
    let results: Mutex<Vec<(usize, T)>> = Mutex::new(Vec::with_capacity(files.len()));

    std::thread::scope(|scope| {
        for _ in 0..workers.max(1).min(files.len().max(1)) {
            scope.spawn(|| loop {
                let idx = {
                    let mut queue = queue.lock().expect("queue lock poisoned");
                    queue.pop_front()
                };
                let Some(idx) = idx else {
                    break;
                };
                let result = work(&files[idx]);
                results
                    .lock()
                    .expect("results lock poisoned")
                    .push((idx, result));
            });
        }
    });

    let mut results = results.into_inner().expect("results lock poisoned");
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, result)| result).collect()
}

fn index_pass(
    store: &MetadataStore,
    config: &LinterConfig,
    files: &[FileInfo],
    workers: usize,
    cache_dir: Option<&Path>,
) {
    let metas = for_each_file(files, workers, |file| {
        if let Some(cache_dir) = cache_dir {
            let cache_path = cache_path_for(cache_dir, &file.filename, &file.contents);
            if let Ok(bytes) = fs::read(&cache_path) {
                match decode_file_meta(&bytes) {
                    Ok(meta) => return meta,
                    Err(err @ CacheError::WrongVersion { .. }) => {
                        // Stale cache format: reparse, then rewrite.
                        tracing::debug!(file = %file.filename, %err, "cache version miss");
                    }
                    Err(err) => {
                        tracing::debug!(file = %file.filename, %err, "cache corrupt");
                    }
                }
            }
            let meta = index_file_guarded(store, config, file);
            if let Ok(bytes) = encode_file_meta(&meta) {
                if let Some(parent) = cache_path.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(err) = fs::write(&cache_path, bytes) {
                    tracing::warn!(file = %file.filename, %err, "cache write failed");
                }
            }
            meta
        } else {
            index_file_guarded(store, config, file)
        }
    });
    for (file, meta) in files.iter().zip(metas) {
        store.update_file_meta(&file.filename, &meta);
    }
}

/// Pass-1 indexing with panic containment: a file that blows up the
/// walker contributes nothing instead of taking the worker down.
fn index_file_guarded(
    store: &MetadataStore,
    config: &LinterConfig,
    file: &FileInfo,
) -> civet_meta::FileMeta {
    let result = catch_unwind(AssertUnwindSafe(|| {
        index_file(store, config, &file.filename, &file.contents)
    }));
    match result {
        Ok(meta) => meta,
        Err(payload) => {
            let message = panic_message(&payload);
            tracing::error!(file = %file.filename, message, "panic during indexing");
            civet_meta::FileMeta::default()
        }
    }
}

fn analyze_pass(
    store: &MetadataStore,
    config: &LinterConfig,
    files: &[FileInfo],
    workers: usize,
) -> Vec<Report> {
    let per_file = for_each_file(files, workers, |file| {
        let result = catch_unwind(AssertUnwindSafe(|| {
            lint_file(store, config, &file.filename, &file.contents)
        }));
        match result {
            Ok(reports) => reports,
            Err(payload) => {
                let message = panic_message(&payload);
                tracing::error!(file = %file.filename, message, "panic during analysis");
                vec![Report {
                    check_name: "syntax".to_string(),
                    level: Severity::Error,
                    filename: file.filename.clone(),
                    line: 1,
                    start_char: 0,
                    end_char: 0,
                    context_line: String::new(),
                    message: format!("panic while parsing {}: {}", file.filename, message),
                    is_disabled: false,
                }]
            }
        }
    });
    per_file.into_iter().flatten().collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Content-addressed cache path: the payload hash covers both the
/// file name and its contents, so an edit is automatically a miss.
fn cache_path_for(cache_dir: &Path, filename: &str, contents: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    filename.hash(&mut hasher);
    contents.hash(&mut hasher);
    let digest = hasher.finish();
    cache_dir.join(format!("{digest:016x}.meta"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_rules_parses_lines() {
        let mut config = LinterConfig::default();
        let text = "# comment\nsleepArg\twarning\tdo not sleep\tsleep($x)\n";
        load_rules(text, &mut config).unwrap();
        assert!(!config.rules_any.is_empty());
    }

    #[test]
    fn load_rules_rejects_bad_severity() {
        let mut config = LinterConfig::default();
        let text = "r\tfatal\tmsg\tsleep($x)\n";
        assert!(load_rules(text, &mut config).is_err());
    }

    #[test]
    fn cache_path_changes_with_contents() {
        let dir = Path::new("/tmp/cache");
        let a = cache_path_for(dir, "a.php", "one");
        let b = cache_path_for(dir, "a.php", "two");
        assert_ne!(a, b);
    }
}
