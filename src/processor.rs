//! Tree walker and output writer
//!
//! Drives a full preprocessing run: wipes and recreates the output root,
//! enumerates documents under the input root, resolves each one through the
//! include resolver, and mirrors the results (plus any non-YAML files,
//! copied through unchanged) into the output tree.
//!
//! The output tree is never patched incrementally; it always reflects
//! exactly the most recent successful run.

use crate::document;
use crate::error::PreprocessError;
use crate::resolver::{self, ResolveContext};
use crate::substitute::Bindings;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Comment prepended to every generated YAML file.
pub const AUTO_GENERATED_WARNING: &str =
    "# WARNING: This file is auto-generated. Do not modify this file directly.\n\
     # Please edit the corresponding file in the input directory.\n\n";

/// Contents of the README.md dropped into the output root.
pub const README_CONTENT: &str =
    "WARNING: This directory is wiped and regenerated entirely during each \
     processing run.\nDo not modify the contents directly. Edit files in the \
     input directory instead.\n";

/// One failed file: its path relative to the input root and what went wrong.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: PreprocessError,
}

/// Outcome of one preprocessing run.
///
/// `processed` counts YAML documents examined, `succeeded` those written
/// (or, for [`check`], fully resolved), `copied` non-YAML files mirrored
/// through. A run with any failure is failed overall, but files that did
/// resolve stay written.
#[derive(Debug, Default)]
pub struct Report {
    pub processed: usize,
    pub succeeded: usize,
    pub copied: usize,
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, path: &Path, error: PreprocessError) {
        warn!(file = %path.display(), %error, "document failed");
        self.failures.push(Failure {
            path: path.to_path_buf(),
            error,
        });
    }
}

/// Per-output-root run locks. Two concurrent runs against the same output
/// root must not interleave the wipe step with each other's writes.
static RUN_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn run_lock(output_root: &Path) -> Result<Arc<Mutex<()>>, PreprocessError> {
    let key = if output_root.is_absolute() {
        output_root.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| PreprocessError::Setup(format!("cannot determine working directory: {e}")))?
            .join(output_root)
    };
    let mut locks = RUN_LOCKS.lock().unwrap_or_else(|e| e.into_inner());
    Ok(Arc::clone(locks.entry(key).or_default()))
}

/// A path segment starting with `.` is private: excluded from enumeration,
/// but still reachable as an include target.
fn is_private(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
}

fn check_input_root(input_root: &Path) -> Result<(), PreprocessError> {
    if !input_root.is_dir() {
        return Err(PreprocessError::Setup(format!(
            "input root {} is not a readable directory",
            input_root.display()
        )));
    }
    // Probe readability now, before anything destructive happens.
    fs::read_dir(input_root).map_err(|e| {
        PreprocessError::Setup(format!(
            "input root {} is not readable: {e}",
            input_root.display()
        ))
    })?;
    Ok(())
}

/// Preprocess every document under `input_root` into `output_root`.
///
/// The output root is deleted and recreated wholesale; stale files from
/// earlier runs never survive. Per-file failures are accumulated in the
/// returned [`Report`] without stopping the run; only setup failures
/// (missing input root, output root that cannot be wiped or recreated)
/// abort the run as a whole, and they do so before anything is destroyed.
pub fn run(input_root: &Path, output_root: &Path) -> Result<Report, PreprocessError> {
    check_input_root(input_root)?;

    let lock = run_lock(output_root)?;
    let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

    if output_root.exists() {
        debug!(output = %output_root.display(), "wiping output root");
        fs::remove_dir_all(output_root).map_err(|e| {
            PreprocessError::Setup(format!(
                "cannot wipe output root {}: {e}",
                output_root.display()
            ))
        })?;
    }
    fs::create_dir_all(output_root).map_err(|e| {
        PreprocessError::Setup(format!(
            "cannot create output root {}: {e}",
            output_root.display()
        ))
    })?;

    let mut report = Report::default();
    for entry in walk(input_root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| input_root.to_path_buf());
                report.record(&path, PreprocessError::Io { path: path.clone(), source: err.into() });
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(input_root)
            .unwrap_or_else(|_| entry.path());
        let dest = output_root.join(rel);

        if is_yaml(entry.path()) {
            report.processed += 1;
            debug!(file = %rel.display(), "processing document");
            match process_document(entry.path()).and_then(|text| write_output(&dest, &text)) {
                Ok(()) => report.succeeded += 1,
                Err(error) => report.record(rel, error),
            }
        } else {
            match copy_through(entry.path(), &dest) {
                Ok(()) => report.copied += 1,
                Err(error) => report.record(rel, error),
            }
        }
    }

    // Written last so it wins over any README.md copied from the input tree.
    if let Err(e) = fs::write(output_root.join("README.md"), README_CONTENT) {
        warn!(output = %output_root.display(), "failed to create README.md: {e}");
    }

    info!(
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed(),
        copied = report.copied,
        "run complete"
    );
    Ok(report)
}

/// Resolve every document under `input_root` without writing anything.
///
/// Dry-run counterpart of [`run`]: same enumeration, same resolution, no
/// output mutation at all.
pub fn check(input_root: &Path) -> Result<Report, PreprocessError> {
    check_input_root(input_root)?;

    let mut report = Report::default();
    for entry in walk(input_root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| input_root.to_path_buf());
                report.record(&path, PreprocessError::Io { path: path.clone(), source: err.into() });
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_yaml(entry.path()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(input_root)
            .unwrap_or_else(|_| entry.path());
        report.processed += 1;
        match process_document(entry.path()) {
            Ok(_) => report.succeeded += 1,
            Err(error) => report.record(rel, error),
        }
    }
    Ok(report)
}

fn walk(input_root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(input_root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_private(e))
}

/// Fully resolve one top-level document and serialize it, banner included.
fn process_document(path: &Path) -> Result<String, PreprocessError> {
    let canonical = fs::canonicalize(path).map_err(|source| PreprocessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = fs::read_to_string(&canonical).map_err(|source| PreprocessError::Io {
        path: canonical.clone(),
        source,
    })?;
    let doc = document::parse_str(&text, &canonical)?;

    // Top-level documents receive no bindings; only nested includes do.
    let mut ctx = ResolveContext::new(canonical.clone());
    let resolved = resolver::resolve(&doc, &Bindings::empty(), &mut ctx)?;

    let yaml = document::to_string(&resolved, &canonical)?;
    Ok(format!("{AUTO_GENERATED_WARNING}{yaml}"))
}

fn write_output(dest: &Path, text: &str) -> Result<(), PreprocessError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| PreprocessError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(dest, text).map_err(|source| PreprocessError::Io {
        path: dest.to_path_buf(),
        source,
    })
}

fn copy_through(src: &Path, dest: &Path) -> Result<(), PreprocessError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| PreprocessError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::copy(src, dest).map(|_| ()).map_err(|source| PreprocessError::Io {
        path: dest.to_path_buf(),
        source,
    })
}
