//! Error types with fix suggestions

use std::path::PathBuf;
use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Errors raised while preprocessing a YAML tree.
///
/// Every variant except [`Setup`](PreprocessError::Setup) is file-scoped: it
/// aborts resolution of one top-level document and is recorded in the
/// [`Report`](crate::Report) while the run continues. `Setup` is run-scoped
/// and aborts the whole run before anything is wiped or written.
#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("YAML parse error in {file}: {source}", file = .file.display())]
    YamlParse {
        file: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("unresolved variable ${{{name}}} in {file}", file = .file.display())]
    UnresolvedVariable { name: String, file: PathBuf },

    #[error("circular inclusion: {}", format_chain(.chain))]
    CircularInclusion { chain: Vec<PathBuf> },

    #[error("include target {path} not found from {file}: {source}", path = .path.display(), file = .file.display())]
    IncludeNotFound {
        path: PathBuf,
        file: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid !include directive in {file}: {reason}", file = .file.display())]
    InvalidDirective { reason: String, file: PathBuf },

    #[error("run setup failed: {0}")]
    Setup(String),

    #[error("io error on {path}: {source}", path = .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl PreprocessError {
    /// Run-scoped errors abort the whole run; everything else is caught at
    /// the per-document boundary.
    pub fn is_run_scoped(&self) -> bool {
        matches!(self, PreprocessError::Setup(_))
    }
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl FixSuggestion for PreprocessError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            PreprocessError::YamlParse { .. } => Some("Check YAML syntax: indentation and quoting"),
            PreprocessError::UnresolvedVariable { .. } => {
                Some("Add the variable to the vars: mapping of the !include directive that pulls this file in")
            }
            PreprocessError::CircularInclusion { .. } => {
                Some("Break the include cycle - a file cannot include itself, directly or indirectly")
            }
            PreprocessError::IncludeNotFound { .. } => {
                Some("Include paths are relative to the including file's directory, not the input root")
            }
            PreprocessError::InvalidDirective { .. } => {
                Some("Use `!include path.yaml` or `!include {file: path.yaml, vars: {...}}` with scalar vars values")
            }
            PreprocessError::Setup(_) => Some("Check the input directory exists and both roots are writable"),
            PreprocessError::Io { .. } => Some("Check file path and permissions"),
        }
    }
}
