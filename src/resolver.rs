//! Recursive include resolution
//!
//! Walks a document tree depth-first, splicing every `!include` directive
//! with the fully resolved content of the file it references. Each included
//! file is resolved against the bindings written at its own call site only;
//! an ancestor's bindings never leak down the chain. Cycle detection uses an
//! explicit stack of canonical paths threaded through the walk, so a
//! self-including file fails with a readable chain instead of overflowing
//! the call stack.

use crate::document::{self, IncludeDirective};
use crate::error::PreprocessError;
use crate::substitute::{substitute, Bindings};
use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-top-level-document resolution state.
#[derive(Debug)]
pub struct ResolveContext {
    /// File currently being resolved (for error reporting).
    file: PathBuf,
    /// Directory of `file`; include paths are resolved against it.
    dir: PathBuf,
    /// Canonical paths of every file currently being expanded, outermost
    /// first. A path appearing twice is a cycle.
    stack: Vec<PathBuf>,
}

impl ResolveContext {
    /// Start resolution of a top-level document at `file` (canonical path).
    pub fn new(file: PathBuf) -> Self {
        let dir = file.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            stack: vec![file.clone()],
            file,
            dir,
        }
    }
}

/// Resolve `value` depth-first, substituting placeholders from `bindings`
/// and splicing every include directive in place.
pub fn resolve(
    value: &Value,
    bindings: &Bindings,
    ctx: &mut ResolveContext,
) -> Result<Value, PreprocessError> {
    match value {
        Value::Mapping(map) => {
            let mut out = serde_yaml::Mapping::with_capacity(map.len());
            for (key, child) in map {
                // Keys are structural, not substitution targets.
                out.insert(key.clone(), resolve(child, bindings, ctx)?);
            }
            Ok(Value::Mapping(out))
        }
        Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for child in seq {
                out.push(resolve(child, bindings, ctx)?);
            }
            Ok(Value::Sequence(out))
        }
        Value::String(text) => Ok(Value::String(substitute(text, bindings, &ctx.file)?)),
        Value::Tagged(tagged) => resolve_tagged(tagged, bindings, ctx),
        // Numbers, booleans, and nulls are never scanned.
        other => Ok(other.clone()),
    }
}

fn resolve_tagged(
    tagged: &TaggedValue,
    bindings: &Bindings,
    ctx: &mut ResolveContext,
) -> Result<Value, PreprocessError> {
    match IncludeDirective::from_tagged(tagged, &ctx.file) {
        Some(directive) => expand_include(&directive?, ctx),
        // Unknown tags are opaque: keep the tag, but still resolve the
        // payload so placeholders and nested includes inside it work.
        None => {
            let value = resolve(&tagged.value, bindings, ctx)?;
            Ok(Value::Tagged(Box::new(TaggedValue {
                tag: tagged.tag.clone(),
                value,
            })))
        }
    }
}

/// Load, resolve, and splice the file referenced by an include directive.
fn expand_include(
    directive: &IncludeDirective,
    ctx: &mut ResolveContext,
) -> Result<Value, PreprocessError> {
    let target = ctx.dir.join(&directive.file);
    let canonical = fs::canonicalize(&target).map_err(|source| {
        PreprocessError::IncludeNotFound {
            path: target.clone(),
            file: ctx.file.clone(),
            source,
        }
    })?;

    if ctx.stack.contains(&canonical) {
        let mut chain = ctx.stack.clone();
        chain.push(canonical);
        return Err(PreprocessError::CircularInclusion { chain });
    }

    debug!(include = %canonical.display(), from = %ctx.file.display(), "expanding include");

    let text = fs::read_to_string(&canonical).map_err(|source| {
        PreprocessError::IncludeNotFound {
            path: canonical.clone(),
            file: ctx.file.clone(),
            source,
        }
    })?;
    let doc = document::parse_str(&text, &canonical)?;

    // Enter the included file: its own directory and its own bindings.
    let saved_file = std::mem::replace(&mut ctx.file, canonical.clone());
    let saved_dir = std::mem::replace(
        &mut ctx.dir,
        canonical.parent().map(Path::to_path_buf).unwrap_or_default(),
    );
    ctx.stack.push(canonical);

    let resolved = resolve(&doc, &directive.vars, ctx);

    ctx.stack.pop();
    ctx.file = saved_file;
    ctx.dir = saved_dir;

    resolved
}
