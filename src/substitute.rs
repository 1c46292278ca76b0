//! `${name}` placeholder substitution for string scalars
//!
//! Placeholders are replaced in a single left-to-right pass and never
//! re-scanned, so a bound value containing `${...}` is inserted as literal
//! text. Anything that is not `${identifier}` passes through untouched,
//! which keeps downstream templating syntax (`{{ ... }}`, `{% ... %}`)
//! intact.

use crate::error::PreprocessError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::Path;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Variable bindings supplied by a single `!include` call site.
///
/// Bindings are scoped to exactly one include hop: the placeholders of a
/// file are satisfied solely by the `vars` of the directive that pulled it
/// in, never by an ancestor's bindings.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    /// The empty binding set used for every top-level document.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build bindings from the `vars` mapping of an `!include` directive.
    ///
    /// Values must be scalars; they are coerced to their string form here,
    /// once, rather than at each substitution site.
    pub fn from_mapping(
        vars: &serde_yaml::Mapping,
        file: &Path,
    ) -> Result<Self, PreprocessError> {
        let mut values = HashMap::with_capacity(vars.len());
        for (key, value) in vars {
            let name = key.as_str().ok_or_else(|| PreprocessError::InvalidDirective {
                reason: format!("vars key must be a string, got `{key:?}`"),
                file: file.to_path_buf(),
            })?;
            let coerced = scalar_to_string(value).ok_or_else(|| {
                PreprocessError::InvalidDirective {
                    reason: format!("vars value for `{name}` must be a scalar"),
                    file: file.to_path_buf(),
                }
            })?;
            values.insert(name.to_string(), coerced);
        }
        Ok(Self { values })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// String form of a scalar binding value; `None` for non-scalars.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

/// Replace every `${identifier}` in `text` with its bound value.
///
/// An identifier with no binding in scope is a hard error naming the
/// variable and the file it occurred in; placeholders are never silently
/// left behind or replaced with an empty default.
pub fn substitute(
    text: &str,
    bindings: &Bindings,
    file: &Path,
) -> Result<String, PreprocessError> {
    // Fast path: most scalars contain no placeholder at all.
    if !text.contains("${") {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let name = &caps[1];
        match bindings.get(name) {
            Some(value) => {
                out.push_str(&text[last..whole.start()]);
                out.push_str(value);
                last = whole.end();
            }
            None => {
                return Err(PreprocessError::UnresolvedVariable {
                    name: name.to_string(),
                    file: file.to_path_buf(),
                })
            }
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}
