//! YAML document parsing, serialization, and the `!include` directive shape
//!
//! Documents are plain [`serde_yaml::Value`] trees; mappings keep insertion
//! order, so serialization preserves the author's key order. The include
//! directive is the `!include` tag in one of two forms:
//!
//! ```yaml
//! automation: !include automations.yaml
//!
//! script: !include
//!   file: scripts.yaml
//!   vars:
//!     greeting: "Hello World"
//! ```
//!
//! Any other tag is opaque: it is carried through to the output verbatim.

use crate::error::PreprocessError;
use crate::substitute::Bindings;
use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Tag that marks an include directive.
pub const INCLUDE_TAG: &str = "include";

/// Parse one file's text into a document tree.
pub fn parse_str(text: &str, file: &Path) -> Result<Value, PreprocessError> {
    // An empty file is a null document, same as PyYAML's safe_load("").
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).map_err(|source| PreprocessError::YamlParse {
        file: file.to_path_buf(),
        source,
    })
}

/// Serialize a resolved document back to YAML text.
pub fn to_string(doc: &Value, file: &Path) -> Result<String, PreprocessError> {
    serde_yaml::to_string(doc).map_err(|source| PreprocessError::YamlParse {
        file: file.to_path_buf(),
        source,
    })
}

/// A parsed `!include` directive: the referenced file and the variable
/// bindings its placeholders are resolved against.
#[derive(Debug)]
pub struct IncludeDirective {
    /// Path relative to the directory of the file the directive occurs in.
    pub file: PathBuf,
    pub vars: Bindings,
}

impl IncludeDirective {
    /// Interpret a tagged node as an include directive.
    ///
    /// Returns `None` when the tag is not `!include` (the node is some other
    /// opaque tag), `Some(Err(..))` when it is `!include` but malformed.
    pub fn from_tagged(
        tagged: &TaggedValue,
        in_file: &Path,
    ) -> Option<Result<Self, PreprocessError>> {
        if tagged.tag != INCLUDE_TAG {
            return None;
        }
        Some(Self::parse_payload(&tagged.value, in_file))
    }

    fn parse_payload(payload: &Value, in_file: &Path) -> Result<Self, PreprocessError> {
        let invalid = |reason: String| PreprocessError::InvalidDirective {
            reason,
            file: in_file.to_path_buf(),
        };

        match payload {
            // Scalar form: `!include file.yaml`, no bindings.
            Value::String(file) if !file.is_empty() => Ok(Self {
                file: PathBuf::from(file),
                vars: Bindings::empty(),
            }),
            // Mapping form: `!include {file: ..., vars: {...}}`.
            Value::Mapping(map) => {
                let file = match map.get("file") {
                    Some(Value::String(file)) if !file.is_empty() => PathBuf::from(file),
                    Some(other) => {
                        return Err(invalid(format!("file path must be a string, got `{other:?}`")))
                    }
                    None => return Err(invalid("'file' key is required".to_string())),
                };
                let vars = match map.get("vars") {
                    Some(Value::Mapping(vars)) => Bindings::from_mapping(vars, in_file)?,
                    Some(Value::Null) | None => Bindings::empty(),
                    Some(other) => {
                        return Err(invalid(format!("vars must be a mapping, got `{other:?}`")))
                    }
                };
                Ok(Self { file, vars })
            }
            _ => Err(invalid("payload must be a file path or a {file, vars} mapping".to_string())),
        }
    }
}
