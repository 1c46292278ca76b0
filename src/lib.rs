//! yamlpp - YAML preprocessor with include resolution and variable substitution
//!
//! Resolves `!include` directives (file reference plus per-call-site
//! variable bindings) across a tree of YAML documents and regenerates a
//! mirrored output tree with every directive spliced and every `${name}`
//! placeholder substituted.

pub mod document;
pub mod error;
pub mod processor;
pub mod resolver;
pub mod substitute;

pub use document::IncludeDirective;
pub use error::{FixSuggestion, PreprocessError};
pub use processor::{check, run, Failure, Report};
pub use resolver::ResolveContext;
pub use substitute::Bindings;
