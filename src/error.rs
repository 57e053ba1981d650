//! Error types for CUE generation

use thiserror::Error;

use crate::cue::ParseError;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, CuegenError>;

/// Generation errors
///
/// Every variant is fatal for the service being generated: generation is a
/// pure function of the schema, so nothing here is worth retrying.
#[derive(Error, Debug)]
pub enum CuegenError {
    #[error("Unresolved type: no declaration with id {id}")]
    UnresolvedDecl { id: u32 },

    #[error("Unresolved type parameter {index} in declaration {decl}")]
    UnboundTypeParam { decl: String, index: usize },

    #[error("Type argument count mismatch for {decl}: expected {expected}, got {actual}")]
    TypeArgCount { decl: String, expected: usize, actual: usize },

    #[error("Config type {name} is not a struct")]
    NotAStruct { name: String },

    #[error("Malformed cue annotation on field {field}: {fragment:?}: {source}")]
    MalformedAnnotation {
        field: String,
        fragment: String,
        #[source]
        source: ParseError,
    },

    #[error("Cyclic declarations: {}", .members.join(" -> "))]
    Cycle { members: Vec<String> },

    #[error("Duplicate declaration id {0}")]
    DuplicateDecl(u32),

    #[error("Unknown service: {0}")]
    UnknownService(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
