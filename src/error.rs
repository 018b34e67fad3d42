//! Error types for the schema compiler

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;

/// Schema compiler errors
///
/// Structural mismatches and type-path failures are internal contract
/// violations: they abort the generation run because they indicate a bug in
/// the compiler's own naming or derivation logic. Extra-type collisions are
/// configuration errors the provider author can fix by renaming.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("structural mismatch for token {token}: {detail}")]
    StructuralMismatch { token: String, detail: String },

    #[error("extra type collides with a derived token: {token}")]
    ExtraTypeCollision { token: String },

    #[error("invalid type path {path}: {detail}")]
    InvalidTypePath { path: String, detail: String },

    #[error("invalid token '{token}': {detail}")]
    InvalidToken { token: String, detail: String },

    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("invalid package version: {0}")]
    Version(#[from] semver::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
