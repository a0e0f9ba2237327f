use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors surfaced by the library.
///
/// Resolution gaps and per-file parse failures never appear here: the first
/// are `LiteralValue::Unknown`, the second are recorded as inventory warnings.
#[derive(Debug, Error)]
pub enum AibomError {
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("tree-sitter language error: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("malformed inventory: {0}")]
    Format(String),

    #[error("inventory failed schema validation:\n{0}")]
    Validation(ValidationErrors),

    #[error("unknown drift kind '{0}'")]
    UnknownDriftKind(String),

    #[error("artifact '{name}' is unreadable: {source}")]
    Artifact {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact name '{0}'")]
    ArtifactName(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl AibomError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AibomError>;
