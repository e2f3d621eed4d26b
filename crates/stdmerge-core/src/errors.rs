//! Error types for the stdmerge core library.
//!
//! `MergeError` is fatal and aborts a run. Translation and external-service
//! failures have their own enums because they are always recovered from and
//! recorded as warnings instead of propagating.

use std::fmt;
use std::path::PathBuf;

/// Pipeline stage, used to name where a fatal error happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Config,
    Parse,
    Match,
    Rank,
    Extract,
    Strip,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Parse => "parse",
            Stage::Match => "match",
            Stage::Rank => "rank",
            Stage::Extract => "extract",
            Stage::Strip => "strip",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

/// Top-level error enum for the stdmerge core library.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("Parse error [{ecosystem}] {}: {reason}", path.display())]
    Parse {
        ecosystem: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Unsupported ecosystem: {ecosystem}")]
    UnsupportedEcosystem { ecosystem: String },

    #[error("Library [{ecosystem}] at {} contains no functions", path.display())]
    EmptyLibrary { ecosystem: String, path: PathBuf },

    #[error("Config error: {0}")]
    Config(String),

    #[error("{stage} stage failed for {input}: {source}")]
    Stage {
        stage: Stage,
        input: String,
        #[source]
        source: Box<MergeError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MergeError {
    /// Wrap this error with the stage and input that produced it.
    pub fn at(self, stage: Stage, input: impl Into<String>) -> Self {
        match self {
            already @ MergeError::Stage { .. } => already,
            other => MergeError::Stage {
                stage,
                input: input.into(),
                source: Box::new(other),
            },
        }
    }
}

pub type StdResult<T> = Result<T, MergeError>;

/// Why a pattern could not be translated into the target ecosystem.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslationError {
    #[error("no translator registered for {from} -> {to}")]
    Unavailable { from: String, to: String },

    #[error("translation failed: {0}")]
    Failed(String),
}

/// Failures of the optional external similarity service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("credential variable {0} is not set")]
    MissingCredential(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("similarity service disabled")]
    Disabled,
}
