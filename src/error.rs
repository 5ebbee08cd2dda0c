//! Error types and exit codes for uplift-engine

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for uplift-engine operations
///
/// `Parse`, `Classification`, `RouteCollision` and `Generation` are
/// recoverable inside the pipeline: they degrade a single unit or file into
/// diagnostics and the run continues. The remaining variants abort the run.
#[derive(Error, Debug)]
pub enum UpliftError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Project is empty: no JavaScript sources to migrate")]
    EmptyProject,

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Risk classification failed for unit '{unit}': {message}")]
    Classification { unit: String, message: String },

    #[error("Route pattern collision: '{pattern}' declared more than once")]
    RouteCollision { pattern: String },

    #[error("Code generation failed for unit '{unit}': {message}")]
    Generation { unit: String, message: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Invalid decision transition: {from} -> {to}")]
    DecisionTransition { from: String, to: String },

    #[error("Session has {pending} pending artifact(s); review them or commit with force")]
    PendingDecisions { pending: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpliftError {
    /// Convert error to an exit code:
    /// - 0: success
    /// - 2: usage / configuration error
    /// - 3: empty project
    /// - 4: file not found / IO error
    /// - 10: internal failure surfaced at run level
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config { .. } => ExitCode::from(2),
            Self::EmptyProject => ExitCode::from(3),
            Self::FileNotFound { .. } => ExitCode::from(4),
            Self::Io(_) => ExitCode::from(4),
            Self::Parse { .. } => ExitCode::from(10),
            Self::Classification { .. } => ExitCode::from(10),
            Self::RouteCollision { .. } => ExitCode::from(10),
            Self::Generation { .. } => ExitCode::from(10),
            Self::DecisionTransition { .. } => ExitCode::from(10),
            Self::PendingDecisions { .. } => ExitCode::from(10),
        }
    }
}

/// Result type alias for uplift-engine operations
pub type Result<T> = std::result::Result<T, UpliftError>;
