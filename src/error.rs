//! Reproducibility error types

use thiserror::Error;

/// Errors from persisting reproducibility settings
///
/// Evaluation has no error type of its own: batch-source errors propagate
/// through `estimate_ce_losses` generically, without translation.
#[derive(Debug, Error)]
pub enum ReproError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for reproducibility operations
pub type Result<T> = std::result::Result<T, ReproError>;
