use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollateError>;

/// Failures that abort a collation run.
#[derive(Debug, Error)]
pub enum CollateError {
    /// A particle record is short or its weight is not a usable log-weight.
    #[error("{source_name}:{line}: {reason}")]
    Parse {
        source_name: String,
        line: u64,
        reason: String,
    },
    /// Log-space arithmetic over an empty or massless collection.
    #[error("domain error: {0}")]
    Domain(String),
    /// The input stream failed while being read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CollateError {
    pub(crate) fn parse(source_name: &str, line: u64, reason: impl Into<String>) -> Self {
        CollateError::Parse {
            source_name: source_name.to_string(),
            line,
            reason: reason.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, CollateError::Parse { .. })
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, CollateError::Domain(_))
    }
}
