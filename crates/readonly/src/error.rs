//! Guard errors
//!
//! Only two things can go wrong inside the guard: the settings document is
//! unusable, or something unexpected happened while evaluating. Neither ever
//! reaches a hooked command; `Guard::evaluate` turns both into an allow.

use std::path::PathBuf;
use thiserror::Error;

/// Guard-specific errors
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Settings unavailable at {}: {source}", .path.display())]
    ConfigUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Internal fault: {0}")]
    InternalFault(String),
}

impl GuardError {
    pub fn config(path: impl Into<PathBuf>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::ConfigUnavailable {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl From<regex::Error> for GuardError {
    fn from(err: regex::Error) -> Self {
        Self::InternalFault(format!("invalid command pattern: {}", err))
    }
}

pub type GuardResult<T> = std::result::Result<T, GuardError>;
