//! Error types for sweep configuration and enumeration.

use std::fmt;
use std::path::PathBuf;

/// Errors that abort a sweep before any job is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    /// The configuration is structurally unusable.
    InvalidConfig(String),

    /// A directory the sweep needs already exists as something else.
    NotADirectory(PathBuf),

    /// No built-in preset has this name.
    UnknownPreset(String),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "Invalid sweep configuration: {}", msg),
            Self::NotADirectory(path) => {
                write!(f, "Path exists but is not a directory: {}", path.display())
            }
            Self::UnknownPreset(name) => write!(f, "Unknown preset: {}", name),
        }
    }
}

impl std::error::Error for SweepError {}

/// Result type for sweep operations.
pub type SweepResult<T> = Result<T, SweepError>;

impl SweepError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
