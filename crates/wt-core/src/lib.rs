//! Shared primitives used across WebTracker crates.

use core::fmt;

/// Result alias used across the workspace.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Workspace-wide error carrying a dotted machine code and a human message.
///
/// Codes are grouped by the crate that raises them (`url.*`, `storage.*`,
/// `ipc.*`, `check.*`, `config.*`) so callers can branch on a failure class
/// without matching on message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerError {
    pub code: &'static str,
    pub message: String,
}

impl TrackerError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TrackerError {}
