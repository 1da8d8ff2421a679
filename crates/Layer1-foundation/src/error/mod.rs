//! Error types for Warden
//!
//! Every error the engine can surface lives here so that callers can match
//! on one enum regardless of which layer produced the failure.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Warden error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation (pre-execution, fatal)
    // ========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid environment variable format '{0}': expected name=SOURCE")]
    EnvFormat(String),

    // ========================================================================
    // Path resolution
    // ========================================================================
    #[error("Failed to resolve command '{name}': {message}")]
    PathResolution { name: String, message: String },

    // ========================================================================
    // Risk policy
    // ========================================================================
    #[error("Security violation: command '{command}' risk level {risk} exceeds maximum allowed {max}")]
    SecurityViolation {
        command: String,
        risk: String,
        max: String,
    },

    // ========================================================================
    // Ledger tokens (programming-contract violations, never swallowed)
    // ========================================================================
    #[error("Invalid command token: {0}")]
    InvalidToken(String),

    #[error("Token index {index} out of range (ledger holds {len} entries)")]
    TokenOutOfRange { index: usize, len: usize },

    #[error("Ledger entry kind mismatch: expected {expected}, found {actual}")]
    WrongEntryKind { expected: String, actual: String },

    #[error("Debug info already attached to entry at index {0}")]
    DuplicateDebugInfo(usize),

    // ========================================================================
    // Collaborators
    // ========================================================================
    #[error("Required collaborator not configured: {0}")]
    CollaboratorMissing(String),

    #[error("Privileged execution is not supported: {0}")]
    PrivilegeUnsupported(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Notification error: {0}")]
    Notification(String),

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // External error conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Misc
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the fail-closed refusal raised by the real executor.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, Error::SecurityViolation { .. })
    }

    /// True for ledger token contract violations.
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidToken(_)
                | Error::TokenOutOfRange { .. }
                | Error::WrongEntryKind { .. }
                | Error::DuplicateDebugInfo(_)
        )
    }

    /// True for errors raised before any classification or ledger write.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::EnvFormat(_))
    }

    /// Path resolution error helper
    pub fn path_resolution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PathResolution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Security violation helper
    pub fn security_violation(
        command: impl Into<String>,
        risk: impl Into<String>,
        max: impl Into<String>,
    ) -> Self {
        Error::SecurityViolation {
            command: command.into(),
            risk: risk.into(),
            max: max.into(),
        }
    }
}

// ============================================================================
// From impls (additional conversions)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
