//! Unified error handling for the OmniFocus bridge
//!
//! Every failure the bridge can surface is one of a small set of kinds.
//! The executor is the only place subprocess failures are classified; the
//! client forwards errors unchanged and the MCP layer renders them.

use std::fmt;
use thiserror::Error;

/// Maximum number of characters of raw output kept in a parse error.
pub const PARSE_PREVIEW_CHARS: usize = 200;

/// Main error type for the bridge
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// OmniFocus is not running (AppleEvent error -600)
    #[error("OmniFocus is not running. Launch OmniFocus and try again.")]
    NotRunning,

    /// The calling process may not send Apple Events to OmniFocus (-1743)
    #[error("Permission denied: this process is not authorized to automate OmniFocus. Grant access in System Settings > Privacy & Security > Automation.")]
    PermissionDenied,

    /// The script was killed after exceeding the executor timeout
    #[error("OmniFocus script timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Any other script failure; carries the raw diagnostic text
    #[error("{message}")]
    Script { message: String },

    /// The script output was not the JSON we expected
    #[error("Failed to parse OmniFocus response as JSON ({message}): {preview}")]
    Parse { message: String, preview: String },

    /// Arguments rejected before any script was built or run
    #[error("Invalid argument `{field}`: {message}")]
    InvalidArgument { field: String, message: String },
}

/// Error kinds, stable across message wording changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotRunning,
    PermissionDenied,
    Timeout,
    ScriptError,
    ParseError,
    InvalidArgument,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotRunning => "not_running",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ScriptError => "script_error",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::InvalidArgument => "invalid_argument",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::NotRunning => ErrorKind::NotRunning,
            BridgeError::PermissionDenied => ErrorKind::PermissionDenied,
            BridgeError::Timeout { .. } => ErrorKind::Timeout,
            BridgeError::Script { .. } => ErrorKind::ScriptError,
            BridgeError::Parse { .. } => ErrorKind::ParseError,
            BridgeError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Whether the same call could succeed later without changing arguments.
    ///
    /// Informational only: nothing in the bridge retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::NotRunning | BridgeError::Timeout { .. })
    }

    /// Text shown to MCP clients. The leading kind code keeps the error
    /// kind recognizable after rendering.
    pub fn user_message(&self) -> String {
        format!("[{}] {}", self.kind(), self)
    }

    pub fn script(message: impl Into<String>) -> Self {
        BridgeError::Script {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>, raw: &str) -> Self {
        BridgeError::Parse {
            message: message.into(),
            preview: preview(raw),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Char-boundary safe prefix of `raw`, at most [`PARSE_PREVIEW_CHARS`] chars.
pub fn preview(raw: &str) -> String {
    match raw.char_indices().nth(PARSE_PREVIEW_CHARS) {
        Some((idx, _)) => raw[..idx].to_string(),
        None => raw.to_string(),
    }
}

/// Result type alias for convenience
pub type BridgeResult<T> = Result<T, BridgeError>;
