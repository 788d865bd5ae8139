//! Error types for port operations.

use std::time::Duration;

use buttonburgh_domain::DispatchMode;

/// Longest slice of an error body kept in a `RemoteDispatchError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Startup/configuration failures. Fatal: the affected mode cannot serve.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    /// The fixture resource could not be located.
    #[error("Fixture resource not found: {path}")]
    FixtureMissing { path: String },

    /// The fixture resource exists but could not be read.
    #[error("Fixture resource {path} could not be read: {reason}")]
    FixtureUnreadable { path: String, reason: String },

    /// The fixture resource is not a valid fixture document.
    #[error("Fixture resource {path} is malformed: {reason}")]
    FixtureMalformed { path: String, reason: String },

    /// The fixture resource parsed but holds no fixtures.
    #[error("Fixture resource {path} contains no fixtures")]
    FixtureEmpty { path: String },

    /// A required setting was not supplied.
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    /// A setting was supplied but could not be used.
    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    /// No client was configured for the requested mode.
    #[error("No dispatch client configured for {0} mode")]
    ModeUnavailable(DispatchMode),
}

impl ConfigurationError {
    pub fn invalid(name: &'static str, reason: impl ToString) -> Self {
        Self::InvalidSetting {
            name,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::FixtureMalformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Live-mode failures talking to the generative-text API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteDispatchError {
    /// The endpoint answered with a non-success status.
    #[error("Remote dispatch failed with HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered 2xx but produced no candidates.
    #[error("Remote dispatch failed: no candidates returned")]
    NoCandidates,

    /// The candidate (or the body around it) was not a narrative event.
    #[error("Remote dispatch failed: malformed payload: {0}")]
    MalformedPayload(String),

    /// The request never got a response (DNS, connection reset, ...).
    #[error("Remote dispatch request failed: {0}")]
    Transport(String),

    /// The per-call timeout elapsed.
    #[error("Remote dispatch timed out after {0:?}")]
    Timeout(Duration),
}

impl RemoteDispatchError {
    /// Create a Status error, keeping only the head of a long body.
    pub fn status(status: u16, body: impl AsRef<str>) -> Self {
        let body: String = body.as_ref().chars().take(MAX_ERROR_BODY_CHARS).collect();
        Self::Status { status, body }
    }

    pub fn malformed(reason: impl ToString) -> Self {
        Self::MalformedPayload(reason.to_string())
    }

    /// HTTP status code, when the failure was a status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Any failure surfaced by a dispatch client or the dispatch service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectorError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Remote(#[from] RemoteDispatchError),
}

impl DirectorError {
    /// True when the failure came from the remote API rather than local setup.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Observer failures. Logged by the dispatch service, never propagated.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ObserverError {
    #[error("Dispatch observer failed: {0}")]
    Failed(String),
}
