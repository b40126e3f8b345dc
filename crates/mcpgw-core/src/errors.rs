//! Error taxonomy for gateway operations.
//!
//! Every variant maps to an HTTP status and a stable wire code. Errors fall
//! into three groups:
//!
//! - **Client input**: unknown backend or session, duplicate name, bad input
//! - **Upstream**: the backend answered with a failure status, or could not
//!   be reached at all
//! - **Internal**: anything else
//!
//! Cancellation is deliberately absent: a torn-down session is not an error
//! and never surfaces through this type.

use thiserror::Error;

/// Error codes written into JSON error bodies.
pub mod codes {
    /// A backend with this name is already registered.
    pub const DUPLICATE_NAME: &str = "DUPLICATE_NAME";
    /// No backend with this name is registered.
    pub const BACKEND_NOT_FOUND: &str = "BACKEND_NOT_FOUND";
    /// No session with this ID exists.
    pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
    /// Another client is already draining this session's stream.
    pub const SESSION_BUSY: &str = "SESSION_BUSY";
    /// A request field is missing or malformed.
    pub const INVALID_INPUT: &str = "INVALID_INPUT";
    /// The forwarded method is not one the backend exposes.
    pub const INVALID_METHOD: &str = "INVALID_METHOD";
    /// The backend answered with an error status.
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    /// The backend could not be reached or returned garbage.
    pub const UPSTREAM_UNAVAILABLE: &str = "UPSTREAM_UNAVAILABLE";
    /// Unexpected internal failure.
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Gateway error type shared by the control and data planes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Registration of a name that is already taken.
    #[error("backend '{0}' already registered")]
    DuplicateName(String),

    /// Lookup of a backend that is not (or no longer) registered.
    #[error("backend '{0}' not found")]
    BackendNotFound(String),

    /// Lookup of a session that does not exist (or was torn down).
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// A second client tried to attach to a session's stream.
    #[error("session '{0}' already has an attached stream")]
    SessionBusy(String),

    /// Malformed request input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unsupported forward method.
    #[error("unsupported method '{0}'")]
    InvalidMethod(String),

    /// Backend replied with a failure status; body is relayed verbatim.
    #[error("upstream error {status}: {body}")]
    Upstream {
        /// Status code reported by the backend.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Backend unreachable, timed out, or replied with an unreadable body.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DuplicateName(_) | Self::InvalidInput(_) | Self::InvalidMethod(_) => 400,
            Self::BackendNotFound(_) | Self::SessionNotFound(_) => 404,
            Self::SessionBusy(_) => 409,
            Self::Upstream { status, .. } => *status,
            Self::UpstreamUnavailable(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => codes::DUPLICATE_NAME,
            Self::BackendNotFound(_) => codes::BACKEND_NOT_FOUND,
            Self::SessionNotFound(_) => codes::SESSION_NOT_FOUND,
            Self::SessionBusy(_) => codes::SESSION_BUSY,
            Self::InvalidInput(_) => codes::INVALID_INPUT,
            Self::InvalidMethod(_) => codes::INVALID_METHOD,
            Self::Upstream { .. } => codes::UPSTREAM_ERROR,
            Self::UpstreamUnavailable(_) => codes::UPSTREAM_UNAVAILABLE,
            Self::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Whether the caller caused this error (bad name, unknown id, ...).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateName(_)
                | Self::BackendNotFound(_)
                | Self::SessionNotFound(_)
                | Self::SessionBusy(_)
                | Self::InvalidInput(_)
                | Self::InvalidMethod(_)
        )
    }

    /// Whether the backend (not the gateway or the caller) is at fault.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::UpstreamUnavailable(_))
    }

    /// Classify a backend failure status.
    ///
    /// Statuses outside the HTTP error range cannot be relayed as errors and
    /// collapse to [`GatewayError::UpstreamUnavailable`].
    #[must_use]
    pub fn from_upstream(status: u16, body: String) -> Self {
        if (400..=599).contains(&status) {
            Self::Upstream { status, body }
        } else {
            Self::UpstreamUnavailable(format!("unexpected status {status}: {body}"))
        }
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
