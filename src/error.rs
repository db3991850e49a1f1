use std::fmt;
use thiserror::Error;

/// Main error type for the SongSwipe client core
#[derive(Error, Debug)]
pub enum Error {
    /// Reading the durable token store failed
    #[error("Failed to read token store: {reason}")]
    StoreRead { reason: String },

    /// Writing or clearing the durable token store failed
    #[error("Failed to write token store: {reason}")]
    StoreWrite { reason: String },

    /// The durable token document could not be decoded
    #[error("Token store at '{path}' is corrupt: {reason}")]
    StoreCorrupt { path: String, reason: String },

    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP request to '{url}' failed: {reason}")]
    Http { url: String, reason: String },

    /// A header name or value could not be encoded
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The catalog kept answering 401 after the pipeline's single refresh attempt
    #[error("Catalog rejected the delegated token for '{path}'; re-authentication required")]
    Unauthorized { path: String },

    /// Any other non-success catalog status
    #[error("Catalog request '{path}' failed with HTTP {status}: {body}")]
    ApiStatus {
        path: String,
        status: u16,
        body: String,
    },

    /// The catalog answered 2xx but the body was unusable
    #[error("Invalid catalog response for '{path}': {reason}")]
    ResponseInvalid { path: String, reason: String },

    /// The OAuth callback could not be turned into a session
    #[error("Invalid authentication callback: {reason}")]
    CallbackInvalid { reason: String },

    /// The identity provider refused or failed to renew the session
    #[error("Session refresh failed: {reason}")]
    RefreshFailed { reason: String },

    /// Configuration is missing or malformed
    #[error("Invalid configuration '{key}': {reason}")]
    Config { key: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Type alias for results carrying [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    StoreReadFailed,
    StoreWriteFailed,
    StoreCorrupt,
    HttpRequestFailed,
    InvalidHeader,
    AuthReauthRequired,
    ApiRequestFailed,
    ApiResponseInvalid,
    AuthCallbackInvalid,
    AuthRefreshFailed,
    ConfigInvalid,
    Io,
    Serialization,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code_str = match self {
            ErrorCode::StoreReadFailed => "STORE_READ_FAILED",
            ErrorCode::StoreWriteFailed => "STORE_WRITE_FAILED",
            ErrorCode::StoreCorrupt => "STORE_CORRUPT",
            ErrorCode::HttpRequestFailed => "HTTP_REQUEST_FAILED",
            ErrorCode::InvalidHeader => "INVALID_HEADER",
            ErrorCode::AuthReauthRequired => "AUTH_REAUTH_REQUIRED",
            ErrorCode::ApiRequestFailed => "API_REQUEST_FAILED",
            ErrorCode::ApiResponseInvalid => "API_RESPONSE_INVALID",
            ErrorCode::AuthCallbackInvalid => "AUTH_CALLBACK_INVALID",
            ErrorCode::AuthRefreshFailed => "AUTH_REFRESH_FAILED",
            ErrorCode::ConfigInvalid => "CONFIG_INVALID",
            ErrorCode::Io => "IO",
            ErrorCode::Serialization => "SERIALIZATION",
        };
        write!(f, "{}", code_str)
    }
}

/// Error category for filtering and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (connection, timeout, etc.)
    Network,
    /// Authentication-related errors
    Authentication,
    /// Durable storage errors
    Storage,
    /// Configuration-related errors
    Configuration,
    /// Remote service errors
    Service,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Storage => "storage",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Service => "service",
        };
        write!(f, "{}", name)
    }
}

impl Error {
    /// Stable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::StoreRead { .. } => ErrorCode::StoreReadFailed,
            Error::StoreWrite { .. } => ErrorCode::StoreWriteFailed,
            Error::StoreCorrupt { .. } => ErrorCode::StoreCorrupt,
            Error::Http { .. } => ErrorCode::HttpRequestFailed,
            Error::InvalidHeader { .. } => ErrorCode::InvalidHeader,
            Error::Unauthorized { .. } => ErrorCode::AuthReauthRequired,
            Error::ApiStatus { .. } => ErrorCode::ApiRequestFailed,
            Error::ResponseInvalid { .. } => ErrorCode::ApiResponseInvalid,
            Error::CallbackInvalid { .. } => ErrorCode::AuthCallbackInvalid,
            Error::RefreshFailed { .. } => ErrorCode::AuthRefreshFailed,
            Error::Config { .. } => ErrorCode::ConfigInvalid,
            Error::Io(_) => ErrorCode::Io,
            Error::Json(_) => ErrorCode::Serialization,
        }
    }

    /// Category used by callers to decide how to react
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::StoreRead { .. }
            | Error::StoreWrite { .. }
            | Error::StoreCorrupt { .. }
            | Error::Io(_) => ErrorCategory::Storage,
            Error::Http { .. } | Error::InvalidHeader { .. } => ErrorCategory::Network,
            Error::Unauthorized { .. }
            | Error::CallbackInvalid { .. }
            | Error::RefreshFailed { .. } => ErrorCategory::Authentication,
            Error::ApiStatus { .. } | Error::ResponseInvalid { .. } | Error::Json(_) => {
                ErrorCategory::Service
            }
            Error::Config { .. } => ErrorCategory::Configuration,
        }
    }

    /// True when the surrounding application should send the user back to login
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

// Helper functions to create standard errors

/// Create a store write error from any displayable cause
pub fn store_write_failed(error: impl fmt::Display) -> Error {
    Error::StoreWrite {
        reason: error.to_string(),
    }
}

/// Create a store read error from any displayable cause
pub fn store_read_failed(error: impl fmt::Display) -> Error {
    Error::StoreRead {
        reason: error.to_string(),
    }
}

/// Create a configuration error
pub fn config_invalid(key: &str, reason: impl Into<String>) -> Error {
    Error::Config {
        key: key.to_string(),
        reason: reason.into(),
    }
}
