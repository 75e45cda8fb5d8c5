//! Error types for the OpenStack backend.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Errors raised by the OpenStack backend.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum OpenStackBackendError {
    /// Raised when the configuration is incomplete or credentials cannot be
    /// resolved.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a request is missing a required field.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Raised when a stack template is not valid JSON.
    #[error("invalid stack template: {0}")]
    InvalidTemplate(String),
    /// Raised when the identity service rejects the credentials.
    #[error("identity service rejected the credentials")]
    Unauthorized,
    /// Raised when the identity service omits the subject token header.
    #[error("identity service response is missing the X-Subject-Token header")]
    MissingToken,
    /// Raised when the service catalog has no usable endpoint.
    #[error("no {interface} endpoint for service '{service}' in the catalog")]
    MissingEndpoint {
        /// Catalog service type (for example `compute`).
        service: String,
        /// Endpoint interface that was requested.
        interface: String,
    },
    /// Raised when a service answers with a non-success status.
    #[error("{service} returned HTTP {status}: {message}")]
    Api {
        /// Service that failed.
        service: String,
        /// HTTP status code.
        status: u16,
        /// Response body, when any.
        message: String,
    },
    /// Raised when a response body cannot be decoded.
    #[error("failed to decode {context} response: {message}")]
    Decode {
        /// Operation whose response was being decoded.
        context: String,
        /// Decoder error message.
        message: String,
    },
    /// Raised when an endpoint URL cannot be extended with a path.
    #[error("invalid endpoint URL {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser error message.
        message: String,
    },
    /// Raised when a local file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Local path.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Wrapper for transport level failures.
    #[error("provider error: {message}")]
    Provider {
        /// Message returned by the HTTP client.
        message: String,
    },
}

impl From<reqwest::Error> for OpenStackBackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Provider {
            message: value.to_string(),
        }
    }
}

impl From<BackendError> for OpenStackBackendError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Validation(field) => Self::Validation(field),
            BackendError::InvalidTemplate(message) => Self::InvalidTemplate(message),
            BackendError::Io { path, message } => Self::Io { path, message },
        }
    }
}

impl From<ConfigError> for OpenStackBackendError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}
