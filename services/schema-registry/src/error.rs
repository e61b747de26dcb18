//! Error types for registry operations.

use thiserror::Error;

use crate::schema::SchemaError;

/// An error from a registry operation or from schema encoding/decoding.
///
/// Failures are detected as close to their source as possible and returned
/// immediately; there is no retry or fallback, and partially built schemas
/// or result lists are never handed back.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A wire type name is unknown, or a value type cannot be represented on
    /// the wire.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// The JSON was malformed for its context: wrong shape, a missing
    /// required key, or a dangling record-type reference.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The response was well-formed JSON but semantically wrong, or carried
    /// an error status.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The caller supplied an ambiguous or missing required parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The server explicitly reported absence.
    #[error("not found")]
    NotFound,

    /// The receive buffer or result assembly could not allocate.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] std::collections::TryReserveError),

    /// The schema builder rejected a decoded field.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The CA certificate bundle could not be loaded.
    #[error("CA certificate: {0}")]
    CaCertificate(#[source] std::io::Error),

    /// The HTTP transport failed; the underlying error is opaque to the
    /// client.
    #[error("transport: {0}")]
    Transport(#[source] api_client::Error),
}

impl RegistryError {
    pub(crate) fn invalid_format(message: impl Into<String>) -> Self {
        RegistryError::InvalidFormat(message.into())
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Self {
        RegistryError::InvalidResponse(message.into())
    }
}

impl From<api_client::Error> for RegistryError {
    fn from(err: api_client::Error) -> Self {
        match err {
            api_client::Error::Buffer(err) => RegistryError::OutOfMemory(err),
            api_client::Error::Response(err) => {
                RegistryError::InvalidResponse(err.to_string())
            }
            other => RegistryError::Transport(other),
        }
    }
}
