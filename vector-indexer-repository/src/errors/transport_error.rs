//! Transport error types.
//!
//! Failures of the network exchange with the store. These are batch-wide:
//! nothing in the payload is known to have been applied.

use std::time::Duration;

use thiserror::Error;

/// Boxed underlying cause carried by transport errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while exchanging a bulk request with the store.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be sent (connection refused, DNS, TLS, ...).
    #[error("Connection error: {0}")]
    ConnectionError(#[source] BoxError),

    /// The exchange did not complete before the configured deadline.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The store rejected the whole request with a non-2xx status.
    #[error("Bulk request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The response body could not be read.
    #[error("Response body error: {0}")]
    BodyError(#[source] BoxError),

    /// Releasing the response body failed.
    #[error("Response close error: {0}")]
    CloseError(#[source] BoxError),
}

impl TransportError {
    /// Create a connection error wrapping the underlying cause.
    pub fn connection(err: impl Into<BoxError>) -> Self {
        Self::ConnectionError(err.into())
    }

    /// Create a body read error wrapping the underlying cause.
    pub fn body(err: impl Into<BoxError>) -> Self {
        Self::BodyError(err.into())
    }

    /// Create a close error wrapping the underlying cause.
    pub fn close(err: impl Into<BoxError>) -> Self {
        Self::CloseError(err.into())
    }

    /// Create a rejection error for a non-2xx response.
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }
}
