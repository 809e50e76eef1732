//! Bulk transport trait definition.
//!
//! This module defines the abstract interface to the store's bulk endpoint,
//! allowing for different backend implementations (OpenSearch, mocks, ...).

use async_trait::async_trait;

use crate::errors::TransportError;

/// An open response body stream.
///
/// Implementations hold whatever resource backs the body (a socket, a
/// pooled connection). `close` releases it; callers go through
/// [`BodyGuard`](crate::response::BodyGuard), which calls `close` exactly once.
#[async_trait]
pub trait ResponseBody: Send {
    /// Read the remaining body to the end.
    async fn read_to_end(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Release the underlying resource.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Raw response returned by a transport.
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// The open body stream.
    pub body: Box<dyn ResponseBody>,
}

impl TransportResponse {
    /// Create a new response.
    pub fn new(status: u16, body: Box<dyn ResponseBody>) -> Self {
        Self { status, body }
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Abstracts the store client that executes bulk requests.
///
/// The client is constructed and owned outside the indexer; connection
/// pooling, authentication and retries are its responsibility.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` so a single client can serve
/// concurrent submissions.
#[async_trait]
pub trait BulkTransport: Send + Sync {
    /// Send a newline-delimited JSON body to the bulk endpoint.
    ///
    /// # Arguments
    ///
    /// * `body` - The complete bulk payload, every line newline-terminated
    ///
    /// # Returns
    ///
    /// * `Ok(TransportResponse)` - The store answered; the status may still be non-2xx
    /// * `Err(TransportError)` - If the request could not be sent
    async fn send_bulk(&self, body: Vec<u8>) -> Result<TransportResponse, TransportError>;
}
