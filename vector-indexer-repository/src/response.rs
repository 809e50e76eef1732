//! Bulk response handling.
//!
//! The transport hands back an open body stream. [`BodyGuard`] owns that
//! stream and releases it exactly once, either through [`BodyGuard::close`]
//! or on drop (early return, `?`, timeout, or a cancelled future).

use tracing::warn;

use crate::errors::IngestError;
use crate::interfaces::ResponseBody;
use crate::types::BulkSummary;

/// Body returned for a batch that was never sent.
const EMPTY_BULK_BODY: &[u8] = br#"{"took":0,"errors":false,"items":[]}"#;

/// Scoped owner of a response body stream.
pub struct BodyGuard {
    body: Box<dyn ResponseBody>,
    closed: bool,
}

impl BodyGuard {
    /// Take ownership of an open body.
    pub fn new(body: Box<dyn ResponseBody>) -> Self {
        Self {
            body,
            closed: false,
        }
    }

    /// Read the body to the end.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>, IngestError> {
        Ok(self.body.read_to_end().await?)
    }

    /// Release the body now.
    pub fn close(mut self) {
        self.release();
    }

    // Close errors are logged and dropped so they never mask the result.
    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.body.close() {
            warn!(error = %e, "Failed to close bulk response body");
        }
    }
}

impl Drop for BodyGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Response to a bulk submission.
///
/// Holds the status and the fully read body; no stream is left open. The
/// store reports success or failure per operation, so a 2xx status does not
/// mean every document was indexed. Use [`BulkResponse::summary`] to find
/// rejected items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkResponse {
    status: u16,
    body: Vec<u8>,
    synthetic: bool,
}

impl BulkResponse {
    /// Create a response from a status and body read off the wire.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            synthetic: false,
        }
    }

    /// The response returned for an empty batch, without any network call.
    pub fn empty() -> Self {
        Self {
            status: 200,
            body: EMPTY_BULK_BODY.to_vec(),
            synthetic: true,
        }
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Response body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Whether this response was produced locally for an empty batch.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Parse the per-item results out of the body.
    pub fn summary(&self) -> Result<BulkSummary, IngestError> {
        BulkSummary::from_slice(&self.body)
    }
}
