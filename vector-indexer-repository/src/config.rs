//! Configuration types for the BulkIndexer.

use std::time::Duration;

/// Default number of documents per request in chunked submissions.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Configuration for the BulkIndexer.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Maximum number of documents accepted by a single `submit` call.
    /// `None` disables the limit.
    pub max_batch_size: Option<usize>,
    /// Documents per request when using `submit_chunked`.
    pub chunk_size: usize,
    /// Deadline for one request, covering send and body read.
    pub request_timeout: Option<Duration>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: None,
        }
    }
}

impl IndexerConfig {
    /// Set a batch size limit for `submit`.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size);
        self
    }

    /// Set the chunk size used by `submit_chunked`. Zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set a per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}
