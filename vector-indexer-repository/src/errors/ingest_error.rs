//! Ingest error types.
//!
//! This module defines the errors returned by bulk submission. Each variant
//! names the phase that failed.

use std::fmt;

use thiserror::Error;

use super::TransportError;
use crate::response::BulkResponse;

/// The encoding stage that failed for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStage {
    /// The `{"index": {...}}` action line.
    ActionDescriptor,
    /// The document body line.
    DocumentBody,
}

impl fmt::Display for EncodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActionDescriptor => f.write_str("action descriptor"),
            Self::DocumentBody => f.write_str("document body"),
        }
    }
}

/// Errors that can occur while submitting a bulk batch.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Invalid input detected before encoding.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Batch size exceeds the configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// A document could not be serialized. Nothing was sent.
    #[error("Encoding error in {stage} of document '{document_id}' (position {position}): {source}")]
    EncodingError {
        stage: EncodeStage,
        position: usize,
        document_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The network exchange failed.
    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    /// A chunk of a chunked submission failed. `responses` holds the
    /// chunks that completed before it, in order.
    #[error("Chunk {chunk} failed after {} completed chunks: {source}", .responses.len())]
    ChunkError {
        chunk: usize,
        responses: Vec<BulkResponse>,
        #[source]
        source: Box<IngestError>,
    },

    /// A bulk response body could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl IngestError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Create an encoding error for the document at `position`.
    pub fn encoding(
        stage: EncodeStage,
        position: usize,
        document_id: impl Into<String>,
        source: serde_json::Error,
    ) -> Self {
        Self::EncodingError {
            stage,
            position,
            document_id: document_id.into(),
            source,
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Whether the failure happened before anything reached the network.
    pub fn is_preflight(&self) -> bool {
        match self {
            Self::ValidationError(_) | Self::BatchSizeExceeded { .. } | Self::EncodingError { .. } => {
                true
            }
            Self::ChunkError {
                responses, source, ..
            } => responses.is_empty() && source.is_preflight(),
            Self::TransportError(_) | Self::ParseError(_) => false,
        }
    }
}
