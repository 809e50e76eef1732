//! # Vector Indexer Repository
//!
//! This crate packs batches of documents (text, embedding vector, metadata)
//! into a single OpenSearch `_bulk` request. It includes definitions for
//! errors, the transport interface, the payload encoder, and a concrete
//! transport for OpenSearch.

pub mod config;
pub mod errors;
pub mod indexer;
pub mod interfaces;
pub mod opensearch;
pub mod payload;
pub mod response;
pub mod types;

pub use config::IndexerConfig;
pub use errors::{EncodeStage, IngestError, TransportError};
pub use indexer::BulkIndexer;
pub use interfaces::{BulkTransport, ResponseBody, TransportResponse};
pub use crate::opensearch::OpenSearchClient;
pub use payload::BulkPayload;
pub use response::BulkResponse;
pub use types::{BulkItemOutcome, BulkSummary, ItemError, PartialItemFailure};
pub use vector_indexer_shared::DocumentRecord;
