//! OpenSearch implementation of the bulk transport.
//!
//! This module provides a concrete implementation of `BulkTransport`
//! using OpenSearch as the backend.

mod client;

pub use client::OpenSearchClient;
