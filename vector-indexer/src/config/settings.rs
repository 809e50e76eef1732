//! Environment-driven settings for the vector indexer.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use vector_indexer_repository::config::DEFAULT_CHUNK_SIZE;
use vector_indexer_repository::IndexerConfig;

use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default target index.
const DEFAULT_INDEX_NAME: &str = "documents";

/// Runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// OpenSearch server URL.
    pub opensearch_url: String,
    /// Target index name.
    pub index_name: String,
    /// Documents per bulk request.
    pub chunk_size: usize,
    /// Optional cap on a single submission.
    pub max_batch_size: Option<usize>,
    /// Optional per-request deadline.
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `VECTOR_INDEX`: Target index (default: documents)
    /// - `INGEST_CHUNK_SIZE`: Documents per bulk request (default: 500)
    /// - `INGEST_MAX_BATCH_SIZE`: Cap on a single submission (default: unlimited)
    /// - `INGEST_REQUEST_TIMEOUT_MS`: Per-request deadline (default: none)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let opensearch_url =
            lookup("OPENSEARCH_URL").unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string());
        let index_name = lookup("VECTOR_INDEX").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string());

        let chunk_size = parse_var::<usize>(&lookup, "INGEST_CHUNK_SIZE")?
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(IndexingError::config("INGEST_CHUNK_SIZE must be greater than 0"));
        }

        let max_batch_size = parse_var::<usize>(&lookup, "INGEST_MAX_BATCH_SIZE")?;
        let request_timeout =
            parse_var::<u64>(&lookup, "INGEST_REQUEST_TIMEOUT_MS")?.map(Duration::from_millis);

        Ok(Self {
            opensearch_url,
            index_name,
            chunk_size,
            max_batch_size,
            request_timeout,
        })
    }

    /// Build the indexer configuration.
    pub fn indexer_config(&self) -> IndexerConfig {
        let mut config = IndexerConfig::default().with_chunk_size(self.chunk_size);
        if let Some(max) = self.max_batch_size {
            config = config.with_max_batch_size(max);
        }
        if let Some(timeout) = self.request_timeout {
            config = config.with_request_timeout(timeout);
        }
        config
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, IndexingError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| IndexingError::config(format!("Invalid {}={:?}: {}", key, raw, e))),
        _ => Ok(None),
    }
}
