//! Dependency initialization and wiring for the vector indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use vector_indexer_repository::{BulkIndexer, OpenSearchClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured bulk indexer.
    pub indexer: BulkIndexer,
    /// Index that documents are written to.
    pub index_name: String,
}

impl Dependencies {
    /// Initialize all dependencies from settings.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the client cannot be built or the cluster is unhealthy
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index = %settings.index_name,
            chunk_size = settings.chunk_size,
            "Initializing dependencies"
        );

        let client = OpenSearchClient::new(&settings.opensearch_url).map_err(|e| {
            IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
        })?;

        // Verify OpenSearch is reachable
        let healthy = client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let indexer = BulkIndexer::with_config(Arc::new(client), settings.indexer_config());

        Ok(Self {
            indexer,
            index_name: settings.index_name.clone(),
        })
    }
}
