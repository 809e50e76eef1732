//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `BulkTransport`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::errors::TransportError;
use crate::interfaces::{BulkTransport, ResponseBody, TransportResponse};

/// OpenSearch client implementation.
///
/// Sends pre-encoded NDJSON payloads to the `_bulk` endpoint. The target
/// index is carried in each action line, so the request path has no index.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200")?;
/// let indexer = BulkIndexer::new(Arc::new(client));
/// let response = indexer.submit("documents", &records).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(TransportError)` - If the URL is invalid or transport setup fails
    pub fn new(url: &str) -> Result<Self, TransportError> {
        let parsed_url = Url::parse(url).map_err(TransportError::connection)?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(TransportError::connection)?;

        info!(url = %url, "Created OpenSearch client");

        Ok(Self::from_client(OpenSearch::new(transport)))
    }

    /// Wrap an already configured client (auth, pooling, TLS set up by the caller).
    pub fn from_client(client: OpenSearch) -> Self {
        Self { client }
    }

    /// Check if the cluster is reachable and not red.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the cluster status is green or yellow
    /// * `Ok(false)` - If the cluster answered but is unhealthy
    /// * `Err(TransportError)` - If the health check fails to execute
    pub async fn health_check(&self) -> Result<bool, TransportError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(TransportError::connection)?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response.json().await.map_err(TransportError::body)?;
        let status = body.get("status").and_then(Value::as_str).unwrap_or("red");

        debug!(cluster_status = %status, "Cluster health");
        Ok(status != "red")
    }
}

#[async_trait]
impl BulkTransport for OpenSearchClient {
    async fn send_bulk(&self, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
        // The payload already ends every line with '\n', so the NDJSON
        // writer adds no extra separators.
        let response = self
            .client
            .bulk(BulkParts::None)
            .body(vec![body])
            .send()
            .await
            .map_err(TransportError::connection)?;

        let status = response.status_code().as_u16();
        Ok(TransportResponse::new(
            status,
            Box::new(OpenSearchBody::new(response)),
        ))
    }
}

/// Response body backed by an OpenSearch HTTP response.
///
/// Dropping the inner response returns the connection to the pool.
struct OpenSearchBody {
    response: Option<Response>,
}

impl OpenSearchBody {
    fn new(response: Response) -> Self {
        Self {
            response: Some(response),
        }
    }
}

#[async_trait]
impl ResponseBody for OpenSearchBody {
    async fn read_to_end(&mut self) -> Result<Vec<u8>, TransportError> {
        let response = self
            .response
            .take()
            .ok_or_else(|| TransportError::body("response body already consumed"))?;

        let text = response.text().await.map_err(TransportError::body)?;
        Ok(text.into_bytes())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.response = None;
        Ok(())
    }
}
