//! Bulk indexer implementation.
//!
//! This module provides the main entry point for submitting document
//! batches. Application code uses this to encode a batch into one bulk
//! request and send it through an injected transport.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::config::IndexerConfig;
use crate::errors::{IngestError, TransportError};
use crate::interfaces::BulkTransport;
use crate::payload::BulkPayload;
use crate::response::{BodyGuard, BulkResponse};
use vector_indexer_shared::DocumentRecord;

/// Longest rejection body excerpt written at `error` level.
const LOGGED_BODY_LIMIT: usize = 512;

/// Cut `text` to at most `LOGGED_BODY_LIMIT` bytes on a char boundary.
fn excerpt(text: &str) -> &str {
    if text.len() <= LOGGED_BODY_LIMIT {
        return text;
    }
    let mut end = LOGGED_BODY_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Submits batches of documents as single bulk requests.
///
/// Holds no per-call state, so one indexer can serve concurrent
/// submissions as long as the transport allows it.
pub struct BulkIndexer {
    transport: Arc<dyn BulkTransport>,
    config: IndexerConfig,
}

impl BulkIndexer {
    /// Create a new BulkIndexer with default configuration.
    pub fn new(transport: Arc<dyn BulkTransport>) -> Self {
        Self {
            transport,
            config: IndexerConfig::default(),
        }
    }

    /// Create a new BulkIndexer with custom configuration.
    pub fn with_config(transport: Arc<dyn BulkTransport>, config: IndexerConfig) -> Self {
        Self { transport, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    fn validate(&self, index_name: &str, size: usize) -> Result<(), IngestError> {
        if index_name.is_empty() {
            return Err(IngestError::validation("index_name is required"));
        }
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(IngestError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Index a batch of documents with a single bulk request.
    ///
    /// Every document becomes an `index` (upsert) operation against
    /// `index_name`, in input order. An empty batch performs no network
    /// call and returns [`BulkResponse::empty`].
    ///
    /// The returned response is not inspected: the store reports failures
    /// per document, and callers must check [`BulkResponse::summary`].
    ///
    /// # Errors
    ///
    /// * `IngestError::ValidationError` - If `index_name` is empty
    /// * `IngestError::BatchSizeExceeded` - If a batch limit is configured and exceeded
    /// * `IngestError::EncodingError` - If a document cannot be serialized; nothing is sent
    /// * `IngestError::TransportError` - If the exchange fails or the whole request is rejected
    #[instrument(
        skip(self, documents),
        fields(index = %index_name, documents = documents.len(), batch_id = %Uuid::new_v4())
    )]
    pub async fn submit<M>(
        &self,
        index_name: &str,
        documents: &[DocumentRecord<M>],
    ) -> Result<BulkResponse, IngestError>
    where
        M: Serialize + Sync,
    {
        self.validate(index_name, documents.len())?;

        if documents.is_empty() {
            debug!("Empty batch, skipping bulk request");
            return Ok(BulkResponse::empty());
        }

        let payload = BulkPayload::encode(index_name, documents)?;
        self.send(payload).await
    }

    /// Index a large batch as several bulk requests of `chunk_size` documents.
    ///
    /// All chunks are encoded before the first request is sent, so an
    /// encoding failure leaves the store untouched. Chunks are sent one after
    /// another; the returned responses are in chunk order. A transport
    /// failure stops the run with `IngestError::ChunkError`, which carries
    /// the responses of the chunks that completed before it.
    ///
    /// `max_batch_size`, when configured, caps the whole input.
    #[instrument(
        skip(self, documents),
        fields(index = %index_name, documents = documents.len(), chunk_size = self.config.chunk_size)
    )]
    pub async fn submit_chunked<M>(
        &self,
        index_name: &str,
        documents: &[DocumentRecord<M>],
    ) -> Result<Vec<BulkResponse>, IngestError>
    where
        M: Serialize + Sync,
    {
        self.validate(index_name, documents.len())?;

        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_size = self.config.chunk_size.max(1);
        let payloads = documents
            .chunks(chunk_size)
            .enumerate()
            .map(|(chunk, docs)| {
                BulkPayload::encode(index_name, docs).map_err(|e| match e {
                    IngestError::EncodingError {
                        stage,
                        position,
                        document_id,
                        source,
                    } => IngestError::EncodingError {
                        stage,
                        position: chunk * chunk_size + position,
                        document_id,
                        source,
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let chunks = payloads.len();
        let mut responses = Vec::with_capacity(chunks);

        for (chunk, payload) in payloads.into_iter().enumerate() {
            match self.send(payload).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    error!(chunk = chunk, chunks = chunks, error = %e, "Chunk submission failed");
                    return Err(IngestError::ChunkError {
                        chunk,
                        responses,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(responses)
    }

    async fn send(&self, payload: BulkPayload) -> Result<BulkResponse, IngestError> {
        match self.config.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(payload))
                .await
                .map_err(|_| {
                    error!(timeout_ms = timeout.as_millis() as u64, "Bulk request timed out");
                    TransportError::Timeout(timeout)
                })?,
            None => self.exchange(payload).await,
        }
    }

    async fn exchange(&self, payload: BulkPayload) -> Result<BulkResponse, IngestError> {
        let started = Instant::now();
        let documents = payload.document_count();
        let bytes = payload.len();

        debug!(
            documents = documents,
            lines = payload.line_count(),
            bytes = bytes,
            "Sending bulk request"
        );

        let response = self.transport.send_bulk(payload.into_bytes()).await?;
        let status = response.status;

        let mut body = BodyGuard::new(response.body);
        let read = body.read_to_end().await;
        body.close();
        let body = read?;

        if !(200..300).contains(&status) {
            let text = String::from_utf8_lossy(&body).into_owned();
            error!(
                status = status,
                body = %excerpt(&text),
                body_bytes = text.len(),
                "Bulk request rejected"
            );
            debug!(status = status, body = %text, "Rejected bulk response body");
            return Err(TransportError::rejected(status, text).into());
        }

        info!(
            status = status,
            documents = documents,
            bytes = bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bulk request completed"
        );

        Ok(BulkResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::{ResponseBody, TransportResponse};
    use crate::payload::VECTOR_FIELD;
    use async_trait::async_trait;
    use serde::ser::Error as _;
    use serde::Serializer;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    const OK_BODY: &str = r#"{"took":1,"errors":false,"items":[]}"#;

    #[derive(Clone, Copy)]
    enum Behavior {
        Respond(u16),
        ConnectionFailure,
        BodyFailure,
        Hang,
    }

    #[derive(Default)]
    struct Counters {
        calls: AtomicUsize,
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    /// Mock transport for testing. Scripted replies are served first, then
    /// `behavior` applies.
    struct MockTransport {
        behavior: Behavior,
        script: Mutex<VecDeque<(u16, String)>>,
        counters: Arc<Counters>,
        bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MockTransport {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                script: Mutex::new(VecDeque::new()),
                counters: Arc::new(Counters::default()),
                bodies: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    struct MockBody {
        behavior: Behavior,
        counters: Arc<Counters>,
        text: String,
    }

    #[async_trait]
    impl ResponseBody for MockBody {
        async fn read_to_end(&mut self) -> Result<Vec<u8>, TransportError> {
            match self.behavior {
                Behavior::BodyFailure => Err(TransportError::body(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated",
                ))),
                Behavior::Hang => std::future::pending().await,
                _ => Ok(self.text.clone().into_bytes()),
            }
        }

        fn close(&mut self) -> Result<(), TransportError> {
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait]
    impl BulkTransport for MockTransport {
        async fn send_bulk(&self, body: Vec<u8>) -> Result<TransportResponse, TransportError> {
            self.counters.calls.fetch_add(1, Ordering::SeqCst);
            self.bodies.lock().await.push(body);

            if let Some((status, text)) = self.script.lock().await.pop_front() {
                self.counters.opened.fetch_add(1, Ordering::SeqCst);
                return Ok(TransportResponse::new(
                    status,
                    Box::new(MockBody {
                        behavior: Behavior::Respond(status),
                        counters: self.counters.clone(),
                        text,
                    }),
                ));
            }

            let status = match self.behavior {
                Behavior::ConnectionFailure => {
                    return Err(TransportError::connection(io::Error::new(
                        io::ErrorKind::ConnectionRefused,
                        "connection refused",
                    )));
                }
                Behavior::Respond(status) => status,
                Behavior::BodyFailure | Behavior::Hang => 200,
            };

            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            let text = if (200..300).contains(&status) {
                OK_BODY.to_string()
            } else {
                r#"{"error":"request entity too large"}"#.to_string()
            };

            Ok(TransportResponse::new(
                status,
                Box::new(MockBody {
                    behavior: self.behavior,
                    counters: self.counters.clone(),
                    text,
                }),
            ))
        }
    }

    struct Harness {
        indexer: BulkIndexer,
        counters: Arc<Counters>,
        bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Harness {
        fn new(behavior: Behavior) -> Self {
            Self::with_config(behavior, IndexerConfig::default())
        }

        fn with_config(behavior: Behavior, config: IndexerConfig) -> Self {
            Self::scripted(behavior, config, Vec::new())
        }

        fn scripted(
            behavior: Behavior,
            config: IndexerConfig,
            replies: Vec<(u16, String)>,
        ) -> Self {
            let transport = MockTransport::new(behavior);
            *transport.script.try_lock().unwrap() = replies.into();
            let counters = transport.counters.clone();
            let bodies = transport.bodies.clone();
            Self {
                indexer: BulkIndexer::with_config(Arc::new(transport), config),
                counters,
                bodies,
            }
        }

        fn calls(&self) -> usize {
            self.counters.calls.load(Ordering::SeqCst)
        }

        fn assert_released(&self) {
            assert_eq!(
                self.counters.opened.load(Ordering::SeqCst),
                self.counters.closed.load(Ordering::SeqCst),
                "every opened body must be closed exactly once"
            );
        }
    }

    fn create_test_documents(count: usize) -> Vec<DocumentRecord> {
        (0..count)
            .map(|i| {
                DocumentRecord::new(
                    format!("doc-{}", i),
                    format!("Document {}", i),
                    vec![i as f32, 0.25, -1.5],
                )
                .with_metadata("source", json!("test"))
                .with_metadata("page", json!(i))
            })
            .collect()
    }

    struct Cyclic;

    impl Serialize for Cyclic {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cycle detected"))
        }
    }

    #[tokio::test]
    async fn test_submit_sends_one_request() {
        let harness = Harness::new(Behavior::Respond(200));
        let docs = create_test_documents(3);

        let response = harness.indexer.submit("docs", &docs).await.unwrap();

        assert_eq!(response.status(), 200);
        assert!(!response.is_synthetic());
        assert_eq!(response.body(), OK_BODY.as_bytes());
        assert_eq!(harness.calls(), 1);
        harness.assert_released();
        assert_eq!(harness.counters.closed.load(Ordering::SeqCst), 1);

        let bodies = harness.bodies.lock().await;
        let text = std::str::from_utf8(&bodies[0]).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 6);
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(lines[i * 2]["index"]["_id"], json!(doc.id));
            assert_eq!(lines[i * 2]["index"]["_index"], json!("docs"));
            assert_eq!(lines[i * 2 + 1][VECTOR_FIELD], json!(doc.vector));
            assert_eq!(lines[i * 2 + 1]["metadata"]["page"], json!(i));
        }
    }

    #[tokio::test]
    async fn test_submit_empty_skips_network() {
        let harness = Harness::new(Behavior::Respond(200));

        let response = harness
            .indexer
            .submit::<Value>("docs", &[])
            .await
            .unwrap();

        assert!(response.is_synthetic());
        assert_eq!(response.status(), 200);
        assert_eq!(response.summary().unwrap().total, 0);
        assert_eq!(harness.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_empty_index_name() {
        let harness = Harness::new(Behavior::Respond(200));

        let result = harness.indexer.submit("", &create_test_documents(1)).await;

        assert!(matches!(result, Err(IngestError::ValidationError(_))));
        assert_eq!(harness.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_encoding_failure_never_calls_transport() {
        let harness = Harness::new(Behavior::Respond(200));
        let docs = vec![
            DocumentRecord::new("ok", "fine", vec![1.0]),
            DocumentRecord::new("loop", "cyclic", vec![1.0]).with_metadata("self", Cyclic),
        ];

        let err = harness.indexer.submit("docs", &docs).await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::EncodingError {
                stage: crate::errors::EncodeStage::DocumentBody,
                position: 1,
                ..
            }
        ));
        assert!(err.is_preflight());
        assert_eq!(harness.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_connection_failure() {
        let harness = Harness::new(Behavior::ConnectionFailure);

        let err = harness
            .indexer
            .submit("docs", &create_test_documents(2))
            .await
            .unwrap_err();

        match err {
            IngestError::TransportError(TransportError::ConnectionError(source)) => {
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(harness.calls(), 1);
        assert_eq!(harness.counters.opened.load(Ordering::SeqCst), 0);
        harness.assert_released();
    }

    #[tokio::test]
    async fn test_submit_rejected_status() {
        let harness = Harness::new(Behavior::Respond(413));

        let err = harness
            .indexer
            .submit("docs", &create_test_documents(2))
            .await
            .unwrap_err();

        match err {
            IngestError::TransportError(TransportError::Rejected { status, body }) => {
                assert_eq!(status, 413);
                assert!(body.contains("request entity too large"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(harness.counters.closed.load(Ordering::SeqCst), 1);
        harness.assert_released();
    }

    #[tokio::test]
    async fn test_submit_body_read_failure() {
        let harness = Harness::new(Behavior::BodyFailure);

        let err = harness
            .indexer
            .submit("docs", &create_test_documents(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::TransportError(TransportError::BodyError(_))
        ));
        assert_eq!(harness.counters.closed.load(Ordering::SeqCst), 1);
        harness.assert_released();
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_timeout_releases_body() {
        let config = IndexerConfig::default().with_request_timeout(Duration::from_secs(5));
        let harness = Harness::with_config(Behavior::Hang, config);

        let err = harness
            .indexer
            .submit("docs", &create_test_documents(1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::TransportError(TransportError::Timeout(d)) if d == Duration::from_secs(5)
        ));
        assert_eq!(harness.counters.opened.load(Ordering::SeqCst), 1);
        harness.assert_released();
    }

    #[tokio::test]
    async fn test_submit_batch_size_exceeded() {
        let config = IndexerConfig::default().with_max_batch_size(5);
        let harness = Harness::with_config(Behavior::Respond(200), config);

        let result = harness
            .indexer
            .submit("docs", &create_test_documents(10))
            .await;

        assert!(matches!(
            result,
            Err(IngestError::BatchSizeExceeded {
                provided: 10,
                max: 5
            })
        ));
        assert_eq!(harness.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_twice_sends_two_upserts() {
        let harness = Harness::new(Behavior::Respond(200));
        let docs = create_test_documents(2);

        harness.indexer.submit("docs", &docs).await.unwrap();
        harness.indexer.submit("docs", &docs).await.unwrap();

        let bodies = harness.bodies.lock().await;
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0], bodies[1]);
        assert!(std::str::from_utf8(&bodies[0])
            .unwrap()
            .lines()
            .step_by(2)
            .all(|l| l.starts_with(r#"{"index":"#)));
    }

    #[tokio::test]
    async fn test_concurrent_submissions() {
        let harness = Harness::new(Behavior::Respond(200));
        let first = create_test_documents(2);
        let second = create_test_documents(4);

        let (a, b) = tokio::join!(
            harness.indexer.submit("docs", &first),
            harness.indexer.submit("other", &second)
        );

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(harness.calls(), 2);
        harness.assert_released();
    }

    #[tokio::test]
    async fn test_submit_chunked_preserves_order() {
        let config = IndexerConfig::default().with_chunk_size(2);
        let harness = Harness::with_config(Behavior::Respond(200), config);
        let docs = create_test_documents(5);

        let responses = harness.indexer.submit_chunked("docs", &docs).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(harness.calls(), 3);

        let bodies = harness.bodies.lock().await;
        let ids: Vec<String> = bodies
            .iter()
            .flat_map(|b| {
                std::str::from_utf8(b)
                    .unwrap()
                    .lines()
                    .step_by(2)
                    .map(|l| {
                        let v: Value = serde_json::from_str(l).unwrap();
                        v["index"]["_id"].as_str().unwrap().to_string()
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        let expected: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();
        assert_eq!(ids, expected);
        assert_eq!(bodies[2].iter().filter(|b| **b == b'\n').count(), 2);
    }

    #[tokio::test]
    async fn test_submit_chunked_encoding_failure_sends_nothing() {
        let config = IndexerConfig::default().with_chunk_size(2);
        let harness = Harness::with_config(Behavior::Respond(200), config);
        let mut docs: Vec<DocumentRecord<Value>> = create_test_documents(5);
        docs[3].vector[0] = f32::INFINITY;

        let err = harness
            .indexer
            .submit_chunked("docs", &docs)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IngestError::EncodingError { position: 3, .. }
        ));
        assert_eq!(harness.calls(), 0);
    }

    #[tokio::test]
    async fn test_submit_chunked_transport_failure() {
        let config = IndexerConfig::default().with_chunk_size(2);
        let harness = Harness::with_config(Behavior::Respond(503), config);

        let err = harness
            .indexer
            .submit_chunked("docs", &create_test_documents(4))
            .await
            .unwrap_err();

        match err {
            IngestError::ChunkError {
                chunk,
                responses,
                source,
            } => {
                assert_eq!(chunk, 0);
                assert!(responses.is_empty());
                assert!(matches!(
                    *source,
                    IngestError::TransportError(TransportError::Rejected { status: 503, .. })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(harness.calls(), 1);
        harness.assert_released();
    }

    #[tokio::test]
    async fn test_submit_chunked_failure_keeps_completed_responses() {
        let first = json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {
                    "_index": "docs",
                    "_id": "doc-0",
                    "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "dimension mismatch"}
                }},
                {"index": {"_index": "docs", "_id": "doc-1", "status": 201, "result": "created"}}
            ]
        });
        let config = IndexerConfig::default().with_chunk_size(2);
        let harness = Harness::scripted(
            Behavior::Respond(503),
            config,
            vec![(200, first.to_string())],
        );

        let err = harness
            .indexer
            .submit_chunked("docs", &create_test_documents(4))
            .await
            .unwrap_err();

        match err {
            IngestError::ChunkError {
                chunk,
                responses,
                source,
            } => {
                assert_eq!(chunk, 1);
                assert_eq!(responses.len(), 1);
                let failures = responses[0].summary().unwrap().failures();
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].id.as_deref(), Some("doc-0"));
                assert_eq!(failures[0].error_type, "mapper_parsing_exception");
                assert!(matches!(
                    *source,
                    IngestError::TransportError(TransportError::Rejected { status: 503, .. })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(harness.calls(), 2);
        harness.assert_released();
    }

    #[tokio::test]
    async fn test_submit_chunked_batch_size_exceeded() {
        let config = IndexerConfig::default()
            .with_max_batch_size(5)
            .with_chunk_size(2);
        let harness = Harness::with_config(Behavior::Respond(200), config);

        let result = harness
            .indexer
            .submit_chunked("docs", &create_test_documents(10))
            .await;

        assert!(matches!(
            result,
            Err(IngestError::BatchSizeExceeded {
                provided: 10,
                max: 5
            })
        ));
        assert_eq!(harness.calls(), 0);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("short"), "short");

        let text = format!("a{}", "é".repeat(LOGGED_BODY_LIMIT));
        let cut = excerpt(&text);

        assert!(cut.len() <= LOGGED_BODY_LIMIT);
        assert_eq!(cut.len(), LOGGED_BODY_LIMIT - 1);
        assert!(text.starts_with(cut));
    }
}
