//! Input loading and result reporting for the vector indexer.
//!
//! Documents are read from JSON Lines: one `DocumentRecord` object per line,
//! blank lines ignored.

use std::io::BufRead;

use tracing::{info, warn};

use crate::IndexingError;
use vector_indexer_repository::{BulkResponse, IngestError};
use vector_indexer_shared::DocumentRecord;

/// Aggregate outcome of a chunked submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Number of bulk requests sent.
    pub requests: usize,
    /// Number of items the store reported on.
    pub total: usize,
    /// Number of applied items.
    pub succeeded: usize,
    /// Number of rejected items.
    pub failed: usize,
}

/// Read documents from a JSON Lines source.
///
/// Fails on the first malformed line, reporting its 1-based line number.
pub fn read_documents<R: BufRead>(reader: R) -> Result<Vec<DocumentRecord>, IndexingError> {
    let mut documents = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let document: DocumentRecord = serde_json::from_str(&line)
            .map_err(|e| IndexingError::input(index + 1, e.to_string()))?;
        documents.push(document);
    }

    Ok(documents)
}

/// Summarize the responses of a chunked submission, logging every rejected
/// document with its position in the input.
pub fn summarize(
    responses: &[BulkResponse],
    chunk_size: usize,
) -> Result<IngestReport, IndexingError> {
    let mut report = IngestReport {
        requests: responses.iter().filter(|r| !r.is_synthetic()).count(),
        ..Default::default()
    };

    for (chunk, response) in responses.iter().enumerate() {
        let summary = response.summary()?;

        for failure in summary.failures() {
            warn!(
                position = chunk * chunk_size + failure.position,
                id = failure.id.as_deref().unwrap_or("<unknown>"),
                status = failure.status,
                error_type = %failure.error_type,
                reason = failure.reason.as_deref().unwrap_or(""),
                "Document rejected by index"
            );
        }

        report.total += summary.total;
        report.succeeded += summary.succeeded;
        report.failed += summary.failed;
    }

    info!(
        requests = report.requests,
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed,
        "Ingest completed"
    );

    Ok(report)
}

/// Report the chunks that completed before a chunked submission failed.
///
/// Returns `None` when the error carries no completed chunks. A summary that
/// cannot be parsed is logged and skipped so it never masks `err`.
pub fn summarize_failed_run(err: &IngestError, chunk_size: usize) -> Option<IngestReport> {
    let IngestError::ChunkError { responses, .. } = err else {
        return None;
    };
    if responses.is_empty() {
        return None;
    }

    match summarize(responses, chunk_size) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(error = %e, "Could not summarize completed chunks");
            None
        }
    }
}
