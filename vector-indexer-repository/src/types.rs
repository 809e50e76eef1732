//! Bulk response types.
//!
//! These mirror the `_bulk` response body. A 2xx bulk response may still
//! carry per-item failures; [`BulkSummary::failures`] lists them.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::IngestError;

#[derive(Debug, Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    took: u64,
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<BTreeMap<String, RawBulkItem>>,
}

#[derive(Debug, Deserialize)]
struct RawBulkItem {
    #[serde(rename = "_index")]
    index: Option<String>,
    #[serde(rename = "_id")]
    id: Option<String>,
    status: u16,
    result: Option<String>,
    error: Option<Value>,
}

/// Error reported by the store for a single item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    /// Error type, e.g. `mapper_parsing_exception`.
    pub error_type: String,
    /// Human-readable reason.
    pub reason: Option<String>,
}

impl ItemError {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                error_type: map
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                reason: map.get("reason").and_then(Value::as_str).map(str::to_string),
            },
            Value::String(s) => Self {
                error_type: "unknown".to_string(),
                reason: Some(s.clone()),
            },
            other => Self {
                error_type: "unknown".to_string(),
                reason: Some(other.to_string()),
            },
        }
    }
}

/// Outcome of a single operation within a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemOutcome {
    /// Operation name (`index` for everything this crate sends).
    pub operation: String,
    /// Target index.
    pub index: Option<String>,
    /// Document identifier.
    pub id: Option<String>,
    /// Per-item HTTP status.
    pub status: u16,
    /// `created`, `updated`, ... on success.
    pub result: Option<String>,
    /// Error details on failure.
    pub error: Option<ItemError>,
}

impl BulkItemOutcome {
    /// Whether the store applied this operation.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// A document the store rejected inside an otherwise successful request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialItemFailure {
    /// Position of the document in the submitted batch.
    pub position: usize,
    /// Document identifier, if the store echoed it.
    pub id: Option<String>,
    /// Per-item HTTP status.
    pub status: u16,
    /// Error type reported by the store.
    pub error_type: String,
    /// Reason reported by the store.
    pub reason: Option<String>,
}

/// Summary of a bulk response containing aggregate statistics and
/// individual item outcomes, in payload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkSummary {
    /// Server-side processing time in milliseconds.
    pub took_ms: u64,
    /// The store's own flag for "at least one item failed".
    pub errors: bool,
    /// Number of items reported.
    pub total: usize,
    /// Number of applied items.
    pub succeeded: usize,
    /// Number of rejected items.
    pub failed: usize,
    /// Individual outcomes.
    pub items: Vec<BulkItemOutcome>,
}

impl BulkSummary {
    /// Parse a `_bulk` response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, IngestError> {
        let raw: RawBulkResponse = serde_json::from_slice(body)
            .map_err(|e| IngestError::parse(format!("Invalid bulk response: {}", e)))?;

        let mut items = Vec::with_capacity(raw.items.len());
        for entry in raw.items {
            let (operation, item) = entry
                .into_iter()
                .next()
                .ok_or_else(|| IngestError::parse("Empty bulk response item"))?;

            items.push(BulkItemOutcome {
                operation,
                index: item.index,
                id: item.id,
                status: item.status,
                result: item.result,
                error: item.error.as_ref().map(ItemError::from_value),
            });
        }

        let succeeded = items.iter().filter(|i| i.is_success()).count();

        Ok(Self {
            took_ms: raw.took,
            errors: raw.errors,
            total: items.len(),
            succeeded,
            failed: items.len() - succeeded,
            items,
        })
    }

    /// Whether any item was rejected.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// The rejected items with their batch positions.
    pub fn failures(&self) -> Vec<PartialItemFailure> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.is_success())
            .map(|(position, item)| {
                let (error_type, reason) = match &item.error {
                    Some(e) => (e.error_type.clone(), e.reason.clone()),
                    None => ("unknown".to_string(), None),
                };
                PartialItemFailure {
                    position,
                    id: item.id.clone(),
                    status: item.status,
                    error_type,
                    reason,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_succeeded() {
        let body = json!({
            "took": 12,
            "errors": false,
            "items": [
                {"index": {"_index": "docs", "_id": "a", "status": 201, "result": "created"}},
                {"index": {"_index": "docs", "_id": "b", "status": 200, "result": "updated"}}
            ]
        });

        let summary = BulkSummary::from_slice(body.to_string().as_bytes()).unwrap();

        assert_eq!(summary.took_ms, 12);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        assert!(!summary.has_failures());
        assert_eq!(summary.items[1].result.as_deref(), Some("updated"));
        assert_eq!(summary.items[0].operation, "index");
    }

    #[test]
    fn test_partial_failure() {
        let body = json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "docs", "_id": "a", "status": 201, "result": "created"}},
                {"index": {
                    "_index": "docs",
                    "_id": "b",
                    "status": 400,
                    "error": {
                        "type": "mapper_parsing_exception",
                        "reason": "failed to parse field [content_vector]"
                    }
                }}
            ]
        });

        let summary = BulkSummary::from_slice(body.to_string().as_bytes()).unwrap();
        let failures = summary.failures();

        assert!(summary.errors);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].position, 1);
        assert_eq!(failures[0].id.as_deref(), Some("b"));
        assert_eq!(failures[0].status, 400);
        assert_eq!(failures[0].error_type, "mapper_parsing_exception");
        assert_eq!(
            failures[0].reason.as_deref(),
            Some("failed to parse field [content_vector]")
        );
    }

    #[test]
    fn test_invalid_body() {
        let result = BulkSummary::from_slice(b"<html>bad gateway</html>");
        assert!(matches!(result, Err(IngestError::ParseError(_))));
    }

    #[test]
    fn test_empty_item() {
        let result = BulkSummary::from_slice(br#"{"took":1,"errors":false,"items":[{}]}"#);
        assert!(matches!(result, Err(IngestError::ParseError(_))));
    }
}
