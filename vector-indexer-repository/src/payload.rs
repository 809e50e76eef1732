//! Bulk payload encoding.
//!
//! Each document becomes an operation pair: an `index` action line naming
//! the target index and document id, followed by the document body. Every
//! line is a single compact JSON value terminated by `\n`.
//!
//! ```text
//! {"index":{"_index":"docs","_id":"a"}}
//! {"content":"...","content_vector":[0.1,0.2],"metadata":{}}
//! ```

use std::collections::BTreeMap;

use serde::ser::{Error as _, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::errors::{EncodeStage, IngestError};
use vector_indexer_shared::DocumentRecord;

/// Field name holding the document text in the index mapping.
pub const CONTENT_FIELD: &str = "content";

/// Field name holding the embedding vector in the index mapping.
pub const VECTOR_FIELD: &str = "content_vector";

/// Field name holding the metadata object in the index mapping.
pub const METADATA_FIELD: &str = "metadata";

#[derive(Debug, Serialize)]
struct ActionTarget<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

/// The action descriptor line. Always an `index` (upsert) operation.
#[derive(Debug, Serialize)]
struct ActionLine<'a> {
    index: ActionTarget<'a>,
}

/// The document body line, keyed by `CONTENT_FIELD`, `VECTOR_FIELD` and
/// `METADATA_FIELD`.
#[derive(Debug)]
struct DocumentBody<'a, M> {
    content: &'a str,
    content_vector: &'a [f32],
    metadata: &'a BTreeMap<String, M>,
}

impl<M: Serialize> Serialize for DocumentBody<'_, M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DocumentBody", 3)?;
        state.serialize_field(CONTENT_FIELD, self.content)?;
        state.serialize_field(VECTOR_FIELD, self.content_vector)?;
        state.serialize_field(METADATA_FIELD, self.metadata)?;
        state.end()
    }
}

/// Action descriptor and body for one document.
#[derive(Debug)]
struct BulkOperationPair<'a, M> {
    action: ActionLine<'a>,
    body: DocumentBody<'a, M>,
}

impl<'a, M: Serialize> BulkOperationPair<'a, M> {
    fn new(index_name: &'a str, document: &'a DocumentRecord<M>) -> Self {
        Self {
            action: ActionLine {
                index: ActionTarget {
                    index: index_name,
                    id: &document.id,
                },
            },
            body: DocumentBody {
                content: &document.text,
                content_vector: &document.vector,
                metadata: &document.metadata,
            },
        }
    }

    fn write_to(&self, buf: &mut Vec<u8>, position: usize) -> Result<(), IngestError> {
        let id = self.action.index.id;

        write_line(buf, &self.action)
            .map_err(|e| IngestError::encoding(EncodeStage::ActionDescriptor, position, id, e))?;

        if let Some(i) = self.body.content_vector.iter().position(|v| !v.is_finite()) {
            let e = serde_json::Error::custom(format!(
                "vector component {} is not finite ({})",
                i, self.body.content_vector[i]
            ));
            return Err(IngestError::encoding(
                EncodeStage::DocumentBody,
                position,
                id,
                e,
            ));
        }

        write_line(buf, &self.body)
            .map_err(|e| IngestError::encoding(EncodeStage::DocumentBody, position, id, e))
    }
}

fn write_line<T: Serialize>(buf: &mut Vec<u8>, value: &T) -> Result<(), serde_json::Error> {
    serde_json::to_writer(&mut *buf, value)?;
    buf.push(b'\n');
    Ok(())
}

/// A fully encoded bulk request body.
#[derive(Debug, Clone, Default)]
pub struct BulkPayload {
    buf: Vec<u8>,
    documents: usize,
}

impl BulkPayload {
    /// Encode `documents` against `index_name`, preserving input order.
    ///
    /// Fails on the first document that cannot be serialized; no partial
    /// payload is returned.
    pub fn encode<M: Serialize>(
        index_name: &str,
        documents: &[DocumentRecord<M>],
    ) -> Result<Self, IngestError> {
        let mut buf = Vec::new();

        for (position, document) in documents.iter().enumerate() {
            BulkOperationPair::new(index_name, document).write_to(&mut buf, position)?;
        }

        Ok(Self {
            buf,
            documents: documents.len(),
        })
    }

    /// Number of documents encoded.
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Number of newline-terminated lines (two per document).
    pub fn line_count(&self) -> usize {
        self.documents * 2
    }

    /// Whether the payload holds no operations.
    pub fn is_empty(&self) -> bool {
        self.documents == 0
    }

    /// Size of the encoded body in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[cfg(test)]
    fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the payload, returning the encoded body.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
