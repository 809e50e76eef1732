//! Error types for the vector indexer repository.

mod ingest_error;
mod transport_error;

pub use ingest_error::{EncodeStage, IngestError};
pub use transport_error::{BoxError, TransportError};
