//! # Vector Indexer Shared
//!
//! Types shared between the vector indexer library crates and binary.

mod document;

pub use document::DocumentRecord;
