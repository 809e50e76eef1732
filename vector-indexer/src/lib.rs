//! # Vector Indexer
//!
//! Command-line loader that reads embedded documents from a JSON Lines file
//! and submits them to an OpenSearch vector index in bulk.
//!
//! This crate provides the configuration, dependency wiring and input
//! loading used by the `vector-indexer` binary.

pub mod config;
pub mod loader;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur while running the loader.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed input line.
    #[error("Input error on line {line}: {message}")]
    InputError { line: usize, message: String },

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] vector_indexer_repository::IngestError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The run was interrupted before the submission finished.
    #[error("Ingest cancelled")]
    Cancelled,
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an input error for a 1-based line number.
    pub fn input(line: usize, msg: impl Into<String>) -> Self {
        Self::InputError {
            line,
            message: msg.into(),
        }
    }
}
