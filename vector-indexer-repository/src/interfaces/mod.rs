//! Interface definitions for the store transport.
//!
//! This module defines the abstract `BulkTransport` trait that allows
//! for dependency injection and swappable store clients.

mod bulk_transport;

pub use bulk_transport::{BulkTransport, ResponseBody, TransportResponse};
