//! Couchlite Core Library
//!
//! This crate provides the transport-free pieces of the Couchlite client:
//! - Document type with `_id`/`_rev` helpers
//! - Wire models for the CouchDB REST API
//! - View query builder
//! - Client configuration

pub mod config;
pub mod models;
pub mod query;

// Re-export commonly used types
pub use config::ClientConfig;
pub use models::*;
pub use query::{ViewParams, ViewQuery};
