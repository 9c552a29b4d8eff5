//! Couchlite Client Library
//!
//! Async HTTP client for the CouchDB REST API. A [`Client`] is bound to one
//! database and exposes database operations (create, delete, list, info,
//! replicate, uuids) and document operations (get, save, delete, bulk
//! variants, view queries). Every call issues exactly one HTTP request.
//!
//! ```rust,no_run
//! use couchlite_rs::{Client, Document};
//! use serde_json::json;
//!
//! # async fn example() -> couchlite_rs::Result<()> {
//! let db = Client::new("albums")?;
//! db.create_db().await?;
//! let saved = db.save_doc(&Document::try_from(json!({"title": "Blue"}))?).await?;
//! let doc = db.get_doc(&saved.id).await?;
//! db.delete_doc(&doc).await?;
//! # Ok(())
//! # }
//! ```

mod client;

pub use client::Client;
pub use couchlite_core::{
    BulkDocResult, ClientConfig, DbInfo, DbOk, DocUpdate, Document, FetchedDoc, ViewParams,
    ViewQuery, ViewResult, ViewRow,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Server error: {status} - {error}{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Api {
        status: u16,
        error: String,
        reason: Option<String>,
    },

    #[error("No data")]
    NoData,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl ClientError {
    /// Short error kind. For server-reported failures this is the server's
    /// `error` field (`not_found`, `conflict`, ...).
    pub fn error_kind(&self) -> &str {
        match self {
            ClientError::Request(_) => "request_failed",
            ClientError::Serialization(_) => "bad_json",
            ClientError::Api { error, .. } => error.as_str(),
            ClientError::NoData => "No data",
            ClientError::InvalidDocument(_) => "invalid_document",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ClientError::Api { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.error_kind() == "not_found"
    }

    pub fn is_conflict(&self) -> bool {
        self.error_kind() == "conflict"
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
