use crate::{ClientError, Result};
use couchlite_core::models::{
    AllDocsResponse, BulkDocResult, BulkDocsRequest, BulkGetResponse, DbInfo, DbOk, DocUpdate,
    Document, ErrorResponse, FetchedDoc, ReplicateRequest, UuidsResponse, ViewResult,
};
use couchlite_core::{ClientConfig, ViewParams, ViewQuery};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// CouchDB REST API client bound to a single database
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
    base_url: String,
    base_path: String,
    client: HttpClient,
}

impl Client {
    /// Create a client for `database` on 127.0.0.1:5984
    pub fn new(database: impl Into<String>) -> Result<Self> {
        Self::from_config(&ClientConfig::new(database))
    }

    pub fn with_host(database: impl Into<String>, host: impl Into<String>, port: u16) -> Result<Self> {
        Self::from_config(&ClientConfig {
            database: database.into(),
            host: host.into(),
            port,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        // No idle connections are kept, so every call opens a fresh one
        let client = HttpClient::builder().pool_max_idle_per_host(0).build()?;

        Ok(Self {
            base_url: config.base_url(),
            base_path: config.base_path(),
            config: config.clone(),
            client,
        })
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    /// Issue one request and decode the JSON reply.
    ///
    /// `Content-Type: application/json` is always sent. An empty reply body
    /// is reported as [`ClientError::NoData`], a non-success status as
    /// [`ClientError::Api`].
    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, path, has_body = body.is_some(), "Sending request");

        let mut req = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = &body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            tracing::warn!(path, error = %e, "Request failed");
            ClientError::Request(e)
        })?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), bytes = text.len(), "Received response");

        parse_response(status, &text).inspect_err(|e| {
            tracing::warn!(path, status = status.as_u16(), error = %e, "Request returned an error");
        })
    }

    /// Like [`Client::request`], decoding the reply into `T`
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T> {
        let value = self.request(method, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    //
    // Database operations
    //

    /// Create the database
    #[tracing::instrument(skip(self), fields(db = %self.config.database))]
    pub async fn create_db(&self) -> Result<DbOk> {
        self.request_as(Method::PUT, &self.base_path, None).await
    }

    /// Delete the database
    #[tracing::instrument(skip(self), fields(db = %self.config.database))]
    pub async fn delete_db(&self) -> Result<DbOk> {
        self.request_as(Method::DELETE, &self.base_path, None).await
    }

    /// List databases on the server
    #[tracing::instrument(skip(self))]
    pub async fn list_dbs(&self) -> Result<Vec<String>> {
        self.request_as(Method::GET, "/_all_dbs", None).await
    }

    /// Get info about the database
    #[tracing::instrument(skip(self), fields(db = %self.config.database))]
    pub async fn info_db(&self) -> Result<DbInfo> {
        self.request_as(Method::GET, &self.base_path, None).await
    }

    /// Replicate changes from `source` into this database
    #[tracing::instrument(skip(self), fields(db = %self.config.database))]
    pub async fn pull_db(&self, source: &str, create_target: bool) -> Result<Value> {
        let body = serde_json::to_value(ReplicateRequest {
            source,
            target: &self.config.database,
            create_target,
        })?;
        self.request(Method::POST, "/_replicate", Some(body)).await
    }

    /// Ask the server for `count` fresh identifiers (at least one)
    #[tracing::instrument(skip(self))]
    pub async fn uuids(&self, count: usize) -> Result<Vec<String>> {
        let count = count.max(1);
        let path = if count > 1 {
            format!("/_uuids?count={count}")
        } else {
            "/_uuids".to_string()
        };

        let res: UuidsResponse = self.request_as(Method::GET, &path, None).await?;
        Ok(res.uuids)
    }

    //
    // Document operations
    //

    /// Map of every document id in the database to its current revision
    #[tracing::instrument(skip(self), fields(db = %self.config.database))]
    pub async fn list_docs(&self) -> Result<BTreeMap<String, String>> {
        let path = format!("{}_all_docs", self.base_path);
        let res: AllDocsResponse = self.request_as(Method::GET, &path, None).await?;
        Ok(res.into_revisions())
    }

    #[tracing::instrument(skip(self), fields(db = %self.config.database))]
    pub async fn get_doc(&self, id: &str) -> Result<Document> {
        let path = format!("{}{}", self.base_path, id);
        self.request_as(Method::GET, &path, None).await
    }

    /// Fetch several documents in one request. Rows come back in key order,
    /// unknown or deleted ids as [`FetchedDoc::Missing`].
    #[tracing::instrument(skip(self, ids), fields(db = %self.config.database, count = ids.len()))]
    pub async fn get_docs<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<FetchedDoc>> {
        let keys: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
        let path = format!("{}_all_docs?include_docs=true", self.base_path);

        let res: BulkGetResponse = self
            .request_as(Method::POST, &path, Some(json!({ "keys": keys })))
            .await?;
        Ok(res.into_fetched())
    }

    /// Save a document. With both `_id` and `_rev` this updates the existing
    /// revision, otherwise the server creates a new document.
    #[tracing::instrument(skip(self, doc), fields(db = %self.config.database, id = ?doc.id()))]
    pub async fn save_doc(&self, doc: &Document) -> Result<DocUpdate> {
        let body = serde_json::to_value(doc)?;
        match doc.id().filter(|_| doc.is_update()) {
            Some(id) => {
                let path = format!("{}{}", self.base_path, id);
                self.request_as(Method::PUT, &path, Some(body)).await
            }
            None => {
                self.request_as(Method::POST, &self.base_path, Some(body))
                    .await
            }
        }
    }

    /// Save many documents through `_bulk_docs`
    #[tracing::instrument(skip(self, docs), fields(db = %self.config.database, count = docs.len()))]
    pub async fn save_docs(
        &self,
        docs: &[Document],
        all_or_nothing: bool,
    ) -> Result<Vec<BulkDocResult>> {
        let path = format!("{}_bulk_docs", self.base_path);
        let body = serde_json::to_value(BulkDocsRequest {
            docs,
            all_or_nothing,
        })?;
        self.request_as(Method::POST, &path, Some(body)).await
    }

    /// Delete the document's current revision
    #[tracing::instrument(skip(self, doc), fields(db = %self.config.database, id = ?doc.id()))]
    pub async fn delete_doc(&self, doc: &Document) -> Result<DocUpdate> {
        let id = doc
            .id()
            .ok_or_else(|| ClientError::InvalidDocument("missing _id".to_string()))?;
        let rev = doc
            .rev()
            .ok_or_else(|| ClientError::InvalidDocument("missing _rev".to_string()))?;

        let path = format!("{}{}?rev={}", self.base_path, id, urlencoding::encode(rev));
        self.request_as(Method::DELETE, &path, None).await
    }

    /// Mark every document deleted in place, then write them through
    /// `_bulk_docs`.
    #[tracing::instrument(skip(self, docs), fields(db = %self.config.database, count = docs.len()))]
    pub async fn delete_docs(
        &self,
        docs: &mut [Document],
        all_or_nothing: bool,
    ) -> Result<Vec<BulkDocResult>> {
        for doc in docs.iter_mut() {
            doc.mark_deleted();
        }
        self.save_docs(docs, all_or_nothing).await
    }

    /// Query a view defined in `_design/<design_doc>`
    #[tracing::instrument(skip(self, params), fields(db = %self.config.database))]
    pub async fn view(
        &self,
        design_doc: &str,
        view_name: &str,
        params: &ViewParams,
    ) -> Result<ViewResult> {
        let path = format!(
            "{}_design/{}/_view/{}",
            self.base_path, design_doc, view_name
        );
        self.run_view(params.clone().into_query(path)).await
    }

    /// Query the built-in `_all_docs` view; accepts the same parameters as
    /// [`Client::view`].
    #[tracing::instrument(skip(self, params), fields(db = %self.config.database))]
    pub async fn view_all_docs(&self, params: &ViewParams) -> Result<ViewResult> {
        let path = format!("{}_all_docs", self.base_path);
        self.run_view(params.clone().into_query(path)).await
    }

    async fn run_view(&self, query: ViewQuery) -> Result<ViewResult> {
        let method = if query.is_post() {
            Method::POST
        } else {
            Method::GET
        };
        self.request_as(method, &query.path, query.body).await
    }
}

fn parse_response(status: StatusCode, text: &str) -> Result<Value> {
    if text.is_empty() {
        return Err(ClientError::NoData);
    }

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) if !status.is_success() => {
            return Err(ClientError::Api {
                status: status.as_u16(),
                error: canonical_error(status),
                reason: Some(text.to_string()),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if status.is_success() {
        return Ok(value);
    }

    match serde_json::from_value::<ErrorResponse>(value) {
        Ok(err) => Err(ClientError::Api {
            status: status.as_u16(),
            error: err.error,
            reason: err.reason,
        }),
        Err(_) => Err(ClientError::Api {
            status: status.as_u16(),
            error: canonical_error(status),
            reason: None,
        }),
    }
}

fn canonical_error(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unknown_error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_body_is_no_data() {
        assert!(matches!(
            parse_response(StatusCode::OK, ""),
            Err(ClientError::NoData)
        ));
        assert!(matches!(
            parse_response(StatusCode::NOT_FOUND, ""),
            Err(ClientError::NoData)
        ));
    }

    #[test]
    fn test_success_returns_json() {
        let value = parse_response(StatusCode::CREATED, r#"{"ok":true,"id":"a","rev":"1-x"}"#)
            .unwrap();
        assert_eq!(value["id"], "a");
    }

    #[test]
    fn test_document_with_error_field_is_not_a_failure() {
        let value =
            parse_response(StatusCode::OK, r#"{"_id":"log","error":"disk full"}"#).unwrap();
        assert_eq!(value["error"], "disk full");
    }

    #[test]
    fn test_api_error_echoes_reason() {
        let err = parse_response(
            StatusCode::NOT_FOUND,
            r#"{"error":"not_found","reason":"missing"}"#,
        )
        .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.reason(), Some("missing"));
        assert_eq!(err.to_string(), "Server error: 404 - not_found: missing");
    }

    #[test]
    fn test_api_error_without_error_field() {
        let err = parse_response(StatusCode::BAD_GATEWAY, r#"{"detail":"upstream"}"#).unwrap_err();
        assert_eq!(err.error_kind(), "Bad Gateway");
        assert_eq!(err.reason(), None);
    }

    #[test]
    fn test_non_json_error_body() {
        let err = parse_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.reason(), Some("<html>bad gateway</html>"));
    }

    #[test]
    fn test_malformed_success_body() {
        let err = parse_response(StatusCode::OK, "{not json").unwrap_err();
        assert!(matches!(err, ClientError::Serialization(_)));
        assert_eq!(err.error_kind(), "bad_json");
    }

    #[test]
    fn test_client_paths() {
        let client = Client::with_host("albums", "couch.local", 6984).unwrap();
        assert_eq!(client.database(), "albums");
        assert_eq!(client.base_url, "http://couch.local:6984");
        assert_eq!(client.base_path, "/albums/");
    }
}
