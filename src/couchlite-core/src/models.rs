use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

/// Document is an opaque JSON object, optionally carrying `_id` and `_rev`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build a document from any serializable value. Fails unless it
    /// serializes to a JSON object.
    pub fn from_serializable<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::to_value(value)?)
    }

    pub fn id(&self) -> Option<&str> {
        self.non_empty_str("_id")
    }

    pub fn rev(&self) -> Option<&str> {
        self.non_empty_str("_rev")
    }

    /// True when the document carries both identifier and revision, so a
    /// save must update it in place rather than create a new one.
    pub fn is_update(&self) -> bool {
        self.id().is_some() && self.rev().is_some()
    }

    /// Set the deletion marker picked up by `_bulk_docs`
    pub fn mark_deleted(&mut self) {
        self.0.insert("_deleted".to_string(), Value::Bool(true));
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.0.get("_deleted"), Some(Value::Bool(true)))
    }

    pub fn into_typed<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.0))
    }

    fn non_empty_str(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl Deref for Document {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Document {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

/// DbOk is the acknowledgement returned by database create/delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbOk {
    #[serde(default)]
    pub ok: bool,
}

/// DbInfo represents information about a database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbInfo {
    pub db_name: String,
    #[serde(default)]
    pub doc_count: u64,
    #[serde(default)]
    pub doc_del_count: u64,
    #[serde(default)]
    pub update_seq: Value,
    /// Server-specific fields (sizes, purge_seq, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /_replicate`
#[derive(Debug, Serialize)]
pub struct ReplicateRequest<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub create_target: bool,
}

#[derive(Debug, Deserialize)]
pub struct UuidsResponse {
    pub uuids: Vec<String>,
}

/// Revision info carried in `_all_docs` rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevValue {
    pub rev: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub key: Value,
    pub value: RevValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AllDocsResponse {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub offset: u64,
    pub rows: Vec<AllDocsRow>,
}

impl AllDocsResponse {
    /// Map each document id to its current revision
    pub fn into_revisions(self) -> BTreeMap<String, String> {
        self.rows
            .into_iter()
            .map(|row| (row.id, row.value.rev))
            .collect()
    }
}

/// Row of `_all_docs?include_docs=true` queried by keys
#[derive(Debug, Clone, Deserialize)]
pub struct BulkGetRow {
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub value: Option<RevValue>,
    #[serde(default)]
    pub doc: Option<Document>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkGetResponse {
    pub rows: Vec<BulkGetRow>,
}

/// Outcome of fetching one key in a multi-document get
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedDoc {
    Found(Document),
    /// Unknown or deleted key; `error` is the per-row error, if any
    Missing { key: Value, error: Option<String> },
}

impl FetchedDoc {
    pub fn document(&self) -> Option<&Document> {
        match self {
            FetchedDoc::Found(doc) => Some(doc),
            FetchedDoc::Missing { .. } => None,
        }
    }
}

impl From<BulkGetRow> for FetchedDoc {
    fn from(row: BulkGetRow) -> Self {
        match row.doc {
            Some(doc) => FetchedDoc::Found(doc),
            None => FetchedDoc::Missing {
                key: row.key,
                error: row.error,
            },
        }
    }
}

impl BulkGetResponse {
    pub fn into_fetched(self) -> Vec<FetchedDoc> {
        self.rows.into_iter().map(FetchedDoc::from).collect()
    }
}

/// Body of `POST /<db>/_bulk_docs`
#[derive(Debug, Serialize)]
pub struct BulkDocsRequest<'a> {
    pub docs: &'a [Document],
    #[serde(skip_serializing_if = "is_false")]
    pub all_or_nothing: bool,
}

/// Per-document result of a bulk write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDocResult {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BulkDocResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// DocUpdate is the id/rev pair returned after writing a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocUpdate {
    #[serde(default)]
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub doc: Option<Document>,
    #[serde(default)]
    pub error: Option<String>,
}

/// ViewResult holds the rows of a view query. Reduced views carry no
/// `total_rows`/`offset`.
#[derive(Debug, Clone, Deserialize)]
pub struct ViewResult {
    #[serde(default)]
    pub total_rows: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    pub rows: Vec<ViewRow>,
}

/// ErrorResponse represents an API error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        Document::try_from(value).unwrap()
    }

    #[test]
    fn test_is_update_needs_id_and_rev() {
        assert!(doc(json!({"_id": "a", "_rev": "1-x"})).is_update());
        assert!(!doc(json!({"_id": "a"})).is_update());
        assert!(!doc(json!({"_rev": "1-x"})).is_update());
        assert!(!doc(json!({"_id": "", "_rev": "1-x"})).is_update());
        assert!(!doc(json!({"_id": 7, "_rev": "1-x"})).is_update());
    }

    #[test]
    fn test_document_must_be_object() {
        assert!(Document::try_from(json!([1, 2])).is_err());
        assert!(Document::try_from(json!("text")).is_err());
    }

    #[test]
    fn test_mark_deleted() {
        let mut d = doc(json!({"_id": "a", "_rev": "1-x", "name": "n"}));
        assert!(!d.is_deleted());
        d.mark_deleted();
        assert!(d.is_deleted());
        assert_eq!(d["name"], "n");
        assert_eq!(
            Value::from(d),
            json!({"_id": "a", "_rev": "1-x", "name": "n", "_deleted": true})
        );
    }

    #[test]
    fn test_all_docs_into_revisions() {
        let res: AllDocsResponse = serde_json::from_value(json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "a", "key": "a", "value": {"rev": "1-x"}},
                {"id": "b", "key": "b", "value": {"rev": "1-y"}}
            ]
        }))
        .unwrap();

        let revs = res.into_revisions();
        assert_eq!(revs.len(), 2);
        assert_eq!(revs["a"], "1-x");
        assert_eq!(revs["b"], "1-y");
    }

    #[test]
    fn test_bulk_get_rows() {
        let res: BulkGetResponse = serde_json::from_value(json!({
            "total_rows": 3,
            "rows": [
                {"id": "a", "key": "a", "value": {"rev": "1-x"}, "doc": {"_id": "a", "_rev": "1-x"}},
                {"key": "zz", "error": "not_found"},
                {"id": "c", "key": "c", "value": {"rev": "2-z", "deleted": true}, "doc": null}
            ]
        }))
        .unwrap();

        let fetched = res.into_fetched();
        assert_eq!(fetched.len(), 3);
        assert_eq!(fetched[0].document().and_then(Document::id), Some("a"));
        assert_eq!(
            fetched[1],
            FetchedDoc::Missing {
                key: json!("zz"),
                error: Some("not_found".to_string())
            }
        );
        assert_eq!(
            fetched[2],
            FetchedDoc::Missing {
                key: json!("c"),
                error: None
            }
        );
    }

    #[test]
    fn test_bulk_docs_request_omits_false_flag() {
        let docs = vec![doc(json!({"a": 1}))];
        let body = serde_json::to_value(BulkDocsRequest {
            docs: &docs,
            all_or_nothing: false,
        })
        .unwrap();
        assert_eq!(body, json!({"docs": [{"a": 1}]}));

        let body = serde_json::to_value(BulkDocsRequest {
            docs: &docs,
            all_or_nothing: true,
        })
        .unwrap();
        assert_eq!(body, json!({"docs": [{"a": 1}], "all_or_nothing": true}));
    }

    #[test]
    fn test_db_info_keeps_extra_fields() {
        let info: DbInfo = serde_json::from_value(json!({
            "db_name": "testdb",
            "doc_count": 4,
            "doc_del_count": 1,
            "update_seq": "5-g1AAAA",
            "sizes": {"file": 1024}
        }))
        .unwrap();
        assert_eq!(info.db_name, "testdb");
        assert_eq!(info.doc_count, 4);
        assert_eq!(info.extra["sizes"]["file"], 1024);
    }

    #[test]
    fn test_from_serializable() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Album {
            title: String,
            year: u16,
        }

        let album = Album {
            title: "Blue".to_string(),
            year: 1971,
        };
        let d = Document::from_serializable(&album).unwrap();
        assert_eq!(d.id(), None);
        assert_eq!(d.into_typed::<Album>().unwrap(), album);
        assert!(Document::from_serializable(&vec![1, 2]).is_err());
    }
}
