//! View query building
//!
//! Every parameter is JSON-encoded into the query string, except `keys`,
//! which travels as a `{"keys": [...]}` body and turns the request into a POST.

use serde_json::{json, Map, Value};

const KEYS: &str = "keys";

/// Named view options, kept in insertion order. Names are not validated;
/// anything set here is passed through to the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewParams {
    params: Vec<(String, Value)>,
}

/// A view request ready to send: path with query string, plus the `keys`
/// body when one was given.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewQuery {
    pub path: String,
    pub body: Option<Value>,
}

impl ViewQuery {
    pub fn is_post(&self) -> bool {
        self.body.is_some()
    }
}

impl ViewParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) an arbitrary parameter
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn key(self, key: impl Into<Value>) -> Self {
        self.param("key", key)
    }

    pub fn keys<I, V>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let keys: Vec<Value> = keys.into_iter().map(Into::into).collect();
        self.param(KEYS, keys)
    }

    pub fn startkey(self, key: impl Into<Value>) -> Self {
        self.param("startkey", key)
    }

    pub fn startkey_docid(self, id: &str) -> Self {
        self.param("startkey_docid", id)
    }

    pub fn endkey(self, key: impl Into<Value>) -> Self {
        self.param("endkey", key)
    }

    pub fn endkey_docid(self, id: &str) -> Self {
        self.param("endkey_docid", id)
    }

    pub fn limit(self, limit: u64) -> Self {
        self.param("limit", limit)
    }

    /// `"ok"` or `"update_after"`
    pub fn stale(self, stale: &str) -> Self {
        self.param("stale", stale)
    }

    pub fn descending(self, descending: bool) -> Self {
        self.param("descending", descending)
    }

    pub fn skip(self, skip: u64) -> Self {
        self.param("skip", skip)
    }

    pub fn group(self, group: bool) -> Self {
        self.param("group", group)
    }

    pub fn group_level(self, level: u64) -> Self {
        self.param("group_level", level)
    }

    pub fn reduce(self, reduce: bool) -> Self {
        self.param("reduce", reduce)
    }

    pub fn include_docs(self, include_docs: bool) -> Self {
        self.param("include_docs", include_docs)
    }

    pub fn inclusive_end(self, inclusive_end: bool) -> Self {
        self.param("inclusive_end", inclusive_end)
    }

    /// Split the parameters into a query string appended to `path` and an
    /// optional `keys` body.
    pub fn into_query(self, path: impl Into<String>) -> ViewQuery {
        let mut path = path.into();
        let mut body = None;
        let mut pairs = Vec::with_capacity(self.params.len());

        for (name, value) in self.params {
            if name == KEYS {
                body = Some(json!({ "keys": value }));
            } else {
                pairs.push(format!(
                    "{}={}",
                    urlencoding::encode(&name),
                    urlencoding::encode(&value.to_string())
                ));
            }
        }

        if !pairs.is_empty() {
            path.push('?');
            path.push_str(&pairs.join("&"));
        }

        tracing::trace!(%path, post = body.is_some(), "Built view query");
        ViewQuery { path, body }
    }
}

impl FromIterator<(String, Value)> for ViewParams {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        let mut params = ViewParams::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}

impl From<Map<String, Value>> for ViewParams {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}
