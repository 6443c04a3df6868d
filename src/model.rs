//! Stub lifecycle data model.
//!
//! A [`StubLifecycle`] pairs the request a client must send with the response
//! the stub server replies with. Values are produced by the YAML parser and
//! are immutable once parsing completes.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Status code used when a response does not configure one.
pub const DEFAULT_STATUS: u16 = 200;

/// One request/response stub pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StubLifecycle {
    pub request: StubRequest,
    pub response: StubResponse,
}

/// The request half of a lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StubRequest {
    /// HTTP method, possibly a comma separated list (empty = any)
    pub method: String,
    /// Path, optionally followed by `?` and a query string
    pub url: String,
    /// Expected query parameters
    pub query: BTreeMap<String, String>,
    /// Expected headers
    pub headers: HeaderMap,
    /// Expected request body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

impl StubRequest {
    /// The url without its query string.
    pub fn path(&self) -> &str {
        match self.url.split_once('?') {
            Some((path, _)) => path,
            None => &self.url,
        }
    }

    /// The query string embedded in the url, if any.
    pub fn url_query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, query)| query)
    }
}

/// The response half of a lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StubResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub headers: HeaderMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Body file, relative to the configuration file's directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Where a response body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource<'a> {
    Empty,
    Inline(&'a str),
    File(&'a Path),
}

impl StubResponse {
    /// Status code to reply with.
    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(DEFAULT_STATUS)
    }

    /// The authoritative body source. A file reference wins over inline content.
    pub fn body_source(&self) -> BodySource<'_> {
        match (&self.file, &self.body) {
            (Some(file), _) => BodySource::File(file),
            (None, Some(body)) => BodySource::Inline(body),
            (None, None) => BodySource::Empty,
        }
    }
}

/// Ordered header map with case-insensitive keys.
///
/// Keys are stored lower-cased in insertion order. Inserting an existing key
/// replaces the value without moving the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<(String, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, returning the previous value for the same name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        let name = fold_name(name);
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = fold_name(name);
        self.entries
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The stored form of a header name.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = HeaderMap::new();
        for (k, v) in iter {
            map.insert(k.as_ref(), v);
        }
        map
    }
}

impl Serialize for HeaderMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", "application/json");

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.iter().next(), Some(("content-type", "application/json")));
    }

    #[test]
    fn test_header_insert_replaces_in_place() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "text/plain");
        headers.insert("pragma", "no-cache");
        let previous = headers.insert("Content-Type", "application/json");

        assert_eq!(previous.as_deref(), Some("text/plain"));
        assert_eq!(headers.len(), 2);
        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(
            entries,
            vec![("content-type", "application/json"), ("pragma", "no-cache")]
        );
    }

    #[test]
    fn test_non_ascii_header_names() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Größe", "42");

        assert_eq!(headers.get("X-Größe"), Some("42"));
        assert_eq!(headers.get("x-GRÖẞE"), Some("42"));
        assert!(headers.contains_key(" x-größe "));
        assert_eq!(headers.insert("X-GRÖẞE", "43").as_deref(), Some("42"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_request_path_and_url_query() {
        let request = StubRequest {
            url: "/invoice?status=active".to_string(),
            ..Default::default()
        };
        assert_eq!(request.path(), "/invoice");
        assert_eq!(request.url_query(), Some("status=active"));

        let request = StubRequest {
            url: "/invoice".to_string(),
            ..Default::default()
        };
        assert_eq!(request.path(), "/invoice");
        assert_eq!(request.url_query(), None);
    }

    #[test]
    fn test_body_source_prefers_file() {
        let mut response = StubResponse {
            body: Some("inline".to_string()),
            ..Default::default()
        };
        assert_eq!(response.body_source(), BodySource::Inline("inline"));

        response.file = Some(PathBuf::from("body.json"));
        assert_eq!(
            response.body_source(),
            BodySource::File(Path::new("body.json"))
        );

        assert_eq!(StubResponse::default().body_source(), BodySource::Empty);
        assert_eq!(StubResponse::default().status_code(), 200);
    }

    #[test]
    fn test_header_map_serializes_in_order() {
        let headers: HeaderMap = [("Pragma", "no-cache"), ("Content-Type", "text/html")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"pragma":"no-cache","content-type":"text/html"}"#);
    }
}
