//! Request matching logic.
//!
//! Matches incoming requests against parsed stub lifecycles. The first
//! lifecycle in file order whose request matches wins.

use crate::model::{fold_name, StubLifecycle, StubRequest};
use crate::yaml::binder::parse_query_pairs;
use regex::Regex;
use std::collections::HashMap;

/// An incoming HTTP request, as seen by the matcher.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub query_string: Option<&'a str>,
    pub headers: HashMap<String, String>,
    pub body: Option<&'a [u8]>,
}

impl<'a> IncomingRequest<'a> {
    pub fn new(method: &'a str, target: &'a str) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            method,
            path,
            query_string,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: &'a [u8]) -> Self {
        self.body = Some(body);
        self
    }
}

/// Result of matching a request against lifecycles.
#[derive(Debug)]
pub struct MatchResult<'a> {
    /// Position of the matched lifecycle in the configuration
    pub index: usize,
    /// The matched lifecycle
    pub lifecycle: &'a StubLifecycle,
}

/// Request matcher engine.
#[derive(Debug)]
pub struct Matcher {
    /// Compiled url path patterns, one per lifecycle (None when the path is
    /// not a valid regex)
    path_patterns: Vec<Option<Regex>>,
}

impl Matcher {
    /// Create a new matcher from lifecycles.
    pub fn new(lifecycles: &[StubLifecycle]) -> Self {
        let path_patterns = lifecycles
            .iter()
            .map(|lifecycle| Regex::new(&format!("^(?:{})$", lifecycle.request.path())).ok())
            .collect();

        Self { path_patterns }
    }

    /// Find the first matching lifecycle for a request.
    pub fn find_match<'a>(
        &self,
        lifecycles: &'a [StubLifecycle],
        request: &IncomingRequest<'_>,
    ) -> Option<MatchResult<'a>> {
        let query_params = parse_query_string(request.query_string.unwrap_or(""));

        lifecycles
            .iter()
            .enumerate()
            .find(|(idx, lifecycle)| {
                self.matches_request(*idx, &lifecycle.request, request, &query_params)
            })
            .map(|(index, lifecycle)| MatchResult { index, lifecycle })
    }

    fn matches_request(
        &self,
        idx: usize,
        stub: &StubRequest,
        request: &IncomingRequest<'_>,
        query_params: &HashMap<String, String>,
    ) -> bool {
        // Check method
        if !stub.method.trim().is_empty() {
            let accepted = stub
                .method
                .split(',')
                .any(|m| m.trim().eq_ignore_ascii_case(request.method));
            if !accepted {
                return false;
            }
        }

        // Check path
        if !stub.url.is_empty() && !self.matches_path(idx, stub.path(), request.path) {
            return false;
        }

        // Check query parameters, from the url and from the query block
        let url_query = stub.url_query().map(parse_query_string).unwrap_or_default();
        let expected = url_query
            .iter()
            .chain(stub.query.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()));
        for (name, value) in expected {
            if query_params.get(name).map(String::as_str) != Some(value) {
                return false;
            }
        }

        // Check headers
        for (name, value) in &stub.headers {
            if find_header(&request.headers, name) != Some(value) {
                return false;
            }
        }

        // Check body
        if let Some(post) = &stub.post {
            let body = request.body.and_then(|b| std::str::from_utf8(b).ok());
            if body.map(str::trim) != Some(post.trim()) {
                return false;
            }
        }

        true
    }

    fn matches_path(&self, idx: usize, stub_path: &str, path: &str) -> bool {
        if stub_path == path {
            return true;
        }
        match self.path_patterns.get(idx) {
            Some(Some(regex)) => regex.is_match(path),
            _ => false,
        }
    }
}

/// Case-insensitive header lookup.
fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    let name = fold_name(name);
    headers
        .iter()
        .find(|(k, _)| fold_name(k) == name)
        .map(|(_, v)| v.as_str())
}

/// Parse a query string into key-value pairs.
fn parse_query_string(query: &str) -> HashMap<String, String> {
    parse_query_pairs(query)
        .map(|(key, value)| (urlencoding_decode(key), urlencoding_decode(value)))
        .collect()
}

fn decode_hex_pair(pair: Option<&[u8]>) -> Option<u8> {
    let pair = pair?;
    if !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u8::from_str_radix(std::str::from_utf8(pair).ok()?, 16).ok()
}

/// Simple URL decoding.
fn urlencoding_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => match decode_hex_pair(bytes.get(i + 1..i + 3)) {
                Some(byte) => {
                    decoded.push(byte);
                    i += 3;
                    continue;
                }
                None => decoded.push(b'%'),
            },
            b'+' => decoded.push(b' '),
            b => decoded.push(b),
        }
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}
