//! Builds replies for incoming requests from the active stub snapshot.

use crate::error::BodyError;
use crate::matcher::IncomingRequest;
use crate::model::{fold_name, BodySource, StubResponse};
use crate::store::StubStore;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A reply ready to be written to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubReply {
    pub status: u16,
    /// Headers in configured order, `content-type` first
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Index of the lifecycle that produced the reply
    pub lifecycle: Option<usize>,
}

impl StubReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = fold_name(name);
        self.headers
            .iter()
            .find(|(k, _)| fold_name(k) == name)
            .map(|(_, v)| v.as_str())
    }

    fn plain(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: body.into(),
            lifecycle: None,
        }
    }
}

/// Stub responder
///
/// Matches requests against the store's current snapshot and renders the
/// matched response. File bodies are read on every request.
pub struct StubResponder {
    store: Arc<StubStore>,
    /// Total requests processed.
    requests_total: AtomicU64,
    /// Total requests matched to lifecycles.
    requests_matched: AtomicU64,
    /// Total requests unmatched.
    requests_unmatched: AtomicU64,
}

impl StubResponder {
    pub fn new(store: Arc<StubStore>) -> Self {
        let snapshot = store.load();
        info!(
            lifecycles = snapshot.config.len(),
            "Stub responder initialized"
        );

        Self {
            store,
            requests_total: AtomicU64::new(0),
            requests_matched: AtomicU64::new(0),
            requests_unmatched: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &StubStore {
        &self.store
    }

    /// Get total requests processed.
    pub fn total_requests(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    /// Get total requests matched.
    pub fn total_matched(&self) -> u64 {
        self.requests_matched.load(Ordering::Relaxed)
    }

    /// Get total requests unmatched.
    pub fn total_unmatched(&self) -> u64 {
        self.requests_unmatched.load(Ordering::Relaxed)
    }

    /// Produce the reply for a request.
    pub fn respond(&self, request: &IncomingRequest<'_>) -> StubReply {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let snapshot = self.store.load();
        let Some(result) = snapshot
            .matcher
            .find_match(&snapshot.config.lifecycles, request)
        else {
            self.requests_unmatched.fetch_add(1, Ordering::Relaxed);
            warn!(
                method = %request.method,
                path = %request.path,
                "No matching stub found"
            );
            return StubReply::plain(
                404,
                "application/json",
                r#"{"error": "not_found", "message": "No matching stub found"}"#,
            );
        };

        self.requests_matched.fetch_add(1, Ordering::Relaxed);
        info!(
            lifecycle = result.index,
            method = %request.method,
            path = %request.path,
            "Request matched stub"
        );

        let response = &result.lifecycle.response;
        match build_reply(response, &snapshot.config.base_dir()) {
            Ok(mut reply) => {
                reply.lifecycle = Some(result.index);
                reply
            }
            Err(e) => {
                warn!(lifecycle = result.index, error = %e, "Failed to build stub response");
                let mut reply = StubReply::plain(500, "text/plain", e.to_string());
                reply.lifecycle = Some(result.index);
                reply
            }
        }
    }
}

fn build_reply(response: &StubResponse, base_dir: &Path) -> Result<StubReply, BodyError> {
    let source = response.body_source();
    let body = read_body(source, base_dir)?;

    let content_type = response
        .headers
        .get("content-type")
        .unwrap_or_else(|| content_type(source));

    let mut headers = vec![("content-type".to_string(), content_type.to_string())];
    for (name, value) in &response.headers {
        if name != "content-type" {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    Ok(StubReply {
        status: response.status_code(),
        headers,
        body,
        lifecycle: None,
    })
}

fn read_body(source: BodySource<'_>, base_dir: &Path) -> Result<Vec<u8>, BodyError> {
    match source {
        BodySource::Empty => Ok(Vec::new()),
        BodySource::Inline(body) => Ok(body.as_bytes().to_vec()),
        BodySource::File(file) => {
            let path = base_dir.join(file);
            debug!(path = %path.display(), "Reading response body file");
            std::fs::read(&path).map_err(|source| BodyError::File { path, source })
        }
    }
}

/// Content type for a body without a configured `content-type` header.
fn content_type(source: BodySource<'_>) -> &'static str {
    match source {
        BodySource::Empty | BodySource::Inline(_) => "text/plain",
        BodySource::File(file) => {
            let ext = file
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase);
            match ext.as_deref() {
                Some("json") => "application/json",
                Some("html") | Some("htm") => "text/html",
                Some("xml") => "application/xml",
                Some("txt") => "text/plain",
                Some("csv") => "text/csv",
                _ => "application/octet-stream",
            }
        }
    }
}
