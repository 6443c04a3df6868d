//! Fluent builder for stub configuration text.
//!
//! Produces the same dialect [`crate::yaml`] parses, which makes it handy
//! for writing stub files from tests:
//!
//! ```
//! use zentinel_stubby::builder::YamlBuilder;
//!
//! let yaml = YamlBuilder::new()
//!     .new_stubbed_request()
//!     .with_method("GET")
//!     .with_url("/hello")
//!     .new_stubbed_response()
//!     .with_status("200")
//!     .with_body("Hello, World!")
//!     .build();
//!
//! let config = zentinel_stubby::yaml::parse_str(&yaml);
//! assert_eq!(config.lifecycles[0].response.body.as_deref(), Some("Hello, World!"));
//! ```

use crate::yaml::block::BlockIndicator;
use std::borrow::Cow;

const FIELD_INDENT: &str = "  ";
const NESTED_INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapKind {
    Query,
    Headers,
}

impl MapKind {
    fn keyword(self) -> &'static str {
        match self {
            MapKind::Query => "query",
            MapKind::Headers => "headers",
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Scalar(&'static str, String),
    /// Rendered as a block scalar
    Block(&'static str, String),
    Map(MapKind, Vec<(String, String)>),
}

#[derive(Debug, Clone)]
struct Section {
    keyword: &'static str,
    entries: Vec<Entry>,
}

/// Builds stub configuration text one request/response pair at a time.
///
/// Entries render in call order. Repeated `with_query` or `with_headers`
/// calls on the same section are grouped under one block placed where the
/// first call happened.
#[derive(Debug, Clone, Default)]
pub struct YamlBuilder {
    sections: Vec<Section>,
}

impl YamlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request (and with it a new lifecycle).
    pub fn new_stubbed_request(mut self) -> Self {
        self.sections.push(Section {
            keyword: "request",
            entries: Vec::new(),
        });
        self
    }

    /// Start the response of the current lifecycle.
    pub fn new_stubbed_response(mut self) -> Self {
        self.sections.push(Section {
            keyword: "response",
            entries: Vec::new(),
        });
        self
    }

    pub fn with_method(self, method: impl Into<String>) -> Self {
        self.scalar("method", method.into())
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.scalar("url", url.into())
    }

    pub fn with_query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map_entry(MapKind::Query, key.into(), value.into())
    }

    /// Add a header to the current section.
    pub fn with_headers(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map_entry(MapKind::Headers, key.into(), value.into())
    }

    pub fn with_post(self, post: impl Into<String>) -> Self {
        self.block("post", post.into())
    }

    pub fn with_status(self, status: impl Into<String>) -> Self {
        self.scalar("status", status.into())
    }

    pub fn with_body(self, body: impl Into<String>) -> Self {
        self.block("body", body.into())
    }

    pub fn with_file(self, file: impl Into<String>) -> Self {
        self.scalar("file", file.into())
    }

    /// Render the configuration. Lines are joined with `\n`; the text only
    /// ends in a newline when it closes with a blank line of a kept block.
    pub fn build(self) -> String {
        let mut lines = Vec::new();
        for section in &self.sections {
            lines.push(format!("{}:", section.keyword));
            for entry in &section.entries {
                render_entry(entry, &mut lines);
            }
        }
        let mut text = lines.join("\n");
        if lines.last().is_some_and(String::is_empty) {
            text.push('\n');
        }
        text
    }

    fn current(&mut self, default_keyword: &'static str) -> &mut Section {
        if self.sections.is_empty() {
            self.sections.push(Section {
                keyword: default_keyword,
                entries: Vec::new(),
            });
        }
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    fn scalar(mut self, key: &'static str, value: String) -> Self {
        self.current("request").entries.push(Entry::Scalar(key, value));
        self
    }

    fn block(mut self, key: &'static str, value: String) -> Self {
        self.current("request").entries.push(Entry::Block(key, value));
        self
    }

    fn map_entry(mut self, kind: MapKind, key: String, value: String) -> Self {
        let section = self.current("request");
        let existing = section.entries.iter_mut().find_map(|entry| match entry {
            Entry::Map(k, pairs) if *k == kind => Some(pairs),
            _ => None,
        });
        match existing {
            Some(pairs) => pairs.push((key, value)),
            None => section.entries.push(Entry::Map(kind, vec![(key, value)])),
        }
        self
    }
}

fn render_entry(entry: &Entry, lines: &mut Vec<String>) {
    match entry {
        Entry::Scalar(key, value) => {
            lines.push(format!("{FIELD_INDENT}{key}: {}", scalar_text(value)));
        }
        Entry::Map(kind, pairs) => {
            lines.push(format!("{FIELD_INDENT}{}:", kind.keyword()));
            for (key, value) in pairs {
                lines.push(format!("{NESTED_INDENT}{}: {}", map_key(key), scalar_text(value)));
            }
        }
        Entry::Block(key, value) if is_plain_line(value) => {
            lines.push(format!("{FIELD_INDENT}{key}: >"));
            lines.push(format!("{NESTED_INDENT}{value}"));
        }
        Entry::Block(key, value) => render_literal(key, value, lines),
    }
}

/// A value that folds to itself on a single line.
fn is_plain_line(value: &str) -> bool {
    !value.is_empty() && !value.contains('\n') && !value.starts_with([' ', '\t'])
}

fn render_literal(key: &str, value: &str, lines: &mut Vec<String>) {
    let (content, chomping) = match value.strip_suffix('\n') {
        Some(content) => (content, "+"),
        None => (value, ""),
    };
    let leading_space = content
        .split('\n')
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with([' ', '\t']));
    let indent = if leading_space {
        (NESTED_INDENT.len() - FIELD_INDENT.len()).to_string()
    } else {
        String::new()
    };

    lines.push(format!("{FIELD_INDENT}{key}: |{indent}{chomping}"));
    for line in content.split('\n') {
        if line.is_empty() {
            lines.push(String::new());
        } else {
            lines.push(format!("{NESTED_INDENT}{line}"));
        }
    }
}

/// Single-quote a scalar the parser would otherwise read differently.
fn scalar_text(value: &str) -> Cow<'_, str> {
    let ambiguous = value != value.trim()
        || value.starts_with(['\'', '"', '#'])
        || BlockIndicator::parse(value).is_some();
    if ambiguous {
        quote(value)
    } else {
        Cow::Borrowed(value)
    }
}

fn map_key(key: &str) -> Cow<'_, str> {
    let ambiguous = key.contains(':') || key == "-" || key.starts_with("- ");
    if ambiguous {
        quote(key)
    } else {
        scalar_text(key)
    }
}

fn quote(value: &str) -> Cow<'_, str> {
    Cow::Owned(format!("'{}'", value.replace('\'', "''")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse_str;
    use std::path::PathBuf;

    const MULTILINE_YAML: &str = "request:\n  method: PUT\n  url: /invoice/123\n  headers:\n    content-type: application/json\n  post: >\n    {\"name\": \"milk\", \"description\": \"full\", \"department\": \"savoury\"}\nresponse:\n  headers:\n    content-type: application/json\n    pragma: no-cache\n  status: 200\n  body: >\n    {\"id\": \"123\", \"status\": \"updated\"}";

    fn invoice_builder() -> YamlBuilder {
        YamlBuilder::new()
            .new_stubbed_request()
            .with_query("status", "active")
            .with_query("type", "full")
            .with_method("GET")
            .with_url("/invoice")
            .new_stubbed_response()
            .with_headers("content-type", "application/json")
            .with_headers("pragma", "no-cache")
            .with_status("200")
            .with_file("../json/systemtest-body-response-as-file.json")
    }

    fn put_builder() -> YamlBuilder {
        YamlBuilder::new()
            .new_stubbed_request()
            .with_method("PUT")
            .with_url("/invoice/123")
            .with_headers("content-type", "application/json")
            .with_post(r#"{"name": "milk", "description": "full", "department": "savoury"}"#)
            .new_stubbed_response()
            .with_headers("content-type", "application/json")
            .with_headers("pragma", "no-cache")
            .with_status("200")
            .with_body(r#"{"id": "123", "status": "updated"}"#)
    }

    #[test]
    fn test_build_request_with_response() {
        let expected = "request:\n  query:\n    status: active\n    type: full\n  method: GET\n  url: /invoice\nresponse:\n  headers:\n    content-type: application/json\n    pragma: no-cache\n  status: 200\n  file: ../json/systemtest-body-response-as-file.json";
        assert_eq!(invoice_builder().build(), expected);
    }

    #[test]
    fn test_build_multiline_bodies() {
        assert_eq!(put_builder().build(), MULTILINE_YAML);
    }

    #[test]
    fn test_grouping_keeps_first_position() {
        let yaml = YamlBuilder::new()
            .new_stubbed_request()
            .with_headers("accept", "text/plain")
            .with_url("/a")
            .with_headers("x-id", "1")
            .build();
        assert_eq!(
            yaml,
            "request:\n  headers:\n    accept: text/plain\n    x-id: 1\n  url: /a"
        );
    }

    #[test]
    fn test_invoice_round_trip() {
        let config = parse_str(&invoice_builder().build());
        assert!(config.diagnostics.is_empty());
        assert_eq!(config.len(), 1);

        let lifecycle = &config.lifecycles[0];
        assert_eq!(lifecycle.request.method, "GET");
        assert_eq!(lifecycle.request.url, "/invoice");
        assert_eq!(lifecycle.request.query.len(), 2);
        assert_eq!(lifecycle.request.query["status"], "active");
        assert_eq!(lifecycle.request.query["type"], "full");
        assert_eq!(lifecycle.response.headers.get("pragma"), Some("no-cache"));
        assert_eq!(lifecycle.response.status, Some(200));
        assert_eq!(
            lifecycle.response.file,
            Some(PathBuf::from("../json/systemtest-body-response-as-file.json"))
        );
        assert_eq!(lifecycle.response.body, None);
    }

    #[test]
    fn test_multiline_round_trip() {
        let body = "{\n  \"id\": \"123\",\n\n  \"status\": \"updated\"\n}\n";
        let yaml = YamlBuilder::new()
            .new_stubbed_request()
            .with_method("POST")
            .with_url("/invoice")
            .with_post("line one\nline two")
            .new_stubbed_response()
            .with_status("201")
            .with_body(body)
            .build();

        let config = parse_str(&yaml);
        let lifecycle = &config.lifecycles[0];
        assert_eq!(lifecycle.request.post.as_deref(), Some("line one\nline two"));
        assert_eq!(lifecycle.request.method, "POST");
        assert_eq!(lifecycle.response.body.as_deref(), Some(body));
        assert_eq!(lifecycle.response.status, Some(201));
    }

    #[test]
    fn test_chained_lifecycles_round_trip() {
        let yaml = YamlBuilder::new()
            .new_stubbed_request()
            .with_url("/one")
            .with_headers("authorization", "secret")
            .new_stubbed_response()
            .with_status("200")
            .new_stubbed_request()
            .with_url("/two")
            .new_stubbed_response()
            .with_status("404")
            .build();

        let config = parse_str(&yaml);
        assert_eq!(config.len(), 2);
        assert_eq!(config.lifecycles[0].request.headers.get("authorization"), Some("secret"));
        assert!(config.lifecycles[1].request.headers.is_empty());
        assert_eq!(config.lifecycles[1].response.status, Some(404));
    }

    #[test]
    fn test_ambiguous_values_round_trip() {
        let yaml = YamlBuilder::new()
            .new_stubbed_request()
            .with_url(">")
            .with_method(" GET ")
            .with_headers("x-quoted", "'abc'")
            .with_headers("x-double", "\"it's\"")
            .with_query("#tag", "|+")
            .with_query("a:b", "# not a comment")
            .with_post("  indented json")
            .new_stubbed_response()
            .with_status("200")
            .with_body("a\n\n")
            .build();

        let config = parse_str(&yaml);
        assert!(config.diagnostics.is_empty(), "{:?}", config.diagnostics);
        let request = &config.lifecycles[0].request;
        assert_eq!(request.url, ">");
        assert_eq!(request.method, " GET ");
        assert_eq!(request.headers.get("x-quoted"), Some("'abc'"));
        assert_eq!(request.headers.get("x-double"), Some("\"it's\""));
        assert_eq!(request.query.get("#tag").map(String::as_str), Some("|+"));
        assert_eq!(request.query.get("a:b").map(String::as_str), Some("# not a comment"));
        assert_eq!(request.post.as_deref(), Some("  indented json"));
        assert_eq!(config.lifecycles[0].response.body.as_deref(), Some("a\n\n"));
    }

    #[test]
    fn test_block_values_round_trip() {
        let bodies = [
            "plain",
            "trailing spaces  ",
            "one\ntwo",
            "\n\nleading blank lines",
            "  indented\nthen flush",
            "\tTabbed",
            "kept\n",
            "many\n\n\n",
            "inner\n\nblank\n\n",
        ];
        for body in bodies {
            let yaml = YamlBuilder::new()
                .new_stubbed_request()
                .with_url("/a")
                .new_stubbed_response()
                .with_body(body)
                .new_stubbed_request()
                .with_url("/b")
                .with_post(body)
                .build();

            let config = parse_str(&yaml);
            assert_eq!(config.len(), 2, "{body:?}");
            assert_eq!(config.lifecycles[0].response.body.as_deref(), Some(body), "{yaml}");
            assert_eq!(config.lifecycles[1].request.post.as_deref(), Some(body), "{yaml}");
        }
    }

    #[test]
    fn test_output_is_valid_yaml() {
        let value: serde_yaml::Value = serde_yaml::from_str(&put_builder().build()).unwrap();
        assert_eq!(value["request"]["method"].as_str(), Some("PUT"));
        assert_eq!(
            value["request"]["headers"]["content-type"].as_str(),
            Some("application/json")
        );
        assert_eq!(value["response"]["status"].as_u64(), Some(200));
        // YAML clips folded scalars with a trailing newline
        assert_eq!(
            value["response"]["body"].as_str().map(str::trim_end),
            Some(r#"{"id": "123", "status": "updated"}"#)
        );
    }
}
