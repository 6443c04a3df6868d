//! Node classification.

/// What a configuration key means structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Starts a new lifecycle without choosing a side (`httplifecycle`)
    LifecycleBoundary,
    /// Request side (`request`); opens a new lifecycle unless one is awaiting a side
    RequestMarker,
    /// Response side of the current lifecycle (`response`)
    ResponseMarker,
    /// Block of header entries for the active side (`headers`)
    HeadersMarker,
    /// Anything else
    Field,
}

const KEYWORDS: &[(&str, NodeKind)] = &[
    ("httplifecycle", NodeKind::LifecycleBoundary),
    ("request", NodeKind::RequestMarker),
    ("response", NodeKind::ResponseMarker),
    ("headers", NodeKind::HeadersMarker),
];

/// Classify a key. Matching ignores case and surrounding whitespace.
pub fn classify(key: &str) -> NodeKind {
    let key = key.trim();
    KEYWORDS
        .iter()
        .find(|(keyword, _)| keyword.eq_ignore_ascii_case(key))
        .map(|(_, kind)| *kind)
        .unwrap_or(NodeKind::Field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert_eq!(classify("httplifecycle"), NodeKind::LifecycleBoundary);
        assert_eq!(classify("request"), NodeKind::RequestMarker);
        assert_eq!(classify("response"), NodeKind::ResponseMarker);
        assert_eq!(classify("headers"), NodeKind::HeadersMarker);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("Request"), NodeKind::RequestMarker);
        assert_eq!(classify(" RESPONSE "), NodeKind::ResponseMarker);
        assert_eq!(classify("HttpLifecycle"), NodeKind::LifecycleBoundary);
    }

    #[test]
    fn test_everything_else_is_a_field() {
        for key in ["method", "url", "query", "post", "status", "body", "file", "pragma", ""] {
            assert_eq!(classify(key), NodeKind::Field, "key {key:?}");
        }
    }
}
