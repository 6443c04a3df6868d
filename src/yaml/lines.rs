//! Line source and key/value splitting.

use std::borrow::Cow;
use std::io::{self, BufRead};

/// Reads UTF-8 lines from a buffered reader with line terminators stripped.
///
/// Owns the reader; the underlying handle is released when the source is
/// dropped, whether iteration finished or stopped on an error.
pub struct LineSource<R> {
    reader: R,
    buf: String,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_line(&mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                let line = self.buf.trim_end_matches(['\n', '\r']);
                Some(Ok(line.to_string()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// One raw configuration line with its position and indentation.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    /// 1-based line number
    pub number: usize,
    /// Leading whitespace width (spaces and tabs count one column each)
    pub indent: usize,
    /// Line content with surrounding whitespace removed
    pub content: &'a str,
}

impl<'a> Line<'a> {
    pub fn new(number: usize, raw: &'a str) -> Self {
        let content = raw.trim();
        let indent = if content.is_empty() {
            0
        } else {
            raw.len() - raw.trim_start().len()
        };
        Self {
            number,
            indent,
            content,
        }
    }

    /// Blank lines and full-line comments carry no configuration.
    pub fn is_ignorable(&self) -> bool {
        self.content.is_empty() || self.content.starts_with('#')
    }

    pub fn key_value(&self) -> KeyValue<'a> {
        split_key_value(self.content)
    }
}

/// A line split on its first colon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<'a> {
    /// Unquoted, lower-cased key
    pub key: String,
    /// Key as written
    pub raw_key: &'a str,
    /// Unquoted key with its case kept
    pub name: Cow<'a, str>,
    /// Trimmed value, `None` when the line has no colon
    pub value: Option<&'a str>,
}

/// Split a trimmed line into key and optional value.
///
/// A leading YAML list marker (`- request:`) is not part of the key. A quoted
/// key may contain colons or start with `#`.
pub fn split_key_value(content: &str) -> KeyValue<'_> {
    let content = match content.strip_prefix('-') {
        Some(rest) if rest.is_empty() || rest.starts_with([' ', '\t']) => rest.trim_start(),
        _ => content,
    };

    let quoted = quoted_len(content).and_then(|end| {
        let (key, rest) = content.split_at(end);
        let value = rest.trim_start().strip_prefix(':')?;
        Some((key, Some(value.trim())))
    });
    let (raw_key, value) = match quoted {
        Some(split) => split,
        None => match content.split_once(':') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (content.trim(), None),
        },
    };

    let name = unquote(raw_key);
    KeyValue {
        key: name.to_lowercase(),
        raw_key,
        name,
        value,
    }
}

/// Byte length of a leading quoted scalar, closing quote included.
fn quoted_len(content: &str) -> Option<usize> {
    let quote = content.chars().next().filter(|c| matches!(c, '\'' | '"'))?;
    let mut chars = content.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
            continue;
        }
        if c == quote {
            if quote == '\'' && chars.peek().map(|&(_, next)| next) == Some('\'') {
                chars.next();
                continue;
            }
            return Some(i + 1);
        }
    }
    None
}

/// Remove one pair of surrounding quotes.
///
/// Single-quoted values unescape `''`; double-quoted values unescape `\"` and
/// `\\`. Values such as `"a" and "b"` with an unescaped quote inside are kept
/// verbatim.
pub fn unquote(value: &str) -> Cow<'_, str> {
    let single = strip_pair(value, '\'').and_then(unescape_single);
    let double = || strip_pair(value, '"').and_then(unescape_double);
    single.or_else(double).unwrap_or(Cow::Borrowed(value))
}

fn strip_pair(value: &str, quote: char) -> Option<&str> {
    value.strip_prefix(quote)?.strip_suffix(quote)
}

fn unescape_single(inner: &str) -> Option<Cow<'_, str>> {
    if !inner.contains('\'') {
        return Some(Cow::Borrowed(inner));
    }
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\'' && chars.next() != Some('\'') {
            return None;
        }
        text.push(c);
    }
    Some(Cow::Owned(text))
}

fn unescape_double(inner: &str) -> Option<Cow<'_, str>> {
    if !inner.contains(['"', '\\']) {
        return Some(Cow::Borrowed(inner));
    }
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => match chars.peek() {
                Some(&escaped @ ('"' | '\\')) => {
                    text.push(escaped);
                    chars.next();
                }
                _ => text.push(c),
            },
            _ => text.push(c),
        }
    }
    Some(Cow::Owned(text))
}
