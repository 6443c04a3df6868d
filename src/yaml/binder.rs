//! Field binding tables.
//!
//! Each side of a lifecycle has a fixed table of attribute names and the
//! setter that writes a scalar value onto the typed model. Keys missing from
//! both tables fall through to header binding in the parser.

use crate::error::BindError;
use crate::model::{StubRequest, StubResponse};
use std::path::PathBuf;

/// How a known request attribute consumes its value.
#[derive(Clone, Copy)]
pub enum RequestField {
    Scalar(fn(&mut StubRequest, String) -> Result<(), BindError>),
    /// Opens a query map block; an inline value is parsed as a query string.
    Query,
}

pub type ResponseSetter = fn(&mut StubResponse, String) -> Result<(), BindError>;

const REQUEST_FIELDS: &[(&str, RequestField)] = &[
    ("method", RequestField::Scalar(set_method)),
    ("url", RequestField::Scalar(set_url)),
    ("query", RequestField::Query),
    ("post", RequestField::Scalar(set_post)),
];

const RESPONSE_FIELDS: &[(&str, ResponseSetter)] = &[
    ("status", set_status as ResponseSetter),
    ("body", set_body as ResponseSetter),
    ("file", set_file as ResponseSetter),
];

pub fn request_field(key: &str) -> Option<RequestField> {
    REQUEST_FIELDS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, field)| *field)
}

pub fn response_field(key: &str) -> Option<ResponseSetter> {
    RESPONSE_FIELDS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, setter)| *setter)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn set_method(request: &mut StubRequest, value: String) -> Result<(), BindError> {
    request.method = value;
    Ok(())
}

fn set_url(request: &mut StubRequest, value: String) -> Result<(), BindError> {
    request.url = value;
    Ok(())
}

fn set_post(request: &mut StubRequest, value: String) -> Result<(), BindError> {
    request.post = non_empty(value);
    Ok(())
}

fn set_status(response: &mut StubResponse, value: String) -> Result<(), BindError> {
    match value.trim().parse::<u16>() {
        Ok(status) if (100..=599).contains(&status) => {
            response.status = Some(status);
            Ok(())
        }
        _ => Err(BindError::InvalidStatus(value)),
    }
}

fn set_body(response: &mut StubResponse, value: String) -> Result<(), BindError> {
    response.body = non_empty(value);
    Ok(())
}

fn set_file(response: &mut StubResponse, value: String) -> Result<(), BindError> {
    response.file = non_empty(value).map(PathBuf::from);
    Ok(())
}

/// Parse `a=1&b=2` into key/value pairs. Keys without `=` get an empty value.
pub fn parse_query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| part.split_once('=').unwrap_or((part, "")))
}
