//! Error types.

use std::io;
use std::path::PathBuf;

/// Failure to obtain stub configuration input at all.
///
/// Malformed content never produces one of these; it degrades to
/// [`Diagnostic`](crate::yaml::Diagnostic)s instead.
#[derive(Debug, thiserror::Error)]
pub enum StubConfigError {
    #[error("Failed to read stub configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read stub configuration stream: {0}")]
    Stream(#[from] io::Error),
    #[error("Stub configuration was not loaded from a file and cannot be reloaded")]
    NoSource,
}

/// A value that could not be written onto a typed field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("Invalid status code '{0}'")]
    InvalidStatus(String),
}

/// Failure to produce a response body at serve time.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("Failed to read response body file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
