//! Stubby-style YAML configuration.
//!
//! The dialect is a small, line-oriented subset of YAML:
//!
//! ```yaml
//! request:
//!   query:
//!     status: active
//!   method: GET
//!   url: /invoice
//! response:
//!   headers:
//!     content-type: application/json
//!   status: 200
//!   file: ../json/invoice.json
//! ```
//!
//! Every `request` key starts a new [`StubLifecycle`]. Parsing is lenient:
//! content that cannot be placed is reported as a [`Diagnostic`] and skipped,
//! so only failing to read the input is an error.

pub mod binder;
pub mod block;
pub mod classifier;
pub mod lines;
pub mod parser;

pub use classifier::{classify, NodeKind};
pub use parser::{parse_lines, Diagnostic, DiagnosticKind, Parsed};

use crate::error::StubConfigError;
use crate::model::StubLifecycle;
use chrono::{DateTime, Utc};
use lines::LineSource;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File extensions recognized by [`load_file`].
pub const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A parsed configuration snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct LoadedConfig {
    /// Lifecycles in file order
    pub lifecycles: Vec<StubLifecycle>,
    /// Non-fatal problems found while parsing
    pub diagnostics: Vec<Diagnostic>,
    /// Absolute path of the configuration file, when loaded from one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedConfig {
    fn new(parsed: Parsed, source: Option<PathBuf>) -> Self {
        Self {
            lifecycles: parsed.lifecycles,
            diagnostics: parsed.diagnostics,
            source,
            loaded_at: Utc::now(),
        }
    }

    /// A configuration with no lifecycles.
    pub fn empty(source: Option<PathBuf>) -> Self {
        Self::new(Parsed::default(), source)
    }

    /// Directory that relative `file` references resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn len(&self) -> usize {
        self.lifecycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifecycles.is_empty()
    }

    /// Log every diagnostic as a warning.
    pub fn log_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            warn!(
                line = diagnostic.line,
                kind = ?diagnostic.kind,
                "{}",
                diagnostic.message
            );
        }
    }
}

/// Parse configuration text held in memory.
pub fn parse_str(text: &str) -> LoadedConfig {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    LoadedConfig::new(parse_lines(text.lines()), None)
}

/// Parse configuration from a UTF-8 byte stream.
pub fn parse_reader<R: Read>(reader: R) -> Result<LoadedConfig, StubConfigError> {
    let lines = read_lines(reader)?;
    Ok(LoadedConfig::new(parse_lines(without_bom(&lines)), None))
}

/// Load a configuration file.
///
/// Files without a `.yaml` or `.yml` extension (any case) are not read and
/// yield an empty configuration.
pub fn load_file(path: impl AsRef<Path>) -> Result<LoadedConfig, StubConfigError> {
    let path = path.as_ref();
    if !is_yaml_path(path) {
        warn!(
            path = %path.display(),
            "Ignoring stub configuration without a .yaml or .yml extension"
        );
        return Ok(LoadedConfig::empty(Some(path.to_path_buf())));
    }

    let read_error = |source: io::Error| StubConfigError::Read {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_error)?;
    let lines = read_lines(file).map_err(read_error)?;
    let source = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let config = LoadedConfig::new(parse_lines(without_bom(&lines)), Some(source));
    info!(
        path = %path.display(),
        lifecycles = config.len(),
        diagnostics = config.diagnostics.len(),
        "Loaded stub configuration"
    );
    config.log_diagnostics();
    Ok(config)
}

/// Whether `path` carries a recognized configuration extension.
pub fn is_yaml_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| YAML_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn read_lines<R: Read>(reader: R) -> io::Result<Vec<String>> {
    LineSource::new(BufReader::new(reader)).collect()
}

fn without_bom(lines: &[String]) -> impl Iterator<Item = &str> {
    lines.iter().enumerate().map(|(i, line)| {
        let line = line.as_str();
        if i == 0 {
            line.strip_prefix('\u{feff}').unwrap_or(line)
        } else {
            line
        }
    })
}
