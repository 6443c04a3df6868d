//! Zentinel Stubby
//!
//! Loads stubby-style stub configuration files and answers requests from
//! them.
//!
//! # Features
//!
//! - **Lenient Parsing**: A line-oriented reader for the stubby YAML dialect
//!   that reports misplaced content as diagnostics instead of failing
//! - **Request Matching**: Match by method, url (exact or regex), query
//!   params, headers, and post body, first match wins
//! - **Lazy Body Files**: `file:` references are read per request, relative
//!   to the configuration file
//! - **Hot Reload**: Swap in a freshly parsed configuration without blocking
//!   readers
//! - **Builder**: Generate configuration text from code
//!
//! # Example Configuration
//!
//! ```yaml
//! request:
//!   method: GET
//!   url: /invoice
//!   query:
//!     status: active
//! response:
//!   headers:
//!     content-type: application/json
//!   status: 200
//!   file: json/invoice.json
//! ```

pub mod builder;
pub mod error;
pub mod matcher;
pub mod model;
pub mod responder;
pub mod store;
pub mod watcher;
pub mod yaml;

pub use builder::YamlBuilder;
pub use error::{BindError, BodyError, StubConfigError};
pub use matcher::{IncomingRequest, Matcher};
pub use model::{StubLifecycle, StubRequest, StubResponse};
pub use responder::{StubReply, StubResponder};
pub use store::StubStore;
pub use watcher::StubWatcher;
pub use yaml::{load_file, parse_reader, parse_str, LoadedConfig};
