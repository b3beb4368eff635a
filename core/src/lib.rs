//! Synchronous client core for the Consul KV HTTP API.
//!
//! # Overview
//! Reads, writes or deletes a single key, optionally storing the decoded value
//! of a read in a caller-supplied environment map. Each invocation builds a
//! fresh validated [`RequestDescriptor`], performs exactly one blocking HTTP
//! call through a [`Transport`], and is then discarded.
//!
//! # Design
//! - [`KvEndpoint`] assembles `{host}{apiPrefix}{key}?token=...`, resolving
//!   `${NAME}` token placeholders against the environment map.
//! - [`KvClient`] turns descriptors into `HttpRequest` values and classifies
//!   responses; [`UreqTransport`] does the network I/O with per-call timeouts.
//! - [`decode_value`] extracts element 0's Base64 `Value` from a READ body.
//! - [`KvRunner`] merges per-invocation settings with an injected
//!   [`ConfigProvider`] and drives the stages in order. Batches run
//!   sequentially with independent results.

pub mod client;
pub mod config;
pub mod decode;
pub mod descriptor;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod operation;
pub mod probe;
pub mod transport;
pub mod types;

pub use client::KvClient;
pub use config::{ConfigProvider, EnvConfig, GlobalSettings, NoGlobalSettings};
pub use decode::decode_value;
pub use descriptor::{RequestDescriptor, Timeouts};
pub use endpoint::{normalize_storage_key, redact_token, resolve_placeholders, EnvVars, KvEndpoint};
pub use error::{ErrorKind, KvError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use operation::{KvOperation, KvRunner};
pub use probe::probe;
pub use transport::{Transport, UreqTransport};
pub use types::{KvEntry, Outcome, RequestMode};
