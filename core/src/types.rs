//! Domain types shared across the client.
//!
//! # Design
//! `KvEntry` mirrors one element of Consul's `GET /v1/kv/{key}` response but
//! is defined independently from the mock-server crate; the integration tests
//! catch schema drift between the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KvError;

/// Which KV operation an invocation performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMode {
    #[default]
    Read,
    Write,
    Delete,
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestMode::Read => "READ",
            RequestMode::Write => "WRITE",
            RequestMode::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

impl FromStr for RequestMode {
    type Err = KvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Ok(RequestMode::Read),
            "WRITE" => Ok(RequestMode::Write),
            "DELETE" => Ok(RequestMode::Delete),
            other => Err(KvError::validation(format!("unknown request mode `{other}`"))),
        }
    }
}

/// One key/value pair as returned by Consul. `value` is Base64 encoded and is
/// `None` both when absent and when Consul sends `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvEntry {
    #[serde(rename = "Key", default)]
    pub key: Option<String>,
    #[serde(rename = "CreateIndex", default)]
    pub create_index: Option<u64>,
    #[serde(rename = "ModifyIndex", default)]
    pub modify_index: Option<u64>,
    #[serde(rename = "LockIndex", default)]
    pub lock_index: Option<u64>,
    #[serde(rename = "Flags", default)]
    pub flags: Option<u64>,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Session", default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

/// Result of one successful KV operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub mode: RequestMode,
    pub key: String,
    /// Raw response body: the JSON array for READ, `true`/`false` otherwise.
    pub body: String,
    /// Decoded value, READ only.
    pub value: Option<String>,
    /// Environment variable the value was stored under, READ only.
    pub env_key: Option<String>,
}
