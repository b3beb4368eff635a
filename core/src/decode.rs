//! Decoding of Consul `GET /v1/kv/{key}` bodies.

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::KvError;
use crate::types::KvEntry;

/// Extract and decode the value of the first entry in a KV response body.
///
/// Consul returns `[{"Key": ..., "Value": "<base64>", ...}]`. Only element 0
/// is consulted; its `Value` is Base64-decoded and read as UTF-8.
pub fn decode_value(body: &str) -> Result<String, KvError> {
    let entries: Vec<KvEntry> = serde_json::from_str(body)
        .map_err(|e| KvError::decode(format!("response is not a KV array: {e}")))?;
    let first = entries
        .into_iter()
        .next()
        .ok_or_else(|| KvError::decode("response array is empty"))?;
    let encoded = first
        .value
        .ok_or_else(|| KvError::decode("response has no `Value` field"))?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| KvError::decode(format!("value is not valid base64: {e}")))?;
    String::from_utf8(bytes).map_err(|e| KvError::decode(format!("value is not valid UTF-8: {e}")))
}
