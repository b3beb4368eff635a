//! Orchestration of READ / WRITE / DELETE invocations.
//!
//! # Design
//! A `KvOperation` is the per-invocation configuration: one struct with
//! optional fields. `KvRunner` fills the gaps from its [`ConfigProvider`] and
//! the built-in defaults, builds the URL and a validated descriptor, then runs
//! exactly one request. Nothing survives between runs except what READ writes
//! into the caller's environment map.

use serde::Deserialize;
use tracing::{error, info, info_span, warn};

use crate::client::KvClient;
use crate::config::{ConfigProvider, GlobalSettings};
use crate::decode::decode_value;
use crate::descriptor::{
    RequestDescriptor, Timeouts, DEFAULT_TIMEOUT_CONNECT_MS, DEFAULT_TIMEOUT_RESPONSE_MS,
};
use crate::endpoint::{normalize_storage_key, redact_token, EnvVars, KvEndpoint};
use crate::error::KvError;
use crate::transport::Transport;
use crate::types::{Outcome, RequestMode};

/// One configured KV invocation. Unset fields fall back to the global
/// settings, then to the built-in defaults. A zero timeout counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvOperation {
    pub key: String,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub value: Option<String>,
    /// Environment variable to store a READ result under; defaults to `key`.
    #[serde(default)]
    pub env_key: Option<String>,
    #[serde(default)]
    pub host_url: Option<String>,
    #[serde(default)]
    pub api_uri: Option<String>,
    #[serde(default)]
    pub acl_token: Option<String>,
    #[serde(default)]
    pub timeout_connect_ms: Option<u64>,
    #[serde(default)]
    pub timeout_response_ms: Option<u64>,
    #[serde(default)]
    pub debug: Option<bool>,
    /// Skip the global settings entirely for this invocation.
    #[serde(default)]
    pub ignore_global_settings: bool,
}

impl KvOperation {
    pub fn read(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mode: RequestMode::Read,
            ..Self::default()
        }
    }

    pub fn write(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mode: RequestMode::Write,
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            mode: RequestMode::Delete,
            ..Self::default()
        }
    }

    /// Variable name a READ result is stored under.
    pub fn storage_key(&self) -> String {
        let raw = self
            .env_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(self.key.trim());
        normalize_storage_key(raw)
    }
}

/// Runs [`KvOperation`]s against one transport and one configuration source.
#[derive(Debug, Clone)]
pub struct KvRunner<P, T> {
    config: P,
    client: KvClient<T>,
}

impl<P: ConfigProvider, T: Transport> KvRunner<P, T> {
    pub fn new(config: P, transport: T) -> Self {
        Self {
            config,
            client: KvClient::new(transport),
        }
    }

    /// Resolve settings, build the URL and validate, without any I/O.
    pub fn descriptor(&self, op: &KvOperation, env: &EnvVars) -> Result<RequestDescriptor, KvError> {
        let global = if op.ignore_global_settings {
            GlobalSettings::default()
        } else {
            self.config.global_settings().unwrap_or_else(|| {
                warn!("could not load global settings");
                GlobalSettings::default()
            })
        };

        let host_url = first_text(&op.host_url, &global.host_url)
            .ok_or_else(|| KvError::validation("host url is not configured"))?;
        let endpoint = KvEndpoint::new(host_url, op.key.as_str())
            .with_api_prefix(first_text(&op.api_uri, &global.api_uri))
            .with_token(first_text(&op.acl_token, &global.acl_token));
        let url = endpoint.url(env)?;

        let timeouts = Timeouts::new(
            first_positive(op.timeout_connect_ms, global.timeout_connect_ms)
                .unwrap_or(DEFAULT_TIMEOUT_CONNECT_MS),
            first_positive(op.timeout_response_ms, global.timeout_response_ms)
                .unwrap_or(DEFAULT_TIMEOUT_RESPONSE_MS),
        );
        let debug = op.debug.or(global.debug).unwrap_or(false);

        RequestDescriptor::new(url, op.mode, op.value.clone(), timeouts, debug)
    }

    /// Run one invocation. On READ success the decoded value is inserted into
    /// `env`; on any failure `env` is left untouched.
    pub fn run(&self, op: &KvOperation, env: &mut EnvVars) -> Result<Outcome, KvError> {
        let span = info_span!("kv_operation", mode = %op.mode, key = %op.key);
        let _enter = span.enter();

        let descriptor = self.descriptor(op, env)?;
        info!(url = %redact_token(descriptor.url()), "consul url for k/v {}", op.mode);

        match op.mode {
            RequestMode::Read => {
                let body = self.client.read(&descriptor)?;
                let value = decode_value(&body)?;
                let env_key = op.storage_key();
                if descriptor.debug() {
                    info!("consul k/v pair: {}={}", op.key, value);
                }
                env.insert(env_key.clone(), value.clone());
                info!(env_key = %env_key, "stored env variable");
                Ok(Outcome {
                    mode: op.mode,
                    key: op.key.clone(),
                    body,
                    value: Some(value),
                    env_key: Some(env_key),
                })
            }
            RequestMode::Write | RequestMode::Delete => {
                let body = if op.mode == RequestMode::Write {
                    self.client.write(&descriptor)?
                } else {
                    self.client.delete(&descriptor)?
                };
                if body.trim() == "false" {
                    warn!("consul reported the {} was not applied", op.mode);
                }
                Ok(Outcome {
                    mode: op.mode,
                    key: op.key.clone(),
                    body,
                    value: None,
                    env_key: None,
                })
            }
        }
    }

    /// Run every operation in order. Each result is independent: a failure
    /// is logged and the next operation still runs.
    pub fn run_batch(
        &self,
        ops: &[KvOperation],
        env: &mut EnvVars,
    ) -> Vec<Result<Outcome, KvError>> {
        ops.iter()
            .map(|op| {
                let result = self.run(op, env);
                if let Err(err) = &result {
                    error!(key = %op.key, mode = %op.mode, error = %err, "consul k/v operation failed");
                }
                result
            })
            .collect()
    }
}

fn first_text(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
    [primary, fallback]
        .into_iter()
        .flatten()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_positive(primary: Option<u64>, fallback: Option<u64>) -> Option<u64> {
    primary.filter(|v| *v > 0).or(fallback.filter(|v| *v > 0))
}
