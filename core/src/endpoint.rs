//! Consul KV endpoint URL construction.
//!
//! The URL is `{host}{apiPrefix}{key}` with `?token={token}` appended when an
//! ACL token is configured. A token may reference environment variables as
//! `${NAME}`; those are resolved against the caller's environment map before
//! the URL is assembled.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use url::{form_urlencoded, Url};

use crate::error::KvError;

/// Environment map consulted for token placeholders and written by READ.
pub type EnvVars = BTreeMap<String, String>;

/// API path used when no prefix is configured.
pub const DEFAULT_API_URI: &str = "/v1/kv/";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([\w+-]+)\}").expect("Invalid placeholder pattern"));

static API_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(/\w+)+/$").expect("Invalid api uri pattern"));

const REDACTED: &str = "*****";

/// Inputs needed to address one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvEndpoint {
    pub host_url: String,
    pub api_prefix: Option<String>,
    pub key: String,
    pub acl_token: Option<String>,
}

impl KvEndpoint {
    pub fn new(host_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            host_url: host_url.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_api_prefix(mut self, api_prefix: Option<String>) -> Self {
        self.api_prefix = api_prefix;
        self
    }

    pub fn with_token(mut self, acl_token: Option<String>) -> Self {
        self.acl_token = acl_token;
        self
    }

    /// Build the request URL, resolving `${NAME}` token placeholders from `env`.
    pub fn url(&self, env: &EnvVars) -> Result<String, KvError> {
        let host = self.host_url.trim();
        if host.is_empty() {
            return Err(KvError::validation("empty host url"));
        }
        let key = self.key.trim().trim_start_matches('/');
        if key.is_empty() {
            return Err(KvError::validation("empty key"));
        }
        let prefix = api_prefix(self.api_prefix.as_deref())?;

        let mut url = format!("{}{prefix}{key}", host.trim_end_matches('/'));

        if let Some(template) = self.acl_token.as_deref().filter(|t| !t.trim().is_empty()) {
            let token = resolve_placeholders(template.trim(), env)?;
            let encoded: String = form_urlencoded::byte_serialize(token.as_bytes()).collect();
            url.push_str("?token=");
            url.push_str(&encoded);
        }

        let parsed = Url::parse(&url)
            .map_err(|e| KvError::validation(format!("invalid url {}: {e}", redact_token(&url))))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(KvError::validation(format!(
                "unsupported scheme `{}`, expected http or https",
                parsed.scheme()
            )));
        }
        Ok(url)
    }
}

/// Validated API prefix, falling back to [`DEFAULT_API_URI`] when unset.
fn api_prefix(configured: Option<&str>) -> Result<&str, KvError> {
    match configured.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(DEFAULT_API_URI),
        Some(prefix) if API_URI.is_match(prefix) => Ok(prefix),
        Some(prefix) => Err(KvError::validation(format!(
            "invalid api uri `{prefix}`, it must begin and end with `/`, e.g. {DEFAULT_API_URI}"
        ))),
    }
}

/// Replace every `${NAME}` in `template` with `env[NAME]`.
///
/// Text without `${` is returned unchanged. A `${` that does not form a valid
/// placeholder, or a name that is missing or empty in `env`, is an error.
pub fn resolve_placeholders(template: &str, env: &EnvVars) -> Result<String, KvError> {
    if !template.contains("${") {
        return Ok(template.to_string());
    }

    let mut resolved = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = env
            .get(name.as_str())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                KvError::validation(format!("build parameter `{}` is not set", name.as_str()))
            })?;
        resolved.push_str(literal(template, &template[last..whole.start()])?);
        resolved.push_str(value);
        last = whole.end();
    }
    resolved.push_str(literal(template, &template[last..])?);
    Ok(resolved)
}

/// Template text between placeholders; a `${` here never formed a placeholder.
fn literal<'a>(template: &str, text: &'a str) -> Result<&'a str, KvError> {
    if text.contains("${") {
        return Err(KvError::validation(format!(
            "could not parse build parameter from `{template}`"
        )));
    }
    Ok(text)
}

/// Turn a Consul key into an environment variable name: `.` and `/` become `_`.
pub fn normalize_storage_key(key: &str) -> String {
    key.replace(['.', '/'], "_")
}

/// Replace the value of any `token` query parameter with asterisks.
pub fn redact_token(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !parsed.query_pairs().any(|(k, _)| k == "token") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { REDACTED.to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
