//! Global (fallback) configuration.
//!
//! # Design
//! Settings that apply to every invocation unless the invocation names its
//! own value. They are handed to the runner through [`ConfigProvider`] so a
//! test can pass a literal `GlobalSettings` while the binary reads
//! `CONSULKV_*` variables with [`EnvConfig`].

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::descriptor::{Timeouts, DEFAULT_TIMEOUT_CONNECT_MS, DEFAULT_TIMEOUT_RESPONSE_MS};

pub const ENV_HOST_URL: &str = "CONSULKV_HOST_URL";
pub const ENV_API_URI: &str = "CONSULKV_API_URI";
pub const ENV_ACL_TOKEN: &str = "CONSULKV_ACL_TOKEN";
pub const ENV_TIMEOUT_CONNECT: &str = "CONSULKV_TIMEOUT_CONNECT";
pub const ENV_TIMEOUT_RESPONSE: &str = "CONSULKV_TIMEOUT_RESPONSE";
pub const ENV_DEBUG: &str = "CONSULKV_DEBUG";
pub const ENV_TEST_URI: &str = "CONSULKV_TEST_URI";

/// Fallback values for every invocation. All fields are optional; a missing
/// field falls through to the built-in default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalSettings {
    pub host_url: Option<String>,
    pub api_uri: Option<String>,
    pub acl_token: Option<String>,
    pub timeout_connect_ms: Option<u64>,
    pub timeout_response_ms: Option<u64>,
    pub debug: Option<bool>,
    /// Path probed by the connection test, relative to `host_url`.
    pub test_uri: Option<String>,
}

impl GlobalSettings {
    /// Field-wise merge where values present in `other` win.
    pub fn overlay(self, other: GlobalSettings) -> GlobalSettings {
        GlobalSettings {
            host_url: other.host_url.or(self.host_url),
            api_uri: other.api_uri.or(self.api_uri),
            acl_token: other.acl_token.or(self.acl_token),
            timeout_connect_ms: other.timeout_connect_ms.or(self.timeout_connect_ms),
            timeout_response_ms: other.timeout_response_ms.or(self.timeout_response_ms),
            debug: other.debug.or(self.debug),
            test_uri: other.test_uri.or(self.test_uri),
        }
    }

    /// Configured timeouts; an unset or zero value uses the default.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::new(
            self.timeout_connect_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMEOUT_CONNECT_MS),
            self.timeout_response_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_TIMEOUT_RESPONSE_MS),
        )
    }

    /// Read settings from a `CONSULKV_*` variable map. Timeouts that are not
    /// positive integers are replaced by the defaults with a warning.
    pub fn from_env_map(vars: &HashMap<String, String>) -> GlobalSettings {
        let text = |name: &str| {
            vars.get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        GlobalSettings {
            host_url: text(ENV_HOST_URL),
            api_uri: text(ENV_API_URI),
            acl_token: text(ENV_ACL_TOKEN),
            timeout_connect_ms: text(ENV_TIMEOUT_CONNECT)
                .map(|v| parse_timeout(ENV_TIMEOUT_CONNECT, &v, DEFAULT_TIMEOUT_CONNECT_MS)),
            timeout_response_ms: text(ENV_TIMEOUT_RESPONSE)
                .map(|v| parse_timeout(ENV_TIMEOUT_RESPONSE, &v, DEFAULT_TIMEOUT_RESPONSE_MS)),
            debug: text(ENV_DEBUG).map(|v| parse_flag(&v)),
            test_uri: text(ENV_TEST_URI),
        }
    }
}

fn parse_timeout(name: &str, raw: &str, default: u64) -> u64 {
    match raw.parse::<u64>() {
        Ok(ms) if ms > 0 => ms,
        _ => {
            warn!(variable = name, value = raw, "using default timeout of {default} ms");
            default
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on" | "enabled"
    )
}

/// Source of global settings.
pub trait ConfigProvider {
    /// `None` when no global configuration could be loaded.
    fn global_settings(&self) -> Option<GlobalSettings>;
}

impl ConfigProvider for GlobalSettings {
    fn global_settings(&self) -> Option<GlobalSettings> {
        Some(self.clone())
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProvider for &P {
    fn global_settings(&self) -> Option<GlobalSettings> {
        (**self).global_settings()
    }
}

/// Provider for hosts without any global configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGlobalSettings;

impl ConfigProvider for NoGlobalSettings {
    fn global_settings(&self) -> Option<GlobalSettings> {
        None
    }
}

/// Reads `CONSULKV_*` variables, from the process environment by default.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    vars: Option<HashMap<String, String>>,
}

impl EnvConfig {
    /// Read from the process environment on every lookup.
    pub fn from_process() -> Self {
        Self { vars: None }
    }

    /// Read from a fixed map instead of the process environment.
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self { vars: Some(vars) }
    }
}

impl ConfigProvider for EnvConfig {
    fn global_settings(&self) -> Option<GlobalSettings> {
        let settings = match &self.vars {
            Some(vars) => GlobalSettings::from_env_map(vars),
            None => GlobalSettings::from_env_map(&std::env::vars().collect()),
        };
        if settings == GlobalSettings::default() {
            return None;
        }
        Some(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reads_all_variables() {
        let settings = GlobalSettings::from_env_map(&vars(&[
            (ENV_HOST_URL, "http://consul:8500"),
            (ENV_API_URI, "/v1/kv/"),
            (ENV_ACL_TOKEN, "${TOKEN}"),
            (ENV_TIMEOUT_CONNECT, "2000"),
            (ENV_TIMEOUT_RESPONSE, "4000"),
            (ENV_DEBUG, "true"),
            (ENV_TEST_URI, "/v1/status/leader"),
        ]));
        assert_eq!(settings.host_url.as_deref(), Some("http://consul:8500"));
        assert_eq!(settings.acl_token.as_deref(), Some("${TOKEN}"));
        assert_eq!(settings.timeout_connect_ms, Some(2000));
        assert_eq!(settings.timeout_response_ms, Some(4000));
        assert_eq!(settings.debug, Some(true));
        assert_eq!(settings.test_uri.as_deref(), Some("/v1/status/leader"));
    }

    #[test]
    fn bad_timeouts_fall_back_to_defaults() {
        let settings = GlobalSettings::from_env_map(&vars(&[
            (ENV_TIMEOUT_CONNECT, "soon"),
            (ENV_TIMEOUT_RESPONSE, "0"),
        ]));
        assert_eq!(settings.timeout_connect_ms, Some(DEFAULT_TIMEOUT_CONNECT_MS));
        assert_eq!(settings.timeout_response_ms, Some(DEFAULT_TIMEOUT_RESPONSE_MS));
    }

    #[test]
    fn zero_timeouts_from_a_file_use_defaults() {
        let settings: GlobalSettings =
            serde_json::from_str(r#"{"timeoutConnectMs":0,"timeoutResponseMs":1500}"#).unwrap();
        assert_eq!(
            settings.timeouts(),
            Timeouts::new(DEFAULT_TIMEOUT_CONNECT_MS, 1500)
        );
        assert_eq!(GlobalSettings::default().timeouts(), Timeouts::default());
    }

    #[test]
    fn blank_values_are_unset() {
        let settings = GlobalSettings::from_env_map(&vars(&[(ENV_HOST_URL, "  ")]));
        assert!(settings.host_url.is_none());
    }

    #[test]
    fn env_config_without_variables_yields_none() {
        assert!(EnvConfig::from_map(HashMap::new()).global_settings().is_none());
        let provider = EnvConfig::from_map(vars(&[(ENV_HOST_URL, "http://h")]));
        assert_eq!(
            provider.global_settings().unwrap().host_url.as_deref(),
            Some("http://h")
        );
    }

    #[test]
    fn overlay_prefers_other() {
        let base = GlobalSettings {
            host_url: Some("http://env".to_string()),
            timeout_connect_ms: Some(5),
            ..GlobalSettings::default()
        };
        let file = GlobalSettings {
            host_url: Some("http://file".to_string()),
            debug: Some(true),
            ..GlobalSettings::default()
        };
        let merged = base.overlay(file);
        assert_eq!(merged.host_url.as_deref(), Some("http://file"));
        assert_eq!(merged.timeout_connect_ms, Some(5));
        assert_eq!(merged.debug, Some(true));
    }

    #[test]
    fn deserializes_camel_case_settings_file() {
        let settings: GlobalSettings = serde_json::from_str(
            r#"{"hostUrl":"http://consul:8500","timeoutConnectMs":1500,"debug":false}"#,
        )
        .unwrap();
        assert_eq!(settings.host_url.as_deref(), Some("http://consul:8500"));
        assert_eq!(settings.timeout_connect_ms, Some(1500));
        assert_eq!(settings.debug, Some(false));
        assert!(settings.api_uri.is_none());
    }
}
