//! Validated, single-use description of one KV request.

use std::time::Duration;

use crate::error::KvError;
use crate::types::RequestMode;

/// Connect timeout used when neither the invocation nor the global settings
/// provide one.
pub const DEFAULT_TIMEOUT_CONNECT_MS: u64 = 10_000;
/// Response timeout used when neither the invocation nor the global settings
/// provide one.
pub const DEFAULT_TIMEOUT_RESPONSE_MS: u64 = 30_000;

/// Connect and response timeouts, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect_ms: u64,
    pub response_ms: u64,
}

impl Timeouts {
    pub fn new(connect_ms: u64, response_ms: u64) -> Self {
        Self {
            connect_ms,
            response_ms,
        }
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    pub fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_CONNECT_MS, DEFAULT_TIMEOUT_RESPONSE_MS)
    }
}

/// Everything one HTTP call needs. Only obtainable through [`RequestDescriptor::new`],
/// so a descriptor in hand has already passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    url: String,
    mode: RequestMode,
    value: Option<String>,
    timeouts: Timeouts,
    debug: bool,
}

impl RequestDescriptor {
    pub fn new(
        url: impl Into<String>,
        mode: RequestMode,
        value: Option<String>,
        timeouts: Timeouts,
        debug: bool,
    ) -> Result<Self, KvError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(KvError::validation("empty url"));
        }
        if timeouts.connect_ms == 0 {
            return Err(KvError::validation("0 connection timeout"));
        }
        if timeouts.response_ms == 0 {
            return Err(KvError::validation("0 response timeout"));
        }
        if mode == RequestMode::Write && value.as_deref().map_or(true, |v| v.trim().is_empty()) {
            return Err(KvError::validation("empty value"));
        }
        Ok(Self {
            url,
            mode,
            value,
            timeouts,
            debug,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> RequestMode {
        self.mode
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://localhost:8500/v1/kv/k";

    #[test]
    fn accepts_valid_read() {
        let d = RequestDescriptor::new(URL, RequestMode::Read, None, Timeouts::default(), false)
            .unwrap();
        assert_eq!(d.url(), URL);
        assert_eq!(d.mode(), RequestMode::Read);
        assert_eq!(d.timeouts().connect(), Duration::from_secs(10));
        assert_eq!(d.timeouts().response(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_empty_url() {
        let err = RequestDescriptor::new(" ", RequestMode::Read, None, Timeouts::default(), false)
            .unwrap_err();
        assert_eq!(err, KvError::Validation("empty url".to_string()));
    }

    #[test]
    fn write_requires_value() {
        for value in [None, Some(String::new()), Some("   ".to_string())] {
            let err =
                RequestDescriptor::new(URL, RequestMode::Write, value, Timeouts::default(), false)
                    .unwrap_err();
            assert_eq!(err, KvError::Validation("empty value".to_string()));
        }
    }

    #[test]
    fn delete_does_not_require_value() {
        assert!(
            RequestDescriptor::new(URL, RequestMode::Delete, None, Timeouts::default(), true)
                .is_ok()
        );
    }

    #[test]
    fn rejects_zero_timeouts() {
        let err = RequestDescriptor::new(URL, RequestMode::Read, None, Timeouts::new(0, 1), false)
            .unwrap_err();
        assert_eq!(err, KvError::Validation("0 connection timeout".to_string()));
        let err = RequestDescriptor::new(URL, RequestMode::Read, None, Timeouts::new(1, 0), false)
            .unwrap_err();
        assert_eq!(err, KvError::Validation("0 response timeout".to_string()));
    }
}
