//! Consul KV request executor.
//!
//! # Design
//! `KvClient` owns only a [`Transport`] and carries no state between calls.
//! Each operation is split into a `build_*` method that turns a validated
//! [`RequestDescriptor`] into an `HttpRequest`, the transport round-trip, and
//! a status check. Building is pure, so request shape is tested without I/O.

use tracing::{debug, info};

use crate::descriptor::RequestDescriptor;
use crate::endpoint::redact_token;
use crate::error::KvError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::RequestMode;

pub const CONTENT_TYPE_PLAIN_TEXT: &str = "plain/text; charset=utf-8";
pub const ACCEPT_JSON: &str = "application/json; charset=utf-8";

/// Synchronous client for the Consul KV HTTP API.
#[derive(Debug, Clone)]
pub struct KvClient<T> {
    transport: T,
}

impl<T: Transport> KvClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// GET the key and return the raw JSON body.
    pub fn read(&self, descriptor: &RequestDescriptor) -> Result<String, KvError> {
        let request = self.build_read(descriptor);
        self.execute(descriptor, request)
    }

    /// PUT the descriptor's value and return the raw body (`true`/`false`).
    pub fn write(&self, descriptor: &RequestDescriptor) -> Result<String, KvError> {
        let request = self.build_write(descriptor)?;
        self.execute(descriptor, request)
    }

    /// DELETE the key and return the raw body (`true`/`false`).
    pub fn delete(&self, descriptor: &RequestDescriptor) -> Result<String, KvError> {
        let request = self.build_delete(descriptor);
        self.execute(descriptor, request)
    }

    pub fn build_read(&self, descriptor: &RequestDescriptor) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: descriptor.url().to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_write(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, KvError> {
        if descriptor.mode() != RequestMode::Write {
            return Err(KvError::validation(format!(
                "descriptor mode is {}, expected WRITE",
                descriptor.mode()
            )));
        }
        let body = descriptor
            .value()
            .ok_or_else(|| KvError::validation("empty value"))?;
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: descriptor.url().to_string(),
            headers: kv_headers(),
            body: Some(body.to_string()),
        })
    }

    pub fn build_delete(&self, descriptor: &RequestDescriptor) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: descriptor.url().to_string(),
            headers: kv_headers(),
            body: None,
        }
    }

    fn execute(
        &self,
        descriptor: &RequestDescriptor,
        request: HttpRequest,
    ) -> Result<String, KvError> {
        if descriptor.debug() {
            info!(method = request.method.as_str(), url = %request.url, "consul request");
        } else {
            debug!(method = request.method.as_str(), url = %redact_token(&request.url), "consul request");
        }

        let response = self.transport.execute(&request, descriptor.timeouts())?;

        if descriptor.debug() {
            info!(status = response.status, "response headers:");
            for (name, value) in &response.headers {
                info!("{name}={value}");
            }
            info!(body = %response.body, "raw content");
        }

        check_status(response)
    }
}

fn kv_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), CONTENT_TYPE_PLAIN_TEXT.to_string()),
        ("Accept".to_string(), ACCEPT_JSON.to_string()),
    ]
}

/// Map statuses outside `[200, 300)` to [`KvError::Protocol`].
pub(crate) fn check_status(response: HttpResponse) -> Result<String, KvError> {
    if response.is_success() {
        return Ok(response.body);
    }
    Err(KvError::Protocol {
        status: response.status,
        body: response.body,
    })
}
