//! Network execution of [`HttpRequest`] values.
//!
//! # Design
//! `Transport` is the only place that performs I/O. `UreqTransport` builds a
//! new agent for every call and lets it drop when the call returns, so no
//! connection outlives a single request. Status codes are never turned into
//! errors here: a 404 comes back as an `HttpResponse` and the client decides.
//!
//! The response timeout bounds both the wait for the status line and the body
//! read, and the whole call never runs longer than connect + response.

use ureq::{Agent, RequestBuilder};

use crate::descriptor::Timeouts;
use crate::error::KvError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP request and returns its response as data.
pub trait Transport {
    fn execute(&self, request: &HttpRequest, timeouts: Timeouts) -> Result<HttpResponse, KvError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest, timeouts: Timeouts) -> Result<HttpResponse, KvError> {
        (**self).execute(request, timeouts)
    }
}

/// Blocking transport backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(timeouts: Timeouts) -> Agent {
        Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(timeouts.connect()))
            .timeout_recv_response(Some(timeouts.response()))
            .timeout_recv_body(Some(timeouts.response()))
            .timeout_global(Some(timeouts.connect() + timeouts.response()))
            .build()
            .new_agent()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest, timeouts: Timeouts) -> Result<HttpResponse, KvError> {
        let agent = Self::agent(timeouts);
        let url = request.url.as_str();

        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(agent.get(url), &request.headers).call(),
            (HttpMethod::Head, _) => with_headers(agent.head(url), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(agent.delete(url), &request.headers).call(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(agent.put(url), &request.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(agent.put(url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(map_ureq_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = if request.method == HttpMethod::Head {
            String::new()
        } else {
            response
                .body_mut()
                .read_to_string()
                .map_err(map_ureq_error)?
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn map_ureq_error(err: ureq::Error) -> KvError {
    match err {
        ureq::Error::BadUri(uri) => KvError::validation(format!("invalid uri: {uri}")),
        ureq::Error::Timeout(timeout) => KvError::Transport(format!("timed out: {timeout}")),
        other => KvError::Transport(other.to_string()),
    }
}
