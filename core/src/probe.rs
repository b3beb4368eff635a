//! Connectivity check against a Consul agent.

use tracing::info;

use crate::descriptor::Timeouts;
use crate::error::KvError;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;

/// Path probed when no test URI is configured.
pub const DEFAULT_TEST_URI: &str = "/v1/status/leader";

/// Issue `HEAD {host_url}{test_uri}` and return the status code.
///
/// Any status of 400 or above is reported as [`KvError::Protocol`]; a zero
/// timeout is rejected before anything is sent.
pub fn probe<T: Transport>(
    transport: &T,
    host_url: &str,
    test_uri: Option<&str>,
    timeouts: Timeouts,
) -> Result<u16, KvError> {
    let host = host_url.trim();
    if host.is_empty() {
        return Err(KvError::validation(
            "please enter a consul host with protocol (http/https) and port",
        ));
    }
    if timeouts.connect_ms == 0 || timeouts.response_ms == 0 {
        return Err(KvError::validation("0 timeout for the connection test"));
    }
    let test_uri = test_uri
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(DEFAULT_TEST_URI);
    let url = format!("{}{test_uri}", host.trim_end_matches('/'));
    url::Url::parse(&url)
        .map_err(|e| KvError::validation(format!("supplied consul url ({url}) was invalid: {e}")))?;

    info!(url = %url, "testing consul connectivity");
    let request = HttpRequest {
        method: HttpMethod::Head,
        url,
        headers: Vec::new(),
        body: None,
    };
    let response = transport.execute(&request, timeouts)?;
    if response.status >= 400 {
        return Err(KvError::Protocol {
            status: response.status,
            body: response.body,
        });
    }
    Ok(response.status)
}
