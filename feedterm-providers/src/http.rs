//! Shared HTTP plumbing for the adapters
//!
//! Maps transport failures, status codes and decode failures onto
//! [`FetchError`] so each adapter only deals with its own payload shape.

use std::time::Duration;

use feedterm_core::{FetchError, FetchResult};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Upstream HTTP timeout; the aggregator applies its own, usually tighter, deadline
pub(crate) const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const USER_AGENT: &str = concat!("feedterm/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client() -> Client {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request and decode its JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(request: RequestBuilder) -> FetchResult<T> {
    let response = request.send().await.map_err(transport_error)?;

    let status = response.status();
    if let Some(err) = status_error(status, response.headers()) {
        warn!("Upstream returned {}: {}", status.as_u16(), err);
        return Err(err);
    }

    let body = response.bytes().await.map_err(transport_error)?;
    debug!("Received {} bytes", body.len());
    decode(&body)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> FetchResult<T> {
    serde_json::from_slice(body).map_err(|e| FetchError::invalid_response(e.to_string()))
}

/// Map a non-success status to a fetch error
pub(crate) fn status_error(status: StatusCode, headers: &HeaderMap) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FetchError::unauthorized(format!("upstream rejected credentials ({})", status))
        }
        StatusCode::TOO_MANY_REQUESTS => FetchError::rate_limited(retry_after(headers)),
        s if s.is_server_error() => FetchError::network(format!("upstream error ({})", s)),
        s => FetchError::invalid_response(format!("unexpected status {}", s)),
    };
    Some(err)
}

/// Parse a `Retry-After` header given in seconds
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Request URLs may carry tokens, so they are stripped before the message is kept
fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_decode() {
        return FetchError::invalid_response(err.without_url().to_string());
    }
    if err.is_timeout() {
        return FetchError::network("request timed out");
    }
    FetchError::network(err.without_url().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedterm_core::ErrorKind;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_status_mapping() {
        let headers = HeaderMap::new();
        assert!(status_error(StatusCode::OK, &headers).is_none());

        let kind = |s| status_error(s, &headers).unwrap().kind();
        assert_eq!(kind(StatusCode::UNAUTHORIZED), ErrorKind::Unauthorized);
        assert_eq!(kind(StatusCode::FORBIDDEN), ErrorKind::Unauthorized);
        assert_eq!(kind(StatusCode::TOO_MANY_REQUESTS), ErrorKind::RateLimited);
        assert_eq!(kind(StatusCode::BAD_GATEWAY), ErrorKind::Network);
        assert_eq!(kind(StatusCode::NOT_FOUND), ErrorKind::InvalidResponse);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, &headers).unwrap();
        assert_eq!(err.retry_after(), Some(Duration::from_secs(12)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, &headers).unwrap();
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn test_decode_failure_is_invalid_response() {
        let result: FetchResult<Vec<u64>> = decode(b"{not json");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidResponse);
    }
}
