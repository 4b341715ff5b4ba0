// src/transport.rs
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::error::Error;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Default spoofed browser identity. Rotated to a provider-specific
/// alternate after an anti-bot block (see `provider::client`).
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Status codes worth retrying: anti-bot friction and transient upstream
/// failures. Everything else surfaces to the caller on the first attempt.
const RETRYABLE_STATUS: [u16; 6] = [403, 429, 500, 502, 503, 504];

#[derive(Debug)]
pub enum TransportError {
    Client(String),
    Request(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Client(msg) => write!(f, "HTTP client error: {msg}"),
            TransportError::Request(msg) => write!(f, "Request error: {msg}"),
        }
    }
}

impl Error for TransportError {}

/// Retry knobs. The defaults are the contract; tests shrink the backoff so
/// retry paths run in milliseconds.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_start: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 5,
            backoff_start: Duration::from_secs(1),
        }
    }
}

/// Full browser-like header set for a given user-agent string.
pub fn browser_headers(user_agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("*/*"));
    headers.insert("accept-language", HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert("priority", HeaderValue::from_static("u=1, i"));
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Not;A=Brand\";v=\"99\", \"Google Chrome\";v=\"139\", \"Chromium\";v=\"139\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"Windows\""));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-site"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
    );
    headers
}

/// Blocking GET transport with a persistent cookie store and bounded retry.
///
/// The cookie store is the session: the provider's bootstrap GET deposits
/// cookies here and subsequent search calls carry them automatically.
pub struct Transport {
    client: Client,
    policy: RetryPolicy,
}

impl Transport {
    pub fn new(policy: RetryPolicy) -> Result<Self, TransportError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Transport { client, policy })
    }

    /// GET `url` with the given query params and headers.
    ///
    /// Retries up to `max_retries` times on {403, 429, 500, 502, 503, 504}
    /// and on network-level failures, doubling the backoff each attempt and
    /// honouring a `Retry-After` header on 429. A non-retryable status is
    /// returned immediately; exhausting retries returns the last response so
    /// the caller can inspect the status (the provider layer runs its own
    /// 403 recovery on top of this).
    pub fn get(
        &self,
        url: &str,
        params: &[(&str, String)],
        headers: HeaderMap,
    ) -> Result<Response, TransportError> {
        let mut backoff = self.policy.backoff_start;

        for attempt in 0..=self.policy.max_retries {
            let result = self
                .client
                .get(url)
                .query(params)
                .headers(headers.clone())
                .send();

            match result {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if !RETRYABLE_STATUS.contains(&status) || attempt == self.policy.max_retries {
                        return Ok(resp);
                    }

                    let wait = if status == 429 {
                        resp.headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or(backoff)
                    } else {
                        backoff
                    };

                    eprintln!(
                        "warning: retry {}/{} in {:?} (HTTP {status})",
                        attempt + 1,
                        self.policy.max_retries,
                        wait,
                    );
                    thread::sleep(wait);
                    backoff *= 2;
                }
                Err(e) => {
                    if attempt == self.policy.max_retries {
                        return Err(TransportError::Request(format!(
                            "failed after {} attempts: {e}",
                            self.policy.max_retries + 1,
                        )));
                    }

                    eprintln!(
                        "warning: retry {}/{} in {:?} ({e})",
                        attempt + 1,
                        self.policy.max_retries,
                        backoff,
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                }
            }
        }

        unreachable!()
    }
}

/// Build a lowercase header name at runtime (provider referer headers use
/// historical spellings that are not reqwest constants).
pub fn header_name(name: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_start: Duration::from_millis(1),
        }
    }

    #[test]
    fn retries_transient_status_and_surfaces_last_response() {
        let server = MockServer::start();
        let flaky = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(503);
        });

        let transport = Transport::new(fast_policy(2)).unwrap();
        let resp = transport
            .get(
                &server.url("/search"),
                &[],
                browser_headers(DEFAULT_USER_AGENT),
            )
            .unwrap();

        // All attempts exhausted, last response surfaced.
        assert_eq!(resp.status().as_u16(), 503);
        flaky.assert_hits(3);
    }

    #[test]
    fn does_not_retry_non_listed_status() {
        let server = MockServer::start();
        let not_found = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(404);
        });

        let transport = Transport::new(fast_policy(3)).unwrap();
        let resp = transport
            .get(
                &server.url("/search"),
                &[],
                browser_headers(DEFAULT_USER_AGENT),
            )
            .unwrap();

        assert_eq!(resp.status().as_u16(), 404);
        not_found.assert_hits(1);
    }

    #[test]
    fn sends_browser_identity_and_query_params() {
        let server = MockServer::start();
        let search = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("stock_no", "2024A1")
                .header("user-agent", DEFAULT_USER_AGENT)
                .header("accept-language", "en-US,en;q=0.9")
                .header("sec-fetch-mode", "cors");
            then.status(200).body("{}");
        });

        let transport = Transport::new(fast_policy(0)).unwrap();
        let resp = transport
            .get(
                &server.url("/search"),
                &[("stock_no", "2024A1".to_string())],
                browser_headers(DEFAULT_USER_AGENT),
            )
            .unwrap();

        assert_eq!(resp.status().as_u16(), 200);
        search.assert();
    }
}
