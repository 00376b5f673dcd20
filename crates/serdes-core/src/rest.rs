//! Blocking REST client for the schema registry.
//!
//! One request is a single synchronous HTTP exchange. Transport-level
//! failures (no HTTP reply at all) rotate the URL ring to the next
//! endpoint; an HTTP error status is the server's answer and is returned
//! to the caller as-is.

use std::sync::OnceLock;

use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;

use crate::urls::UrlRing;

/// Content type of the registry's v1 API, for both directions.
pub const SCHEMA_REGISTRY_V1_JSON: &str = "application/vnd.schemaregistry.v1+json";

const USER_AGENT: &str = concat!("serdes-core/", env!("CARGO_PKG_VERSION"));

static HTTP_CLIENT: OnceLock<Result<Client, String>> = OnceLock::new();

/// One-shot init of the process-wide HTTP client. A construction failure
/// is remembered and surfaces as a transport failure on every request.
fn http_client() -> Result<&'static Client, String> {
    let client = HTTP_CLIENT.get_or_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(SCHEMA_REGISTRY_V1_JSON));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(SCHEMA_REGISTRY_V1_JSON));
        Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| e.to_string())
    });
    client.as_ref().map_err(Clone::clone)
}

/// Outcome of one registry HTTP exchange.
///
/// `code` is the HTTP status, or -1 when no HTTP reply was received.
/// Server-reported failures carry their message in `body`; local failures
/// carry it in `error`.
#[derive(Debug)]
pub struct RestResponse {
    pub code: i32,
    pub body: Bytes,
    pub error: Option<String>,
}

impl RestResponse {
    /// Whether the exchange failed, locally or server-side.
    pub fn failed(&self) -> bool {
        self.code < 100 || self.code > 299
    }

    /// One-line human-readable description of a failed exchange.
    pub fn error_string(&self) -> String {
        match &self.error {
            Some(error) => format!("REST request failed (code {}): {}", self.code, error),
            None if self.body.is_empty() => {
                format!("REST request failed (code {}): (empty response)", self.code)
            }
            None => format!(
                "REST request failed (code {}): {}",
                self.code,
                String::from_utf8_lossy(&self.body)
            ),
        }
    }

    fn transport(error: String) -> Self {
        Self {
            code: -1,
            body: Bytes::new(),
            error: Some(error),
        }
    }
}

/// Registry client bound to one URL ring copy.
#[derive(Debug)]
pub struct RestClient {
    urls: Option<UrlRing>,
}

impl RestClient {
    /// Create a client over a URL ring; `None` makes every request fail
    /// with a transport error naming the missing configuration.
    pub fn new(urls: Option<UrlRing>) -> Self {
        Self { urls }
    }

    pub(crate) fn has_urls(&self) -> bool {
        self.urls.is_some()
    }

    /// GET `path` from the first endpoint that answers.
    pub fn get(&self, path: &str) -> RestResponse {
        self.request(Method::GET, path, None)
    }

    /// POST `body` to `path` on the first endpoint that answers.
    pub fn post(&self, path: &str, body: &[u8]) -> RestResponse {
        self.request(Method::POST, path, Some(body))
    }

    fn request(&self, method: Method, path: &str, body: Option<&[u8]>) -> RestResponse {
        let Some(urls) = &self.urls else {
            return RestResponse::transport(
                "No \"schema.registry.url\" configured".to_string(),
            );
        };

        let client = match http_client() {
            Ok(client) => client,
            Err(e) => {
                return RestResponse::transport(format!("HTTP client init failed: {}", e))
            }
        };

        let mut last_error = String::new();
        for _ in 0..urls.len() {
            // Trailing slashes on the base URL are stripped here so the
            // "/subjects/..." paths join cleanly.
            let url = format!("{}{}", urls.current().trim_end_matches('/'), path);

            let mut request = client.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.body(body.to_vec());
            }

            match request.send() {
                Ok(response) => {
                    let code = response.status().as_u16() as i32;
                    match response.bytes() {
                        Ok(body) => {
                            tracing::trace!(%url, code, len = body.len(), "registry exchange");
                            return RestResponse {
                                code,
                                body,
                                error: None,
                            };
                        }
                        // The reply broke off mid-body: treat like a
                        // transport failure and try the next endpoint.
                        Err(e) => {
                            last_error = format!("HTTP request failed: {}", e);
                            urls.rotate();
                        }
                    }
                }
                Err(e) => {
                    last_error = format!("HTTP request failed: {}", e);
                    urls.rotate();
                }
            }
        }

        RestResponse::transport(last_error)
    }
}
