//! Minimal JSON-over-HTTP client with safe logging.
//!
//! - One attempt per call: failures are reported, never retried
//! - Optional request timeout (none by default, the caller waits for the server)
//! - Error bodies are mined for a FastAPI-style `detail` field
//! - Optional *raw* request/response logging via `RISKDASH_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), riskdash_http::HttpError> {
//! let client = riskdash_http::HttpClient::new("http://localhost:8000")?;
//! let health: serde_json::Value = client.get_json("/api/v1/health").await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), decode failures and final
//! errors, plus raw request/response lines (target `http.raw`) when
//! `RISKDASH_HTTP_RAW=1`. Every logged body passes through [`redact_body`]
//! first, so card ids only ever appear masked.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "RISKDASH_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024; // cap raw body logs (64 KiB)
const SNIPPET_MAX: usize = 500;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

/// Render a best-effort curl command for repro/debug. The body is redacted.
fn make_curl(method: &Method, url: &Url, body: Option<&[u8]>) -> String {
    let mut parts = vec![
        "curl".to_string(),
        format!("-X{}", method),
        "-H 'Content-Type: application/json'".to_string(),
    ];
    if let Some(bytes) = body {
        let bytes = redact_body(bytes);
        match std::str::from_utf8(&bytes) {
            Ok(s) => {
                let s = truncate_utf8(s, RAW_MAX_BODY);
                parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
            }
            Err(_) => parts.push(format!("--data-binary @- # ({} bytes)", bytes.len())),
        }
    }
    parts.push(format!("'{}'", url.as_str()));
    parts.join(" ")
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    /// No response could be obtained. Carries the underlying failure description.
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    /// The server answered with a non-2xx status.
    #[error("server returned error {status}, request_id={request_id}")]
    Api {
        status: StatusCode,
        detail: Option<String>,
        request_id: String,
    },
}

// ==============================
// Client
// ==============================

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub request_timeout: Option<Duration>,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```
    /// use riskdash_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("http://localhost:8000")?;
    /// assert!(client.request_timeout.is_none());
    /// assert_eq!(client.base().as_str(), "http://localhost:8000/");
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::with_connect_timeout(base, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Like [`HttpClient::new`] with an explicit TCP connect timeout.
    pub fn with_connect_timeout(base: &str, connect: Duration) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(connect)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            request_timeout: None,
        })
    }

    /// Bound the whole request (send + body). `None` waits indefinitely.
    ///
    /// ```
    /// use riskdash_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("http://localhost:8000")?
    ///     .with_timeout(Some(Duration::from_secs(2)));
    /// assert_eq!(client.request_timeout, Some(Duration::from_secs(2)));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Option<Duration>) -> Self {
        self.request_timeout = dur;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request_json_internal(Method::POST, path, Some(body))
            .await
    }

    /// GET and decode a JSON response.
    pub async fn get_json<T>(&self, path: &str) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.request_json_internal::<(), T>(Method::GET, path, None)
            .await
    }

    // ==============================
    // Core request implementation
    // ==============================

    async fn request_json_internal<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .header(ACCEPT, "application/json");
        if let Some(timeout) = self.request_timeout {
            rb = rb.timeout(timeout);
        }

        // Serialize up front so the exact bytes can be logged.
        let request_body_bytes = match body {
            Some(b) => Some(serde_json::to_vec(b).map_err(|e| HttpError::Build(e.to_string()))?),
            None => None,
        };
        if let Some(bytes) = &request_body_bytes {
            rb = rb
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone());
        }

        let req_id = Uuid::new_v4().simple().to_string();

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%format!("{}{}", url.host_str().unwrap_or("-"), url.path()),
            timeout_ms=?self.request_timeout.map(|t| t.as_millis() as u64),
            has_body=%body.is_some(),
            "http.request.start"
        );

        if raw_enabled() {
            let curl = make_curl(&method, &url, request_body_bytes.as_deref());
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }

        // ----- Send -----
        let t0 = Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let message = describe_reqwest_error(&err);
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.send");
            HttpError::Network(message)
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let message = describe_reqwest_error(&err);
            tracing::warn!(req_id=%req_id, message=%message, "http.network_error.body");
            HttpError::Network(message)
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let server_req_id = response_request_id(&headers);

        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            x_request_id=%server_req_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let redacted = redact_body(&bytes);
            let text = String::from_utf8_lossy(&redacted);
            let truncated = text.len() > RAW_MAX_BODY;
            tracing::info!(
                target:"http.raw",
                %req_id,
                status=%status,
                duration_ms=dur_ms,
                body=%truncate_utf8(&text, RAW_MAX_BODY),
                truncated
            );
        }

        let snippet = snip_body(&bytes);
        tracing::trace!(
            req_id=%req_id,
            body_snippet=%snippet,
            "http.response.body_snippet"
        );

        // ----- Success path -----
        if status.is_success() {
            return serde_json::from_slice::<T>(&bytes).map_err(|e| {
                tracing::warn!(
                    req_id=%req_id,
                    serde_line=%e.line(),
                    serde_col=%e.column(),
                    serde_err=%e.to_string(),
                    body_snippet=%snippet,
                    "http.response.decode_error"
                );
                HttpError::Decode(e.to_string(), snippet)
            });
        }

        // ----- Non-success -----
        let detail = extract_error_detail(&bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            detail=?detail,
            x_request_id=%server_req_id,
            body_snippet=%snippet,
            "http.error"
        );
        Err(HttpError::Api {
            status,
            detail,
            request_id: server_req_id,
        })
    }
}

// ==============================
// Helpers
// ==============================

/// Pull a human-readable description out of an error body.
///
/// A non-empty string `detail` is returned as-is. A FastAPI validation array
/// (`[{"loc": [...], "msg": "..."}]`) is flattened to `loc: msg; ...`.
/// Anything else yields `None`.
///
/// ```
/// use riskdash_http::extract_error_detail;
///
/// assert_eq!(
///     extract_error_detail(br#"{"detail":"card not found"}"#).as_deref(),
///     Some("card not found")
/// );
/// assert_eq!(extract_error_detail(b"<html>bad gateway</html>"), None);
/// ```
pub fn extract_error_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(validation_issue).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

fn validation_issue(item: &Value) -> Option<String> {
    let msg = item.get("msg")?.as_str()?;
    let loc = item
        .get("loc")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| match p {
                    Value::String(s) if s != "body" => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default();
    if loc.is_empty() {
        Some(msg.to_string())
    } else {
        Some(format!("{loc}: {msg}"))
    }
}

// ==============================
// Redaction
// ==============================

const CARD_FIELD: &str = "card_id";

/// Card id reduced to its last four characters.
///
/// ```
/// assert_eq!(riskdash_http::mask_card_id("4111111111111111"), "****1111");
/// assert_eq!(riskdash_http::mask_card_id("ab"), "****ab");
/// ```
pub fn mask_card_id(card_id: &str) -> String {
    let chars: Vec<char> = card_id.chars().collect();
    let start = chars.len().saturating_sub(4);
    let tail: String = chars[start..].iter().collect();
    format!("****{tail}")
}

/// Mask card ids inside a JSON body before it is logged.
///
/// Any string under a `card_id` key is masked, at any depth. So is the
/// `input` echoed by a validation issue whose `loc` ends in `card_id`.
/// Bodies that are not JSON, or carry no card id, come back untouched.
pub fn redact_body(body: &[u8]) -> Cow<'_, [u8]> {
    let Ok(mut value) = serde_json::from_slice::<Value>(body) else {
        return Cow::Borrowed(body);
    };
    if !redact_value(&mut value) {
        return Cow::Borrowed(body);
    }
    match serde_json::to_vec(&value) {
        Ok(bytes) => Cow::Owned(bytes),
        Err(_) => Cow::Borrowed(&b"<unloggable body>"[..]),
    }
}

fn redact_value(value: &mut Value) -> bool {
    match value {
        Value::Object(map) => {
            let mut changed = false;
            let echoes_card = map
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .and_then(Value::as_str)
                == Some(CARD_FIELD);
            for (key, child) in map.iter_mut() {
                let masks_here = key == CARD_FIELD || (echoes_card && key == "input");
                if masks_here {
                    if let Value::String(s) = child {
                        let masked = mask_card_id(s);
                        *s = masked;
                        changed = true;
                        continue;
                    }
                }
                changed |= redact_value(child);
            }
            changed
        }
        Value::Array(items) => items
            .iter_mut()
            .fold(false, |changed, item| redact_value(item) | changed),
        _ => false,
    }
}

/// reqwest's top-level message hides the cause ("error sending request");
/// append the source chain so "connection refused" reaches the operator.
fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn response_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn snip_body(body: &[u8]) -> String {
    let redacted = redact_body(body);
    let text = String::from_utf8_lossy(&redacted);
    if text.len() > SNIPPET_MAX {
        format!("{}...", truncate_utf8(&text, SNIPPET_MAX))
    } else {
        text.into_owned()
    }
}
