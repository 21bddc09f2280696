use crate::ApiTransport;
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use route_kit_core::{Configuration, Error, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const BASE_URL: &str = "https://api.cloudflare.com/client/v4";

/// Multiplier applied to the retry delay after each retry
const BACKOFF_FACTOR: u32 = 2;

/// Authenticated JSON client for the Cloudflare v4 API.
///
/// The underlying connection is built on the first request, which is also
/// when missing credentials are reported. Clones share that connection.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: Arc<Configuration>,
    base_url: String,
    connection: Arc<OnceCell<reqwest::Client>>,
}

impl HttpClient {
    pub fn new(config: impl Into<Arc<Configuration>>) -> Self {
        Self::with_base_url(config, BASE_URL)
    }

    /// Point the client at another API root, e.g. a mock server or proxy
    pub fn with_base_url(config: impl Into<Arc<Configuration>>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            config: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            connection: Arc::new(OnceCell::new()),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        self.execute(Method::GET, path, query, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(Method::POST, path, &[], Some(&body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(Method::PUT, path, &[], Some(&body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value> {
        self.execute(Method::PATCH, path, &[], Some(&body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.execute(Method::DELETE, path, &[], None).await
    }

    fn connection(&self) -> Result<&reqwest::Client> {
        self.connection
            .get_or_try_init(|| build_connection(&self.config))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send one request and read its body, retrying timeouts and failed
    /// connects with exponential backoff. Only idempotent methods are resent;
    /// HTTP error responses are returned as-is.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let connection = self.connection()?;
        let url = self.url(path);
        debug!(%method, path, "Cloudflare API request");

        let mut retries = 0;
        loop {
            let mut request = connection.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let attempt = match request.send().await {
                Ok(response) => read_response(response).await,
                Err(err) => Err(err),
            };

            match attempt {
                Ok((status, bytes)) => return handle_response(status, &bytes),
                Err(err)
                    if is_transient(&err)
                        && method.is_idempotent()
                        && retries < self.config.retry_count =>
                {
                    let delay = backoff_delay(self.config.retry_delay, retries);
                    retries += 1;
                    warn!(
                        %method,
                        path,
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient transport failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(network_error(&err)),
            }
        }
    }
}

#[async_trait]
impl ApiTransport for HttpClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        HttpClient::get(self, path, query).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        HttpClient::post(self, path, body).await
    }

    async fn put(&self, path: &str, body: Value) -> Result<Value> {
        HttpClient::put(self, path, body).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value> {
        HttpClient::patch(self, path, body).await
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        HttpClient::delete(self, path).await
    }
}

fn build_connection(config: &Configuration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    for (header, value) in config.auth_headers()? {
        let name = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| Error::Configuration(format!("Invalid header name {}: {}", header, e)))?;
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            Error::Configuration(format!(
                "{} contains characters that are not allowed in an HTTP header",
                header
            ))
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .connect_timeout(config.open_timeout)
        .build()
        .map_err(|e| Error::Configuration(format!("Could not build HTTP client: {}", e)))
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Delay before retry number `retries + 1`
fn backoff_delay(initial: Duration, retries: u32) -> Duration {
    initial.saturating_mul(BACKOFF_FACTOR.saturating_pow(retries))
}

fn network_error(err: &reqwest::Error) -> Error {
    Error::Network(format!("Network error: {}", err))
}

/// Status and full body of a response; a stalled body read fails like a stalled send
async fn read_response(response: reqwest::Response) -> reqwest::Result<(StatusCode, Vec<u8>)> {
    let status = response.status();
    let bytes = response.bytes().await?;
    Ok((status, bytes.to_vec()))
}

fn handle_response(status: StatusCode, bytes: &[u8]) -> Result<Value> {
    let body = parse_body(bytes);

    if status.is_success() {
        return Ok(body);
    }

    let message = error_message(status, &body);
    debug!(status = status.as_u16(), %message, "Cloudflare API error");
    Err(Error::Api {
        message,
        status: status.as_u16(),
        body,
    })
}

/// Empty bodies become `null`; anything that isn't JSON is kept as a string
fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Human-readable message for a failed response.
///
/// Tries, in order: the envelope's `errors` array as `"code: message"`
/// entries, a top-level `message`, then the status line.
fn error_message(status: StatusCode, body: &Value) -> String {
    if let Some(object) = body.as_object() {
        if let Some(errors) = object.get("errors").and_then(Value::as_array)
            && !errors.is_empty()
        {
            return errors
                .iter()
                .map(describe_error)
                .collect::<Vec<_>>()
                .join(", ");
        }

        if let Some(message) = object.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

fn describe_error(entry: &Value) -> String {
    format!(
        "{}: {}",
        plain_text(entry.get("code")),
        plain_text(entry.get("message"))
    )
}

fn plain_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
