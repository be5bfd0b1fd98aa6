use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::session::Session;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Failure of a single gateway call. `Display` is the text shown in a
/// failed view.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("Authentication failed")]
    Auth,

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl FetchError {
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Auth => Some(401),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Option<Value>) -> Self {
        Self::new(Method::POST, endpoint).with_body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, endpoint).with_body(Some(body))
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::DELETE, endpoint)
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    fn with_body(mut self, body: Option<Value>) -> Self {
        self.body = body;
        self
    }
}

/// Anything that can turn an [`ApiRequest`] into a JSON value.
pub trait Fetch {
    fn send(&self, request: ApiRequest) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

#[derive(Clone, Debug)]
pub struct GatewayOptions {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            proxy: None,
        }
    }
}

/// HTTP boundary of the client. Attaches the session's bearer token, turns
/// every failure into a [`FetchError`] and never retries.
#[derive(Clone, Debug)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
    session: Session,
}

impl Gateway {
    pub fn new(options: GatewayOptions, session: Session) -> Result<Self, GatewayError> {
        let base_url = options.base_url.trim().trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(GatewayError::InvalidBaseUrl {
                url: options.base_url,
            });
        }
        let client = build_client(options.proxy.as_deref(), options.timeout_seconds)?;
        Ok(Self {
            client,
            base_url,
            timeout_seconds: options.timeout_seconds,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Relative endpoints are appended to the base URL, absolute ones are
    /// used as given.
    pub fn resolve_url(&self, endpoint: &str) -> Result<reqwest::Url, FetchError> {
        let endpoint = endpoint.trim();
        let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
        };
        reqwest::Url::parse(&raw).map_err(|_| FetchError::InvalidEndpoint(endpoint.to_string()))
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value, FetchError> {
        self.send(ApiRequest::get(endpoint)).await
    }

    pub async fn get_with_query(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        let mut request = ApiRequest::get(endpoint);
        for (k, v) in query {
            request = request.with_query(k, v);
        }
        self.send(request).await
    }

    pub async fn post(&self, endpoint: &str, body: Option<Value>) -> Result<Value, FetchError> {
        self.send(ApiRequest::post(endpoint, body)).await
    }

    pub async fn put(&self, endpoint: &str, body: Value) -> Result<Value, FetchError> {
        self.send(ApiRequest::put(endpoint, body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value, FetchError> {
        self.send(ApiRequest::delete(endpoint)).await
    }

    async fn execute(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let url = self.resolve_url(&request.endpoint)?;
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_seconds))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout_seconds))?;

        interpret_response(status, &body)
    }
}

impl Fetch for Gateway {
    async fn send(&self, request: ApiRequest) -> Result<Value, FetchError> {
        let label = format!("{} {}", request.method, request.endpoint);
        let result = self.execute(request).await;
        if let Err(e) = result.as_ref() {
            warn!("{label} failed: {e}");
            if e.is_auth() {
                if let Err(e) = self.session.logout() {
                    warn!("failed to clear session after 401: {e}");
                }
            }
        }
        result
    }
}

fn build_client(proxy: Option<&str>, timeout_seconds: u64) -> Result<reqwest::Client, GatewayError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!("merchview/", env!("CARGO_PKG_VERSION"))),
    );

    let timeout = Duration::from_secs(if timeout_seconds == 0 {
        DEFAULT_TIMEOUT_SECONDS
    } else {
        timeout_seconds
    });
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout);

    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| GatewayError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| GatewayError::HttpClientBuild { source: e })
}

fn transport_error(e: reqwest::Error, timeout_seconds: u64) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            seconds: timeout_seconds,
        }
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Classifies a raw response. 401 is an authentication failure, other
/// non-2xx statuses carry the server's `error` or `message` text when there
/// is one, and an empty success body reads as `null`.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<Value, FetchError> {
    if status == 401 {
        return Err(FetchError::Auth);
    }
    if !(200..300).contains(&status) {
        return Err(FetchError::Http {
            status,
            message: error_message(status, body),
        });
    }
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))
}

pub fn error_message(status: u16, body: &[u8]) -> String {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let server_text = parsed.as_ref().and_then(|v| {
        ["error", "message"]
            .iter()
            .filter_map(|k| v.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
    });
    server_text.unwrap_or_else(|| format!("HTTP error! status: {status}"))
}
