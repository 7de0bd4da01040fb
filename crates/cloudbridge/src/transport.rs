//! Outbound HTTP transport
//!
//! Adapters build an [`ApiRequest`], hand it to a [`RequestSigner`] and send
//! it through a [`Transport`]. The production transport is reqwest; tests
//! plug in canned transports, and [`crate::guard::ReadOnlyGuard`] wraps any
//! of them.

use crate::error::{CloudError, ErrorClassifier, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

const USER_AGENT: &str = concat!("cloudbridge/", env!("CARGO_PKG_VERSION"));

/// HTTP methods used by vendor APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and HEAD never change server state
    pub fn is_safe(self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters of one request
pub type Params = BTreeMap<String, String>;

/// Build a parameter map from literal pairs
pub fn params<const N: usize>(pairs: [(&str, &str); N]) -> Params {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Request envelope shared by every adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Query string parameters
    pub params: Params,
    /// Header names are stored lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: Params::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// URL path without scheme, host or query
    pub fn path(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        let path = match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => "/",
        };
        path.split('?').next().unwrap_or("/")
    }
}

/// Response envelope returned by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Decode the body as JSON; a failed status whose body is not JSON is
    /// classified from the status alone
    pub fn decode<T: serde::de::DeserializeOwned>(&self, classifier: &ErrorClassifier) -> Result<T> {
        match serde_json::from_str(&self.body) {
            Ok(value) => Ok(value),
            Err(_) if !self.is_success() => Err(classifier.classify_status(self.status, &self.body)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn check_status(&self, classifier: &ErrorClassifier) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(classifier.classify_status(self.status, &self.body))
        }
    }
}

/// Sends one request and returns the raw response.
///
/// Non-2xx statuses are returned as responses, not errors; the adapter
/// decides how to classify them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).send(request).await
    }
}

/// Production transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!("{} {} -> {}", request.method, request.url, status);
        Ok(ApiResponse { status, body })
    }
}

/// Region and service a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigningScope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

impl<'a> SigningScope<'a> {
    pub fn new(region: &'a str, service: &'a str) -> Self {
        Self { region, service }
    }
}

/// Vendor authentication boundary
///
/// Implementations add whatever headers or parameters the vendor scheme
/// requires. The request is final apart from the signature. Adapters
/// take a signer from the caller and never implement a vendor scheme
/// themselves.
pub trait RequestSigner: Send + Sync {
    fn sign(&self, request: &mut ApiRequest, scope: SigningScope<'_>) -> Result<()>;
}

/// Leaves requests untouched (pre-signed gateways, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSigner;

impl RequestSigner for NoopSigner {
    fn sign(&self, _request: &mut ApiRequest, _scope: SigningScope<'_>) -> Result<()> {
        Ok(())
    }
}

/// Sends a static bearer token, for gateways that accept one
#[derive(Clone)]
pub struct BearerSigner {
    token: String,
}

impl BearerSigner {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for BearerSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerSigner").finish_non_exhaustive()
    }
}

impl RequestSigner for BearerSigner {
    fn sign(&self, request: &mut ApiRequest, _scope: SigningScope<'_>) -> Result<()> {
        if self.token.is_empty() {
            return Err(CloudError::InvalidConfig("empty bearer token".to_string()));
        }
        request
            .headers
            .insert("authorization".to_string(), format!("Bearer {}", self.token));
        Ok(())
    }
}
