//! Canned transport for adapter tests
//!
//! Enabled by the `testing` feature. Each adapter supplies a
//! [`ReplyFormat`] describing how its vendor wraps results and errors, and
//! queues answers per call.

use crate::error::{CloudError, Result};
use crate::guard::request_action;
use crate::transport::{ApiRequest, ApiResponse, RequestSigner, SigningScope, Transport};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

/// How one vendor API shapes successful and failed answers
pub trait ReplyFormat: Send + Sync + 'static {
    fn ok(action: &str, result: Value) -> ApiResponse;

    fn error(action: &str, code: &str, message: &str) -> ApiResponse;
}

/// Bare JSON: the result is the body, errors are `{"Code", "Message"}`
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReplies;

impl ReplyFormat for JsonReplies {
    fn ok(_action: &str, result: Value) -> ApiResponse {
        ApiResponse::ok(result.to_string())
    }

    fn error(_action: &str, code: &str, message: &str) -> ApiResponse {
        ApiResponse::new(400, json!({"Code": code, "Message": message}).to_string())
    }
}

/// Stamps `x-signed-scope: region/service` on every request
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeSigner;

impl RequestSigner for ScopeSigner {
    fn sign(&self, request: &mut ApiRequest, scope: SigningScope<'_>) -> Result<()> {
        request.headers.insert(
            "x-signed-scope".to_string(),
            format!("{}/{}", scope.region, scope.service),
        );
        Ok(())
    }
}

/// Key a request is answered under: its action name, or `"METHOD url"`
pub fn call_key(request: &ApiRequest) -> String {
    request_action(request).unwrap_or_else(|| format!("{} {}", request.method, request.url))
}

/// Answers each call from a queue of canned responses; the last response
/// of a queue repeats. Unexpected calls fail with an API error.
pub struct MockTransport<F = JsonReplies> {
    responses: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
    format: PhantomData<F>,
}

impl<F: ReplyFormat> MockTransport<F> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            format: PhantomData,
        })
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue `response` for calls keyed `key`
    pub fn respond(&self, key: &str, response: ApiResponse) {
        Self::lock(&self.responses)
            .entry(key.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn raw(&self, key: &str, status: u16, body: &str) {
        self.respond(key, ApiResponse::new(status, body));
    }

    pub fn ok(&self, action: &str, result: Value) {
        self.respond(action, F::ok(action, result));
    }

    pub fn error(&self, action: &str, code: &str, message: &str) {
        self.respond(action, F::error(action, code, message));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        Self::lock(&self.requests).clone()
    }

    /// Keys of every call received, in order
    pub fn actions(&self) -> Vec<String> {
        Self::lock(&self.requests).iter().map(call_key).collect()
    }
}

#[async_trait]
impl<F: ReplyFormat> Transport for MockTransport<F> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let key = call_key(&request);
        Self::lock(&self.requests).push(request);

        let mut responses = Self::lock(&self.responses);
        let queue = responses
            .get_mut(&key)
            .ok_or_else(|| CloudError::ApiError(format!("unexpected call {}", key)))?;
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.ok_or_else(|| CloudError::ApiError(format!("no response for {}", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpMethod;

    #[tokio::test]
    async fn test_last_response_repeats() {
        let transport = MockTransport::<JsonReplies>::new();
        transport.ok("DescribeVolumes", json!({"n": 1}));
        transport.ok("DescribeVolumes", json!({"n": 2}));

        let request = ApiRequest::get("https://api/").with_param("Action", "DescribeVolumes");
        let mut bodies = Vec::new();
        for _ in 0..3 {
            let response = transport.send(request.clone()).await.unwrap();
            bodies.push(response.json::<Value>().unwrap());
        }

        assert_eq!(bodies, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 2})]);
        assert_eq!(transport.actions().len(), 3);
    }

    #[tokio::test]
    async fn test_rest_calls_keyed_by_method_and_url() {
        let transport = MockTransport::<JsonReplies>::new();
        transport.raw("DELETE https://logs.tos/", 204, "");

        let response = transport
            .send(ApiRequest::new(HttpMethod::Delete, "https://logs.tos/"))
            .await
            .unwrap();
        assert_eq!(response.status, 204);

        let err = transport
            .send(ApiRequest::get("https://logs.tos/"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected call GET https://logs.tos/"));
    }

    #[tokio::test]
    async fn test_error_reply() {
        let transport = MockTransport::<JsonReplies>::new();
        transport.error("RunInstances", "QuotaExceeded", "no quota");

        let response = transport
            .send(ApiRequest::post("https://api/").with_param("Action", "RunInstances"))
            .await
            .unwrap();
        assert_eq!(response.status, 400);
        assert!(response.body.contains("QuotaExceeded"));
    }
}
