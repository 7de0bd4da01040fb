//! Read-only guard transport
//!
//! [`ReadOnlyGuard`] sits between an adapter and its [`Transport`]. For
//! read-only accounts it rejects every request that could mutate vendor
//! state before it leaves the process.
//!
//! The decision uses the API action name when the request carries one
//! (`Action` parameter, `X-Action` header, or the operation part of
//! `X-Amz-Target`). Actions starting with `Get`, `List`, `Describe` or
//! `Query` are reads. Requests without an action (REST-style object storage
//! APIs) are reads only for GET and HEAD.

use crate::error::{CloudError, Result};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

const READ_PREFIXES: [&str; 4] = ["Get", "List", "Describe", "Query"];

/// Called with `(service, action)` when the vendor answers 403.
///
/// For requests without an action name, `action` is `"METHOD path"`.
pub type PermissionHook = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Action name carried by a request, if any
pub fn request_action(request: &ApiRequest) -> Option<String> {
    if let Some(action) = request.param("Action").filter(|a| !a.is_empty()) {
        return Some(action.to_string());
    }
    if let Some(action) = request.header("x-action").filter(|a| !a.is_empty()) {
        return Some(action.to_string());
    }
    request
        .header("x-amz-target")
        .and_then(|target| target.rsplit('.').next())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
}

/// Whether an action name denotes a read
pub fn is_read_action(action: &str) -> bool {
    READ_PREFIXES.iter().any(|prefix| action.starts_with(prefix))
}

/// Whether a request is allowed for a read-only account
pub fn is_read_request(request: &ApiRequest) -> bool {
    match request_action(request) {
        Some(action) => is_read_action(&action),
        None => request.method.is_safe(),
    }
}

/// Transport wrapper enforcing the account's read-only flag
pub struct ReadOnlyGuard<T> {
    inner: T,
    service: String,
    read_only: bool,
    on_permission_denied: Option<PermissionHook>,
}

impl<T: Transport> ReadOnlyGuard<T> {
    pub fn new(inner: T, service: impl Into<String>, read_only: bool) -> Self {
        Self {
            inner,
            service: service.into(),
            read_only,
            on_permission_denied: None,
        }
    }

    pub fn with_permission_hook(mut self, hook: PermissionHook) -> Self {
        self.on_permission_denied = Some(hook);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T> fmt::Debug for ReadOnlyGuard<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyGuard")
            .field("service", &self.service)
            .field("read_only", &self.read_only)
            .field("permission_hook", &self.on_permission_denied.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<T: Transport> Transport for ReadOnlyGuard<T> {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let action = request_action(&request);
        let label = action
            .clone()
            .unwrap_or_else(|| format!("{} {}", request.method, request.path()));

        if self.read_only {
            if !is_read_request(&request) {
                tracing::debug!("{}: blocked {} on read-only account", self.service, label);
                return Err(CloudError::AccountReadOnly(format!(
                    "{} {}",
                    self.service, label
                )));
            }
            tracing::debug!("{}: allowed read {} on read-only account", self.service, label);
        }

        let response = self.inner.send(request).await?;

        if response.status == 403 {
            tracing::warn!("{}: permission denied for {}", self.service, label);
            if let Some(hook) = &self.on_permission_denied {
                hook(&self.service, &label);
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpMethod;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
        status: u16,
    }

    impl CountingTransport {
        fn with_status(status: u16) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status,
            }
        }
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ApiResponse::new(self.status, "{}"))
        }
    }

    fn action(name: &str) -> ApiRequest {
        ApiRequest::post("https://open.example.com/").with_param("Action", name)
    }

    #[tokio::test]
    async fn test_blocks_mutation_without_calling_inner() {
        let guard = ReadOnlyGuard::new(CountingTransport::with_status(200), "ecs", true);

        let err = guard.send(action("CreateDisk")).await.unwrap_err();

        assert_eq!(err.kind(), crate::ErrorKind::AccountReadOnly);
        assert!(err.to_string().contains("CreateDisk"));
        assert_eq!(guard.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_allows_reads() {
        let guard = ReadOnlyGuard::new(CountingTransport::with_status(200), "ecs", true);

        for name in ["DescribeDisks", "ListUsers", "GetBucketAcl", "QueryPrice"] {
            guard.send(action(name)).await.unwrap();
        }
        assert_eq!(guard.inner().calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_rest_requests_use_method() {
        let guard = ReadOnlyGuard::new(CountingTransport::with_status(200), "s3", true);

        guard
            .send(ApiRequest::new(HttpMethod::Head, "https://bucket.s3/key"))
            .await
            .unwrap();
        guard.send(ApiRequest::get("https://bucket.s3/")).await.unwrap();

        let err = guard
            .send(ApiRequest::new(HttpMethod::Put, "https://bucket.s3/key"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("PUT /key"));
        assert_eq!(guard.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_writable_account_passes_everything() {
        let guard = ReadOnlyGuard::new(CountingTransport::with_status(200), "ecs", false);

        guard.send(action("DeleteInstance")).await.unwrap();
        guard
            .send(ApiRequest::new(HttpMethod::Delete, "https://bucket/key"))
            .await
            .unwrap();
        assert_eq!(guard.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_action_sources() {
        let header = ApiRequest::post("https://api/").with_header("X-Action", "RunInstances");
        assert_eq!(request_action(&header).as_deref(), Some("RunInstances"));

        let target = ApiRequest::post("https://api/")
            .with_header("X-Amz-Target", "DynamoDB_20120810.ListTables");
        assert_eq!(request_action(&target).as_deref(), Some("ListTables"));
        assert!(is_read_request(&target));

        let both = ApiRequest::post("https://api/")
            .with_param("Action", "DescribeRegions")
            .with_header("X-Action", "DeleteVpc");
        assert_eq!(request_action(&both).as_deref(), Some("DescribeRegions"));
    }

    #[tokio::test]
    async fn test_guard_agrees_with_read_check() {
        let requests = vec![
            action("DescribeVpcs"),
            action("RunInstances"),
            ApiRequest::post("https://api/").with_header("X-Action", "ListKeys"),
            ApiRequest::post("https://api/").with_header("X-Amz-Target", "DynamoDB_20120810.PutItem"),
            ApiRequest::new(HttpMethod::Delete, "https://bucket/key"),
            ApiRequest::get("https://bucket/"),
        ];

        for request in requests {
            let guard = ReadOnlyGuard::new(CountingTransport::with_status(200), "ecs", true);
            let expected = is_read_request(&request);
            let label = format!("{} {:?}", request.method, request_action(&request));
            assert_eq!(guard.send(request).await.is_ok(), expected, "{}", label);
        }
    }

    #[test]
    fn test_prefix_heuristic_is_literal() {
        assert!(is_read_action("GetConsoleScreenshot"));
        assert!(!is_read_action("ModifyInstanceAttribute"));
        assert!(!is_read_action("describeLowercase"));
    }

    #[tokio::test]
    async fn test_permission_hook_on_403() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hook: PermissionHook = Arc::new(move |service, action| {
            sink.lock()
                .unwrap()
                .push(format!("{}/{}", service, action));
        });

        let guard = ReadOnlyGuard::new(CountingTransport::with_status(403), "iam", false)
            .with_permission_hook(hook);

        let response = guard.send(action("ListPolicies")).await.unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(*seen.lock().unwrap(), vec!["iam/ListPolicies".to_string()]);
    }
}
