//! VolcEngine OpenAPI client
//!
//! OpenAPI calls are query-style requests carrying `Action` and `Version`.
//! Responses wrap the payload as `{"ResponseMetadata": {...}, "Result": {...}}`;
//! failures set `ResponseMetadata.Error`. Object storage (TOS) calls are
//! plain REST requests against per-region hosts.
//!
//! Every request is handed to the account's [`RequestSigner`] together with
//! the region and service it addresses before it is sent.

use crate::bucket::BucketInfo;
use crate::error::{VolcEngineError, classifier};
use crate::region::RegionInfo;
use cloudbridge::tags::{TagDelta, TagPolicy, apply_tag_delta};
use cloudbridge::{
    ApiRequest, ApiResponse, CloudError, NoopSigner, Params, PermissionHook, ProviderConfig,
    ReadOnlyGuard, RequestSigner, ResourceCache, Result, ResultExt, SigningScope, Tags, Transport,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://open.volcengineapi.com";
pub const DEFAULT_REGION: &str = "cn-beijing";

const REGION_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);
const BUCKET_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Service name object storage requests are signed for
pub const TOS_SERVICE: &str = "tos";

/// OpenAPI service a call is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Ecs,
    Ebs,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Ecs => "ecs",
            Service::Ebs => "storage_ebs",
        }
    }

    pub fn version(self) -> &'static str {
        "2020-04-01"
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    #[serde(default)]
    response_metadata: ResponseMetadata,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ResponseMetadata {
    request_id: String,
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorBody {
    code: String,
    message: String,
}

/// TOS error body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TosError {
    code: String,
    message: String,
    request_id: String,
}

pub struct VolcEngineClient {
    endpoint: String,
    account_id: String,
    default_region: String,
    access_key: String,
    signer: Arc<dyn RequestSigner>,
    transport: ReadOnlyGuard<Arc<dyn Transport>>,
    pub(crate) regions: ResourceCache<Vec<RegionInfo>>,
    /// Every bucket of the account; cleared by bucket create and delete
    pub(crate) buckets: ResourceCache<Vec<BucketInfo>>,
    tag_policy: TagPolicy,
}

impl VolcEngineClient {
    /// Client sending unsigned requests; see [`with_signer`](Self::with_signer)
    pub fn new(config: &ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if config.account.is_empty() {
            return Err(CloudError::InvalidConfig(
                "volcengine access key is required".to_string(),
            ));
        }
        let default_region = if config.default_region.is_empty() {
            DEFAULT_REGION.to_string()
        } else {
            config.default_region.clone()
        };

        Ok(Self {
            endpoint: config.endpoint_or(DEFAULT_ENDPOINT).trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            default_region,
            access_key: config.account.clone(),
            signer: Arc::new(NoopSigner),
            transport: ReadOnlyGuard::new(transport, "volcengine", config.read_only),
            regions: ResourceCache::with_ttl("volcengine regions", REGION_CACHE_TTL),
            buckets: ResourceCache::with_ttl("volcengine buckets", BUCKET_CACHE_TTL),
            tag_policy: TagPolicy::new().reserve_prefix("volc:").reserve_prefix("sys:"),
        })
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

    /// Report vendor 403 answers to `hook`
    pub fn with_permission_hook(mut self, hook: PermissionHook) -> Self {
        self.transport = self.transport.with_permission_hook(hook);
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    pub fn default_region(&self) -> &str {
        &self.default_region
    }

    pub fn is_read_only(&self) -> bool {
        self.transport.is_read_only()
    }

    pub fn tag_policy(&self) -> &TagPolicy {
        &self.tag_policy
    }

    /// Call `action` and return its `Result` object
    pub async fn call(
        &self,
        service: Service,
        region: &str,
        action: &str,
        params: Params,
    ) -> Result<Value> {
        let mut request = ApiRequest::get(format!("{}/", self.endpoint))
            .with_param("Action", action)
            .with_param("Version", service.version())
            .with_params(params);
        self.signer
            .sign(&mut request, SigningScope::new(region, service.name()))?;

        tracing::debug!("volcengine {} {} in {}", service.name(), action, region);
        let response = self.transport.send(request).await?;

        let classifier = classifier();
        let envelope: Envelope = response.decode(&classifier).context(action)?;

        if let Some(error) = envelope.response_metadata.error {
            return Err(VolcEngineError::Api {
                action: action.to_string(),
                code: error.code,
                message: error.message,
                request_id: envelope.response_metadata.request_id,
            }
            .into());
        }
        response.check_status(&classifier)?;
        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Regional TOS endpoint, or the bucket's virtual host when `bucket` is set
    pub fn tos_url(&self, region: &str, bucket: Option<&str>) -> String {
        match bucket {
            Some(bucket) => format!("https://{}.tos-{}.volces.com/", bucket, region),
            None => format!("https://tos-{}.volces.com/", region),
        }
    }

    /// Send one TOS request; failed statuses become classified errors
    pub async fn tos(&self, region: &str, mut request: ApiRequest) -> Result<ApiResponse> {
        self.signer
            .sign(&mut request, SigningScope::new(region, TOS_SERVICE))?;
        let label = format!("{} {}", request.method, request.url);

        tracing::debug!("volcengine tos {} in {}", label, region);
        let response = self.transport.send(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        match serde_json::from_str::<TosError>(&response.body) {
            Ok(error) if !error.code.is_empty() => Err(classifier()
                .classify(&error.code, &error.message)
                .context(format!("{} ({})", label, error.request_id))),
            _ => Err(classifier().classify_status(response.status, &response.body)),
        }
    }

    /// [`call`](Self::call), decoding the `Result` object as `T`
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        service: Service,
        region: &str,
        action: &str,
        params: Params,
    ) -> Result<T> {
        let result = self.call(service, region, action, params).await?;
        serde_json::from_value(result).map_err(|e| {
            VolcEngineError::Decode {
                action: action.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Bring the tags of one resource from `current` to `desired`.
    ///
    /// System tags (`volc:`, `sys:`) are neither set nor removed. Nothing is
    /// sent when the tags already match.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_tags(
        &self,
        service: Service,
        region: &str,
        resource_type: &str,
        resource_id: &str,
        current: &Tags,
        desired: &Tags,
        replace: bool,
    ) -> Result<()> {
        let delta = TagDelta::plan(current, desired, replace, &self.tag_policy)?;
        if delta.is_empty() {
            tracing::debug!("tags of {} already up to date", resource_id);
            return Ok(());
        }

        let base = || {
            let mut params = Params::new();
            params.insert("ResourceType".to_string(), resource_type.to_string());
            params.insert("ResourceIds.1".to_string(), resource_id.to_string());
            params
        };

        apply_tag_delta(
            &delta,
            |removed| async move {
                let mut params = base();
                let mut keys: Vec<String> = removed.into_keys().collect();
                keys.sort();
                for (i, key) in keys.into_iter().enumerate() {
                    params.insert(format!("TagKeys.{}", i + 1), key);
                }
                self.call(service, region, "UntagResources", params)
                    .await
                    .map(|_| ())
            },
            |added| async move {
                let mut params = base();
                let mut pairs: Vec<(String, String)> = added.into_iter().collect();
                pairs.sort();
                for (i, (key, value)) in pairs.into_iter().enumerate() {
                    params.insert(format!("Tags.{}.Key", i + 1), key);
                    params.insert(format!("Tags.{}.Value", i + 1), value);
                }
                self.call(service, region, "TagResources", params)
                    .await
                    .map(|_| ())
            },
        )
        .await
    }
}

impl std::fmt::Debug for VolcEngineClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolcEngineClient")
            .field("endpoint", &self.endpoint)
            .field("account_id", &self.account_id)
            .field("access_key", &self.access_key)
            .field("transport", &self.transport)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use cloudbridge::testing::ScopeSigner;
    use cloudbridge::{ErrorKind, HttpMethod};
    use serde_json::json;

    fn client(transport: Arc<MockTransport>, read_only: bool) -> VolcEngineClient {
        let config = ProviderConfig::new("volcengine", "ak", "sk").with_read_only(read_only);
        VolcEngineClient::new(&config, transport)
            .unwrap()
            .with_signer(Arc::new(ScopeSigner))
    }

    #[tokio::test]
    async fn test_call_returns_result_object() {
        let transport = MockTransport::new();
        transport.ok("DescribeZones", json!({"Zones": [{"ZoneId": "cn-beijing-a"}]}));
        let client = client(transport.clone(), false);

        let result = client
            .call(Service::Ecs, "cn-beijing", "DescribeZones", Params::new())
            .await
            .unwrap();

        assert_eq!(result["Zones"][0]["ZoneId"], "cn-beijing-a");
        let request = &transport.requests()[0];
        assert_eq!(request.param("Version"), Some("2020-04-01"));
        assert_eq!(request.header("x-signed-scope"), Some("cn-beijing/ecs"));
    }

    #[test]
    fn test_access_key_required() {
        let config = ProviderConfig::new("volcengine", "", "sk");
        let err = VolcEngineClient::new(&config, MockTransport::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[tokio::test]
    async fn test_tos_error_is_classified() {
        let transport = MockTransport::new();
        let url = "https://logs.tos-cn-beijing.volces.com/";
        transport.raw(
            &format!("DELETE {}", url),
            404,
            r#"{"Code": "NoSuchBucket", "Message": "bucket not found", "RequestId": "r-1"}"#,
        );
        let client = client(transport.clone(), false);

        let err = client
            .tos("cn-beijing", ApiRequest::new(HttpMethod::Delete, url))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("r-1"));
        assert_eq!(transport.requests()[0].header("x-signed-scope"), Some("cn-beijing/tos"));
    }

    #[tokio::test]
    async fn test_tos_read_only_blocks_writes() {
        let transport = MockTransport::new();
        let client = client(transport.clone(), true);

        let err = client
            .tos(
                "cn-beijing",
                ApiRequest::new(HttpMethod::Put, client.tos_url("cn-beijing", Some("logs"))),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccountReadOnly);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_error_metadata_is_classified() {
        let transport = MockTransport::new();
        transport.error("DescribeInstances", "InvalidInstance.NotFound", "gone");
        let client = client(transport, false);

        let err = client
            .call(Service::Ecs, "cn-beijing", "DescribeInstances", Params::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("InvalidInstance.NotFound"));
    }

    #[tokio::test]
    async fn test_non_json_failure_uses_status() {
        let transport = MockTransport::new();
        transport.raw("DescribeRegions", 404, "no such endpoint");
        let client = client(transport, false);

        let err = client
            .call(Service::Ecs, "cn-beijing", "DescribeRegions", Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_read_only_blocks_mutations() {
        let transport = MockTransport::new();
        transport.ok("CreateVolume", json!({"VolumeId": "vol-1"}));
        let client = client(transport.clone(), true);

        let err = client
            .call(Service::Ebs, "cn-beijing", "CreateVolume", Params::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AccountReadOnly);
        assert!(transport.actions().is_empty());
    }

    #[tokio::test]
    async fn test_update_tags_remove_then_add() {
        let transport = MockTransport::new();
        transport.ok("UntagResources", json!({}));
        transport.ok("TagResources", json!({}));
        let client = client(transport.clone(), false);

        let current: Tags = [("env", "dev"), ("owner", "ops"), ("volc:project", "default")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let desired: Tags = [("env".to_string(), "prod".to_string())].into_iter().collect();

        client
            .update_tags(Service::Ecs, "cn-beijing", "instance", "i-1", &current, &desired, true)
            .await
            .unwrap();

        assert_eq!(transport.actions(), vec!["UntagResources", "TagResources"]);
        let requests = transport.requests();
        assert_eq!(requests[0].param("TagKeys.1"), Some("env"));
        assert_eq!(requests[0].param("TagKeys.2"), Some("owner"));
        assert_eq!(requests[0].param("TagKeys.3"), None);
        assert_eq!(requests[1].param("Tags.1.Key"), Some("env"));
        assert_eq!(requests[1].param("Tags.1.Value"), Some("prod"));
        assert_eq!(requests[1].param("ResourceIds.1"), Some("i-1"));
    }

    #[tokio::test]
    async fn test_update_tags_noop() {
        let transport = MockTransport::new();
        let client = client(transport.clone(), false);
        let tags: Tags = [("env".to_string(), "dev".to_string())].into_iter().collect();

        client
            .update_tags(Service::Ecs, "cn-beijing", "instance", "i-1", &tags, &tags, true)
            .await
            .unwrap();
        assert!(transport.actions().is_empty());
    }

    #[tokio::test]
    async fn test_reserved_tags_rejected() {
        let transport = MockTransport::new();
        let client = client(transport.clone(), false);
        let desired: Tags = [("volc:billing".to_string(), "x".to_string())].into_iter().collect();

        let err = client
            .update_tags(Service::Ecs, "cn-beijing", "instance", "i-1", &Tags::new(), &desired, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSupported);
        assert!(transport.actions().is_empty());
    }
}
