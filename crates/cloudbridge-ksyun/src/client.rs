//! Kingsoft Cloud OpenAPI client
//!
//! Query-style calls (`Action`, `Version`) handed to the account's
//! [`RequestSigner`] with the region and service they address. Successful
//! answers are flat JSON objects carrying `RequestId`; failures carry an
//! `Error` object and a 4xx/5xx status.

use crate::error::{KsyunError, classifier};
use crate::region::RegionInfo;
use cloudbridge::{
    ApiRequest, CloudError, NoopSigner, Params, PermissionHook, ProviderConfig, ReadOnlyGuard,
    RequestSigner, ResourceCache, Result, ResultExt, SigningScope, Transport,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "cn-beijing-6";

const REGION_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Kec,
    Ebs,
}

impl Service {
    pub fn name(self) -> &'static str {
        match self {
            Service::Kec => "kec",
            Service::Ebs => "ebs",
        }
    }

    pub fn version(self) -> &'static str {
        "2016-03-04"
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorEnvelope {
    request_id: String,
    error: Option<ErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ErrorBody {
    code: String,
    message: String,
}

pub struct KsyunClient {
    /// Fixed endpoint from the account config; empty means per-region hosts
    endpoint: String,
    account_id: String,
    default_region: String,
    project_ids: Vec<String>,
    access_key: String,
    signer: Arc<dyn RequestSigner>,
    transport: ReadOnlyGuard<Arc<dyn Transport>>,
    pub(crate) regions: ResourceCache<Vec<RegionInfo>>,
}

impl KsyunClient {
    /// Client sending unsigned requests; see [`with_signer`](Self::with_signer)
    pub fn new(config: &ProviderConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        if config.account.is_empty() {
            return Err(CloudError::InvalidConfig(
                "ksyun access key is required".to_string(),
            ));
        }
        let default_region = if config.default_region.is_empty() {
            DEFAULT_REGION.to_string()
        } else {
            config.default_region.clone()
        };

        Ok(Self {
            endpoint: config.url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            default_region,
            project_ids: config
                .option::<Vec<String>>("project_ids")
                .unwrap_or_default(),
            access_key: config.account.clone(),
            signer: Arc::new(NoopSigner),
            transport: ReadOnlyGuard::new(transport, "ksyun", config.read_only),
            regions: ResourceCache::with_ttl("ksyun regions", REGION_CACHE_TTL),
        })
    }

    pub fn with_signer(mut self, signer: Arc<dyn RequestSigner>) -> Self {
        self.signer = signer;
        self
    }

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

    /// Projects listings are restricted to; empty means all
    pub fn project_ids(&self) -> &[String] {
        &self.project_ids
    }

    pub fn is_read_only(&self) -> bool {
        self.transport.is_read_only()
    }

    fn endpoint_for(&self, service: Service, region: &str) -> String {
        if !self.endpoint.is_empty() {
            return format!("{}/", self.endpoint);
        }
        format!("https://{}.{}.api.ksyun.com/", service.name(), region)
    }

    /// Call `action` and return the whole response object
    pub async fn call(
        &self,
        service: Service,
        region: &str,
        action: &str,
        params: Params,
    ) -> Result<Value> {
        let mut request = ApiRequest::get(self.endpoint_for(service, region))
            .with_param("Action", action)
            .with_param("Version", service.version())
            .with_params(params);
        self.signer
            .sign(&mut request, SigningScope::new(region, service.name()))?;

        tracing::debug!("ksyun {} {} in {}", service.name(), action, region);
        let response = self.transport.send(request).await?;

        let classifier = classifier();
        let body: Value = response.decode(&classifier).context(action)?;

        let envelope: ErrorEnvelope = serde_json::from_value(body.clone()).unwrap_or_default();
        if let Some(error) = envelope.error {
            return Err(KsyunError::Api {
                action: action.to_string(),
                code: error.code,
                message: error.message,
                request_id: envelope.request_id,
            }
            .into());
        }
        response.check_status(&classifier)?;
        Ok(body)
    }

    pub async fn call_as<T: DeserializeOwned>(
        &self,
        service: Service,
        region: &str,
        action: &str,
        params: Params,
    ) -> Result<T> {
        let body = self.call(service, region, action, params).await?;
        serde_json::from_value(body).map_err(|e| {
            KsyunError::Decode {
                action: action.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for KsyunClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KsyunClient")
            .field("endpoint", &self.endpoint)
            .field("account_id", &self.account_id)
            .field("default_region", &self.default_region)
            .field("access_key", &self.access_key)
            .field("transport", &self.transport)
            .finish()
    }
}
