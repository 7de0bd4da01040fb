//! Account-level provider contract and provider factories

use crate::config::ProviderConfig;
use crate::error::{CloudError, Result};
use crate::resource::{Cloudgroup, Cloudpolicy, Clouduser, Region, select_by_global_id};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Capability names reported by [`CloudProvider::capabilities`]
pub mod capability {
    pub const COMPUTE: &str = "compute";
    pub const NETWORK: &str = "network";
    pub const EIP: &str = "eip";
    pub const SNAPSHOT: &str = "snapshot";
    pub const NAT: &str = "nat";
    pub const OBJECTSTORE: &str = "objectstore";
    pub const IAM: &str = "iam";
}

/// Cloud provider abstraction trait
///
/// One instance serves one cloud account. Everything the orchestration
/// layer needs from a vendor is reached from here through the resource
/// traits in [`crate::resource`].
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Registered provider id (e.g. "volcengine")
    fn id(&self) -> &str;

    /// Provider display name for UI
    fn display_name(&self) -> &str;

    /// Vendor-side account id
    fn account_id(&self) -> String;

    /// Whether mutating calls are blocked for this account
    fn is_read_only(&self) -> bool;

    /// Supported capabilities, see [`capability`]
    fn capabilities(&self) -> Vec<String>;

    /// Check if the credentials are accepted by the vendor
    async fn check_auth(&self) -> Result<AuthStatus>;

    async fn regions(&self) -> Result<Vec<Box<dyn Region>>>;

    async fn region_by_id(&self, id: &str) -> Result<Box<dyn Region>> {
        select_by_global_id(self.regions().await?, id)
    }

    async fn users(&self) -> Result<Vec<Box<dyn Clouduser>>> {
        Err(CloudError::NotImplemented("CloudProvider::users".to_string()))
    }

    async fn user_by_name(&self, name: &str) -> Result<Box<dyn Clouduser>> {
        let matched = self
            .users()
            .await?
            .into_iter()
            .filter(|user| user.name() == name)
            .collect();
        crate::error::expect_single(matched, name)
    }

    async fn create_user(&self, _options: &ClouduserCreateOptions) -> Result<Box<dyn Clouduser>> {
        Err(CloudError::NotImplemented("CloudProvider::create_user".to_string()))
    }

    async fn groups(&self) -> Result<Vec<Box<dyn Cloudgroup>>> {
        Err(CloudError::NotImplemented("CloudProvider::groups".to_string()))
    }

    async fn create_group(&self, _name: &str, _description: &str) -> Result<Box<dyn Cloudgroup>> {
        Err(CloudError::NotImplemented("CloudProvider::create_group".to_string()))
    }

    async fn system_policies(&self) -> Result<Vec<Box<dyn Cloudpolicy>>> {
        Err(CloudError::NotImplemented("CloudProvider::system_policies".to_string()))
    }

    async fn custom_policies(&self) -> Result<Vec<Box<dyn Cloudpolicy>>> {
        Err(CloudError::NotImplemented("CloudProvider::custom_policies".to_string()))
    }
}

/// Authentication status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClouduserCreateOptions {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_console_login: bool,
    pub description: String,
}

/// Builds providers for one vendor
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Registry key, matched against [`ProviderConfig::vendor`]
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn is_public_cloud(&self) -> bool {
        true
    }

    /// Reject configurations this vendor cannot use
    fn validate_config(&self, config: &ProviderConfig) -> Result<()> {
        config.validate()
    }

    async fn create_provider(&self, config: ProviderConfig) -> Result<Box<dyn CloudProvider>>;
}

/// Look a resource up region by region.
///
/// Regions answering not-found are skipped; the first other error is
/// returned with the region in its context.
pub async fn find_in_regions<T, F, Fut>(
    regions: Vec<Box<dyn Region>>,
    id: &str,
    mut lookup: F,
) -> Result<T>
where
    F: FnMut(Box<dyn Region>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for region in regions {
        let region_id = region.global_id();
        match lookup(region).await {
            Ok(found) => return Ok(found),
            Err(e) if e.is_not_found() => {
                tracing::debug!("{} not found in {}", id, region_id);
            }
            Err(e) => return Err(e.context(format!("region {}", region_id))),
        }
    }
    Err(CloudError::NotFound(id.to_string()))
}
