//! Provider account configuration
//!
//! One [`ProviderConfig`] describes one cloud account: which vendor adapter
//! serves it, where its API lives, its credentials and whether it may be
//! mutated at all.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const ENV_PREFIX: &str = "CLOUDBRIDGE";

/// Configuration for a single cloud account
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Account record id assigned by the caller
    pub id: String,

    /// Human readable account name
    pub name: String,

    /// Registered provider id (e.g. "volcengine", "ksyun")
    pub vendor: String,

    /// API endpoint override; adapters fall back to their public endpoint
    pub url: String,

    /// Access key id or user name
    pub account: String,

    /// Access key secret or password
    #[serde(skip_serializing)]
    pub secret: String,

    /// Vendor-side account/owner id, when known ahead of time
    pub account_id: String,

    /// Block every mutating API call for this account
    pub read_only: bool,

    /// Region used for account-level calls
    pub default_region: String,

    /// Log request/response detail
    pub debug: bool,

    /// Vendor-specific extras
    pub options: serde_json::Value,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vendor", &self.vendor)
            .field("url", &self.url)
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("read_only", &self.read_only)
            .field("default_region", &self.default_region)
            .field("debug", &self.debug)
            .field("options", &self.options)
            .finish()
    }
}

/// File layout holding several accounts
#[derive(Debug, Default, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<ProviderConfig>,
}

impl ProviderConfig {
    pub fn new(
        vendor: impl Into<String>,
        account: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            account: account.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if !self.options.is_object() {
            self.options = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.options.as_object_mut() {
            map.insert(key.into(), value);
        }
        self
    }

    /// Get a vendor option as a specific type
    pub fn option<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.options
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Endpoint to use, falling back to the adapter's default
    pub fn endpoint_or<'a>(&'a self, default: &'a str) -> &'a str {
        if self.url.is_empty() {
            default
        } else {
            self.url.as_str()
        }
    }

    /// Check the fields every adapter needs
    pub fn validate(&self) -> Result<()> {
        if self.vendor.is_empty() {
            return Err(CloudError::InputParameter("vendor is required".to_string()));
        }
        if self.account.is_empty() {
            return Err(CloudError::InputParameter(format!(
                "account is required for {}",
                self.vendor
            )));
        }
        if self.secret.is_empty() {
            return Err(CloudError::InputParameter(format!(
                "secret is required for {}",
                self.vendor
            )));
        }
        Ok(())
    }

    /// Create ProviderConfig from `CLOUDBRIDGE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let required = |name: &str| {
            let key = format!("{}_{}", ENV_PREFIX, name);
            std::env::var(&key).map_err(|_| CloudError::InvalidConfig(format!("{} is not set", key)))
        };
        let optional = |name: &str| std::env::var(format!("{}_{}", ENV_PREFIX, name)).ok();

        let mut config = Self::new(required("VENDOR")?, required("ACCOUNT")?, required("SECRET")?);
        if let Some(url) = optional("URL") {
            config.url = url;
        }
        if let Some(region) = optional("REGION") {
            config.default_region = region;
        }
        if let Some(account_id) = optional("ACCOUNT_ID") {
            config.account_id = account_id;
        }
        config.read_only = optional("READ_ONLY").as_deref().is_some_and(parse_flag);
        config.debug = optional("DEBUG").as_deref().is_some_and(parse_flag);

        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a single account from a YAML file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(
            "Loaded {} account config from {}",
            config.vendor,
            path.as_ref().display()
        );
        Ok(config)
    }

    /// Load every account listed under `accounts:` in a YAML file
    pub async fn load_all(path: impl AsRef<Path>) -> Result<Vec<Self>> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let file: AccountsFile = serde_yaml::from_str(&content)?;
        tracing::debug!(
            "Loaded {} account configs from {}",
            file.accounts.len(),
            path.as_ref().display()
        );
        Ok(file.accounts)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
