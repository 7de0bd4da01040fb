//! VolcEngine provider and its factory

use crate::PROVIDER_ID;
use crate::client::VolcEngineClient;
use crate::region::VolcEngineRegion;
use async_trait::async_trait;
use cloudbridge::provider::capability;
use cloudbridge::{
    AuthStatus, CloudProvider, ErrorKind, NoopSigner, ProviderConfig, ProviderFactory, Region,
    RequestSigner, ReqwestTransport, Result, Transport,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DISPLAY_NAME: &str = "VolcEngine";

/// One VolcEngine account
#[derive(Debug)]
pub struct VolcEngineProvider {
    client: Arc<VolcEngineClient>,
}

impl VolcEngineProvider {
    pub fn new(
        config: &ProviderConfig,
        transport: Arc<dyn Transport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self> {
        let client = VolcEngineClient::new(config, transport)?.with_signer(signer);
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> &Arc<VolcEngineClient> {
        &self.client
    }
}

#[async_trait]
impl CloudProvider for VolcEngineProvider {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn display_name(&self) -> &str {
        DISPLAY_NAME
    }

    fn account_id(&self) -> String {
        if self.client.account_id().is_empty() {
            self.client.access_key().to_string()
        } else {
            self.client.account_id().to_string()
        }
    }

    fn is_read_only(&self) -> bool {
        self.client.is_read_only()
    }

    fn capabilities(&self) -> Vec<String> {
        vec![
            capability::COMPUTE.to_string(),
            capability::OBJECTSTORE.to_string(),
        ]
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        // DescribeRegions is the cheapest signed call
        self.client.regions.invalidate();
        match self.client.describe_regions().await {
            Ok(regions) => Ok(AuthStatus::ok(format!(
                "{} ({} regions)",
                self.account_id(),
                regions.len()
            ))),
            Err(e) if e.kind() == ErrorKind::InvalidConfig => Ok(AuthStatus::failed(e.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn regions(&self) -> Result<Vec<Box<dyn Region>>> {
        let regions = self.client.describe_regions().await?;
        Ok(regions
            .into_iter()
            .map(|info| Box::new(VolcEngineRegion::new(self.client.clone(), info)) as Box<dyn Region>)
            .collect())
    }
}

/// Registered under [`PROVIDER_ID`]; providers sign through `signer`
#[derive(Clone, Default)]
pub struct VolcEngineFactory {
    signer: Option<Arc<dyn RequestSigner>>,
}

impl VolcEngineFactory {
    pub fn with_signer(signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            signer: Some(signer),
        }
    }
}

impl fmt::Debug for VolcEngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VolcEngineFactory")
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

#[async_trait]
impl ProviderFactory for VolcEngineFactory {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn name(&self) -> &str {
        DISPLAY_NAME
    }

    async fn create_provider(&self, config: ProviderConfig) -> Result<Box<dyn CloudProvider>> {
        let timeout = config.option::<u64>("timeout_secs").unwrap_or(30);
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(timeout))?;
        let signer = match &self.signer {
            Some(signer) => signer.clone(),
            None => {
                tracing::warn!("no request signer for volcengine; requests are sent unsigned");
                Arc::new(NoopSigner) as Arc<dyn RequestSigner>
            }
        };
        let provider = VolcEngineProvider::new(&config, Arc::new(transport), signer)?;
        tracing::info!(
            "VolcEngine provider ready for {} (read-only: {})",
            provider.account_id(),
            provider.is_read_only()
        );
        Ok(Box::new(provider))
    }
}
