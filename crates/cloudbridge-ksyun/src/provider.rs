use crate::PROVIDER_ID;
use crate::client::KsyunClient;
use crate::region::KsyunRegion;
use async_trait::async_trait;
use cloudbridge::provider::capability;
use cloudbridge::{
    AuthStatus, CloudError, CloudProvider, ErrorKind, NoopSigner, ProviderConfig, ProviderFactory,
    Region, RequestSigner, ReqwestTransport, Result, Transport,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DISPLAY_NAME: &str = "Kingsoft Cloud";

#[derive(Debug)]
pub struct KsyunProvider {
    client: Arc<KsyunClient>,
}

impl KsyunProvider {
    pub fn new(
        config: &ProviderConfig,
        transport: Arc<dyn Transport>,
        signer: Arc<dyn RequestSigner>,
    ) -> Result<Self> {
        let client = KsyunClient::new(config, transport)?.with_signer(signer);
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub fn client(&self) -> &Arc<KsyunClient> {
        &self.client
    }
}

#[async_trait]
impl CloudProvider for KsyunProvider {
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
        vec![capability::COMPUTE.to_string()]
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        self.client.regions.invalidate();
        match self.client.describe_regions().await {
            Ok(_) => Ok(AuthStatus::ok(self.account_id())),
            Err(e) if e.kind() == ErrorKind::InvalidConfig => {
                tracing::warn!("ksyun credentials rejected: {}", e);
                Ok(AuthStatus::failed(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn regions(&self) -> Result<Vec<Box<dyn Region>>> {
        let regions = self.client.describe_regions().await?;
        Ok(regions
            .into_iter()
            .map(|info| Box::new(KsyunRegion::new(self.client.clone(), info)) as Box<dyn Region>)
            .collect())
    }
}

/// Builds providers whose requests go through `signer`
#[derive(Clone, Default)]
pub struct KsyunFactory {
    signer: Option<Arc<dyn RequestSigner>>,
}

impl KsyunFactory {
    pub fn with_signer(signer: Arc<dyn RequestSigner>) -> Self {
        Self {
            signer: Some(signer),
        }
    }
}

impl fmt::Debug for KsyunFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KsyunFactory")
            .field("signed", &self.signer.is_some())
            .finish()
    }
}

#[async_trait]
impl ProviderFactory for KsyunFactory {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    fn name(&self) -> &str {
        DISPLAY_NAME
    }

    fn validate_config(&self, config: &ProviderConfig) -> Result<()> {
        config.validate()?;
        let listed = config.options.get("project_ids").is_some();
        if listed && config.option::<Vec<String>>("project_ids").is_none() {
            return Err(CloudError::InputParameter(
                "ksyun option project_ids must be a list of strings".to_string(),
            ));
        }
        Ok(())
    }

    async fn create_provider(&self, config: ProviderConfig) -> Result<Box<dyn CloudProvider>> {
        let timeout = config.option::<u64>("timeout_secs").unwrap_or(30);
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(timeout))?;
        let signer = match &self.signer {
            Some(signer) => signer.clone(),
            None => {
                tracing::warn!("no request signer for ksyun; requests are sent unsigned");
                Arc::new(NoopSigner) as Arc<dyn RequestSigner>
            }
        };
        let provider = KsyunProvider::new(&config, Arc::new(transport), signer)?;
        tracing::info!("Kingsoft Cloud provider ready for {}", provider.account_id());
        Ok(Box::new(provider))
    }
}
