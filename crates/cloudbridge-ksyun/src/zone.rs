//! Availability zones and the per-zone virtual host

use crate::PROVIDER_ID;
use crate::client::KsyunClient;
use crate::instance::KsyunInstance;
use async_trait::async_trait;
use cloudbridge::resource::status;
use cloudbridge::{CloudError, CloudResource, Host, Instance, Result, Zone};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ZoneInfo {
    pub availability_zone: String,
}

pub struct KsyunZone {
    client: Arc<KsyunClient>,
    region_id: String,
    info: ZoneInfo,
}

impl KsyunZone {
    pub fn new(client: Arc<KsyunClient>, region_id: &str, info: ZoneInfo) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            info,
        }
    }

    fn host(&self) -> KsyunHost {
        KsyunHost::new(
            self.client.clone(),
            &self.region_id,
            &self.info.availability_zone,
        )
    }
}

#[async_trait]
impl CloudResource for KsyunZone {
    fn id(&self) -> String {
        self.info.availability_zone.clone()
    }

    fn name(&self) -> String {
        self.info.availability_zone.clone()
    }

    fn global_id(&self) -> String {
        format!(
            "{}/{}/{}",
            PROVIDER_ID, self.region_id, self.info.availability_zone
        )
    }

    fn status(&self) -> String {
        status::common::AVAILABLE.to_string()
    }

    async fn refresh(&mut self) -> Result<()> {
        let zones = self.client.describe_zones(&self.region_id).await?;
        if zones
            .iter()
            .any(|z| z.availability_zone == self.info.availability_zone)
        {
            Ok(())
        } else {
            Err(CloudError::NotFound(self.global_id()))
        }
    }
}

#[async_trait]
impl Zone for KsyunZone {
    fn region_id(&self) -> String {
        self.region_id.clone()
    }

    async fn hosts(&self) -> Result<Vec<Box<dyn Host>>> {
        Ok(vec![Box::new(self.host()) as Box<dyn Host>])
    }
}

/// The whole zone presented as one host
pub struct KsyunHost {
    client: Arc<KsyunClient>,
    region_id: String,
    zone_id: String,
}

impl KsyunHost {
    pub fn new(client: Arc<KsyunClient>, region_id: &str, zone_id: &str) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            zone_id: zone_id.to_string(),
        }
    }
}

#[async_trait]
impl CloudResource for KsyunHost {
    fn id(&self) -> String {
        format!("{}-{}", self.client.access_key(), self.zone_id)
    }

    fn name(&self) -> String {
        format!("{}-{}", PROVIDER_ID, self.zone_id)
    }

    fn global_id(&self) -> String {
        format!("{}/{}/{}/host", PROVIDER_ID, self.region_id, self.zone_id)
    }

    fn status(&self) -> String {
        status::common::AVAILABLE.to_string()
    }

    fn is_emulated(&self) -> bool {
        true
    }

    async fn refresh(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl Host for KsyunHost {
    fn zone_id(&self) -> String {
        self.zone_id.clone()
    }

    fn host_type(&self) -> String {
        PROVIDER_ID.to_string()
    }

    async fn instances(&self) -> Result<Vec<Box<dyn Instance>>> {
        let infos = self
            .client
            .describe_instances(&self.region_id, Some(self.zone_id.as_str()), &[])
            .await?;
        Ok(infos
            .into_iter()
            .map(|info| {
                Box::new(KsyunInstance::new(self.client.clone(), &self.region_id, info))
                    as Box<dyn Instance>
            })
            .collect())
    }
}
