//! Zones, the per-zone virtual host and the per-zone block storage pools
//!
//! VolcEngine exposes no physical hosts. Each zone gets one virtual host
//! holding every instance of the zone, and one storage per volume type.

use crate::PROVIDER_ID;
use crate::client::VolcEngineClient;
use crate::disk::{VolcEngineDisk, VolumeFilter};
use crate::instance::VolcEngineInstance;
use async_trait::async_trait;
use cloudbridge::resource::status;
use cloudbridge::{
    CloudError, CloudResource, Disk, DiskCreateConfig, Host, Instance, Result, Storage, Zone,
    wait_status,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Volume types offered in every zone
pub const VOLUME_TYPES: [&str; 3] = ["ESSD_PL0", "ESSD_FlexPL", "PTSSD"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ZoneInfo {
    pub zone_id: String,
}

pub struct VolcEngineZone {
    client: Arc<VolcEngineClient>,
    region_id: String,
    info: ZoneInfo,
}

impl VolcEngineZone {
    pub fn new(client: Arc<VolcEngineClient>, region_id: &str, info: ZoneInfo) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            info,
        }
    }

    fn host(&self) -> VolcEngineHost {
        VolcEngineHost::new(self.client.clone(), &self.region_id, &self.info.zone_id)
    }

    fn storage(&self, volume_type: &str) -> VolcEngineStorage {
        VolcEngineStorage::new(
            self.client.clone(),
            &self.region_id,
            &self.info.zone_id,
            volume_type,
        )
    }
}

#[async_trait]
impl CloudResource for VolcEngineZone {
    fn id(&self) -> String {
        self.info.zone_id.clone()
    }

    fn name(&self) -> String {
        self.info.zone_id.clone()
    }

    fn global_id(&self) -> String {
        format!("{}/{}/{}", PROVIDER_ID, self.region_id, self.info.zone_id)
    }

    fn status(&self) -> String {
        status::common::AVAILABLE.to_string()
    }

    async fn refresh(&mut self) -> Result<()> {
        let zones = self.client.describe_zones(&self.region_id).await?;
        if zones.iter().any(|z| z.zone_id == self.info.zone_id) {
            Ok(())
        } else {
            Err(CloudError::NotFound(self.global_id()))
        }
    }
}

#[async_trait]
impl Zone for VolcEngineZone {
    fn region_id(&self) -> String {
        self.region_id.clone()
    }

    async fn hosts(&self) -> Result<Vec<Box<dyn Host>>> {
        Ok(vec![Box::new(self.host()) as Box<dyn Host>])
    }

    async fn storages(&self) -> Result<Vec<Box<dyn Storage>>> {
        Ok(VOLUME_TYPES
            .iter()
            .map(|volume_type| Box::new(self.storage(volume_type)) as Box<dyn Storage>)
            .collect())
    }
}

/// Virtual host standing for a whole zone
pub struct VolcEngineHost {
    client: Arc<VolcEngineClient>,
    region_id: String,
    zone_id: String,
}

impl VolcEngineHost {
    pub fn new(client: Arc<VolcEngineClient>, region_id: &str, zone_id: &str) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            zone_id: zone_id.to_string(),
        }
    }
}

#[async_trait]
impl CloudResource for VolcEngineHost {
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
impl Host for VolcEngineHost {
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
                Box::new(VolcEngineInstance::new(
                    self.client.clone(),
                    &self.region_id,
                    info,
                )) as Box<dyn Instance>
            })
            .collect())
    }

    async fn storages(&self) -> Result<Vec<Box<dyn Storage>>> {
        let zone = VolcEngineZone::new(
            self.client.clone(),
            &self.region_id,
            ZoneInfo {
                zone_id: self.zone_id.clone(),
            },
        );
        zone.storages().await
    }
}

/// Block storage pool of one volume type in one zone
pub struct VolcEngineStorage {
    client: Arc<VolcEngineClient>,
    region_id: String,
    zone_id: String,
    volume_type: String,
}

impl VolcEngineStorage {
    pub fn new(
        client: Arc<VolcEngineClient>,
        region_id: &str,
        zone_id: &str,
        volume_type: &str,
    ) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            zone_id: zone_id.to_string(),
            volume_type: volume_type.to_string(),
        }
    }
}

#[async_trait]
impl CloudResource for VolcEngineStorage {
    fn id(&self) -> String {
        format!("{}-{}", self.zone_id, self.volume_type)
    }

    fn name(&self) -> String {
        self.volume_type.clone()
    }

    fn global_id(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            PROVIDER_ID, self.region_id, self.zone_id, self.volume_type
        )
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
impl Storage for VolcEngineStorage {
    fn zone_id(&self) -> String {
        self.zone_id.clone()
    }

    fn storage_type(&self) -> String {
        self.volume_type.clone()
    }

    async fn disks(&self) -> Result<Vec<Box<dyn Disk>>> {
        let filter = VolumeFilter {
            zone_id: Some(self.zone_id.clone()),
            volume_type: Some(self.volume_type.clone()),
            ..Default::default()
        };
        let infos = self
            .client
            .describe_volumes(&self.region_id, &filter)
            .await?;
        Ok(infos
            .into_iter()
            .map(|info| {
                Box::new(VolcEngineDisk::new(self.client.clone(), &self.region_id, info))
                    as Box<dyn Disk>
            })
            .collect())
    }

    /// Create a data volume and wait until it can be attached
    async fn create_disk(&self, config: &DiskCreateConfig) -> Result<Box<dyn Disk>> {
        if config.size_gb == 0 {
            return Err(CloudError::InputParameter(
                "disk size must be positive".to_string(),
            ));
        }
        let volume_id = self
            .client
            .create_volume(&self.region_id, &self.zone_id, &self.volume_type, config)
            .await?;
        tracing::info!(
            "Created volume {} ({} GB {}) in {}",
            volume_id,
            config.size_gb,
            self.volume_type,
            self.zone_id
        );

        let mut disk = VolcEngineDisk::pending(self.client.clone(), &self.region_id, &volume_id);
        wait_status(
            &mut disk,
            status::disk::READY,
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
        .await?;
        Ok(Box::new(disk))
    }
}
