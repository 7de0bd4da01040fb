//! Regions and region-scoped lookups

use crate::PROVIDER_ID;
use crate::bucket::VolcEngineBucket;
use crate::client::{Service, VolcEngineClient};
use crate::disk::VolcEngineDisk;
use crate::instance::VolcEngineInstance;
use crate::zone::{VolcEngineZone, ZoneInfo};
use async_trait::async_trait;
use cloudbridge::resource::status;
use cloudbridge::{
    Bucket, CloudError, CloudResource, Cursor, Disk, Instance, Page, Params, Region, Result, Zone,
    expect_single, fetch_all, params,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegionInfo {
    pub region_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RegionPage {
    regions: Vec<RegionInfo>,
    next_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ZoneList {
    zones: Vec<ZoneInfo>,
}

impl VolcEngineClient {
    /// All regions open to the account, cached for two hours
    pub async fn describe_regions(&self) -> Result<Vec<RegionInfo>> {
        self.regions
            .get_or_fetch(move || {
                fetch_all(None, move |cursor| async move {
                    let mut params = params([("MaxResults", "20")]);
                    if let Some(token) = cursor.as_ref().and_then(Cursor::as_token) {
                        params.insert("NextToken".to_string(), token.to_string());
                    }
                    let page: RegionPage = self
                        .call_as(Service::Ecs, self.default_region(), "DescribeRegions", params)
                        .await?;
                    Ok(Page::with_token(page.regions, page.next_token))
                })
            })
            .await
    }

    pub async fn describe_zones(&self, region_id: &str) -> Result<Vec<ZoneInfo>> {
        let list: ZoneList = self
            .call_as(Service::Ecs, region_id, "DescribeZones", Params::new())
            .await?;
        Ok(list.zones)
    }
}

pub struct VolcEngineRegion {
    client: Arc<VolcEngineClient>,
    info: RegionInfo,
}

impl VolcEngineRegion {
    pub fn new(client: Arc<VolcEngineClient>, info: RegionInfo) -> Self {
        Self { client, info }
    }
}

#[async_trait]
impl CloudResource for VolcEngineRegion {
    fn id(&self) -> String {
        self.info.region_id.clone()
    }

    fn name(&self) -> String {
        self.info.region_id.clone()
    }

    fn global_id(&self) -> String {
        format!("{}/{}", PROVIDER_ID, self.info.region_id)
    }

    fn status(&self) -> String {
        status::common::AVAILABLE.to_string()
    }

    async fn refresh(&mut self) -> Result<()> {
        self.client.regions.invalidate();
        let regions = self.client.describe_regions().await?;
        let found = regions
            .into_iter()
            .find(|r| r.region_id == self.info.region_id)
            .ok_or_else(|| CloudError::NotFound(self.global_id()))?;
        self.info = found;
        Ok(())
    }
}

#[async_trait]
impl Region for VolcEngineRegion {
    fn provider(&self) -> String {
        PROVIDER_ID.to_string()
    }

    async fn zones(&self) -> Result<Vec<Box<dyn Zone>>> {
        let zones = self.client.describe_zones(&self.info.region_id).await?;
        Ok(zones
            .into_iter()
            .map(|info| {
                Box::new(VolcEngineZone::new(
                    self.client.clone(),
                    &self.info.region_id,
                    info,
                )) as Box<dyn Zone>
            })
            .collect())
    }

    async fn instance_by_id(&self, id: &str) -> Result<Box<dyn Instance>> {
        let ids = [id.to_string()];
        let found = self
            .client
            .describe_instances(&self.info.region_id, None, &ids)
            .await?;
        let info = expect_single(found, id)?;
        Ok(Box::new(VolcEngineInstance::new(
            self.client.clone(),
            &self.info.region_id,
            info,
        )))
    }

    async fn disk_by_id(&self, id: &str) -> Result<Box<dyn Disk>> {
        let filter = crate::disk::VolumeFilter {
            ids: vec![id.to_string()],
            ..Default::default()
        };
        let found = self
            .client
            .describe_volumes(&self.info.region_id, &filter)
            .await?;
        let info = expect_single(found, id)?;
        Ok(Box::new(VolcEngineDisk::new(
            self.client.clone(),
            &self.info.region_id,
            info,
        )))
    }

    async fn buckets(&self) -> Result<Vec<Box<dyn Bucket>>> {
        let buckets = self.client.list_buckets().await?;
        Ok(buckets
            .into_iter()
            .filter(|info| info.location == self.info.region_id)
            .map(|info| Box::new(VolcEngineBucket::new(self.client.clone(), info)) as Box<dyn Bucket>)
            .collect())
    }

    async fn create_bucket(&self, name: &str, storage_class: &str, acl: &str) -> Result<()> {
        self.client
            .create_bucket(&self.info.region_id, name, storage_class, acl)
            .await
    }

    async fn delete_bucket(&self, name: &str) -> Result<()> {
        self.client.delete_bucket(&self.info.region_id, name).await
    }
}
