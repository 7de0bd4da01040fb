use crate::PROVIDER_ID;
use crate::client::{KsyunClient, Service};
use crate::instance::KsyunInstance;
use crate::zone::{KsyunZone, ZoneInfo};
use async_trait::async_trait;
use cloudbridge::resource::status;
use cloudbridge::{CloudError, CloudResource, Instance, Params, Region, Result, Zone, expect_single};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegionInfo {
    pub region: String,
    pub region_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RegionSet {
    region_set: Vec<RegionInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ZoneSet {
    availability_zone_set: Vec<ZoneInfo>,
}

impl KsyunClient {
    /// Regions open to the account, cached for two hours
    pub async fn describe_regions(&self) -> Result<Vec<RegionInfo>> {
        self.regions
            .get_or_fetch(move || async move {
                let set: RegionSet = self
                    .call_as(
                        Service::Kec,
                        self.default_region(),
                        "DescribeRegions",
                        Params::new(),
                    )
                    .await?;
                Ok(set.region_set)
            })
            .await
    }

    pub async fn describe_zones(&self, region_id: &str) -> Result<Vec<ZoneInfo>> {
        let set: ZoneSet = self
            .call_as(
                Service::Kec,
                region_id,
                "DescribeAvailabilityZones",
                Params::new(),
            )
            .await?;
        Ok(set.availability_zone_set)
    }
}

pub struct KsyunRegion {
    client: Arc<KsyunClient>,
    info: RegionInfo,
}

impl KsyunRegion {
    pub fn new(client: Arc<KsyunClient>, info: RegionInfo) -> Self {
        Self { client, info }
    }
}

#[async_trait]
impl CloudResource for KsyunRegion {
    fn id(&self) -> String {
        self.info.region.clone()
    }

    fn name(&self) -> String {
        if self.info.region_name.is_empty() {
            self.info.region.clone()
        } else {
            self.info.region_name.clone()
        }
    }

    fn global_id(&self) -> String {
        format!("{}/{}", PROVIDER_ID, self.info.region)
    }

    fn status(&self) -> String {
        status::common::AVAILABLE.to_string()
    }

    async fn refresh(&mut self) -> Result<()> {
        self.client.regions.invalidate();
        let regions = self.client.describe_regions().await?;
        self.info = regions
            .into_iter()
            .find(|r| r.region == self.info.region)
            .ok_or_else(|| CloudError::NotFound(self.global_id()))?;
        Ok(())
    }
}

#[async_trait]
impl Region for KsyunRegion {
    fn provider(&self) -> String {
        PROVIDER_ID.to_string()
    }

    async fn zones(&self) -> Result<Vec<Box<dyn Zone>>> {
        let zones = self.client.describe_zones(&self.info.region).await?;
        Ok(zones
            .into_iter()
            .map(|info| {
                Box::new(KsyunZone::new(self.client.clone(), &self.info.region, info))
                    as Box<dyn Zone>
            })
            .collect())
    }

    async fn instance_by_id(&self, id: &str) -> Result<Box<dyn Instance>> {
        let found = self
            .client
            .describe_instances(&self.info.region, None, &[id.to_string()])
            .await?;
        let info = expect_single(found, id)?;
        Ok(Box::new(KsyunInstance::new(
            self.client.clone(),
            &self.info.region,
            info,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, client};
    use cloudbridge::ErrorKind;
    use serde_json::json;
    use std::time::Duration;

    fn beijing(transport: Arc<MockTransport>) -> KsyunRegion {
        KsyunRegion::new(
            client(transport),
            RegionInfo {
                region: "cn-beijing-6".to_string(),
                region_name: "Beijing 6".to_string(),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_regions_cached_until_expiry() {
        let transport = MockTransport::new();
        transport.ok(
            "DescribeRegions",
            json!({"RegionSet": [
                {"Region": "cn-beijing-6", "RegionName": "Beijing 6"},
                {"Region": "cn-shanghai-2", "RegionName": "Shanghai 2"}
            ]}),
        );
        let client = client(transport.clone());

        assert_eq!(client.describe_regions().await.unwrap().len(), 2);
        assert_eq!(client.describe_regions().await.unwrap().len(), 2);
        assert_eq!(transport.actions().len(), 1);

        tokio::time::advance(Duration::from_secs(2 * 60 * 60 + 1)).await;
        client.describe_regions().await.unwrap();
        assert_eq!(transport.actions().len(), 2);
    }

    #[tokio::test]
    async fn test_region_names() {
        let region = beijing(MockTransport::new());
        assert_eq!(region.id(), "cn-beijing-6");
        assert_eq!(region.name(), "Beijing 6");
        assert_eq!(region.global_id(), "ksyun/cn-beijing-6");
    }

    #[tokio::test]
    async fn test_zones_and_lookup() {
        let transport = MockTransport::new();
        transport.ok(
            "DescribeAvailabilityZones",
            json!({"AvailabilityZoneSet": [
                {"AvailabilityZone": "cn-beijing-6a"},
                {"AvailabilityZone": "cn-beijing-6b"}
            ]}),
        );
        let region = beijing(transport);

        let zones = region.zones().await.unwrap();
        assert_eq!(zones.len(), 2);
        let zone = region.zone_by_id("ksyun/cn-beijing-6/cn-beijing-6b").await.unwrap();
        assert_eq!(zone.id(), "cn-beijing-6b");
        assert_eq!(zone.region_id(), "cn-beijing-6");
    }

    #[tokio::test]
    async fn test_refresh_missing_region() {
        let transport = MockTransport::new();
        transport.ok("DescribeRegions", json!({"RegionSet": []}));
        let mut region = beijing(transport);

        let err = region.refresh().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_vpcs_not_implemented() {
        let region = beijing(MockTransport::new());
        let err = region.vpcs().await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }
}
