//! Block storage volumes

use crate::client::{Service, VolcEngineClient};
use crate::zone::VolcEngineStorage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudbridge::resource::status;
use cloudbridge::tags::{self, TagEntry};
use cloudbridge::{
    CloudError, CloudResource, Cursor, Disk, DiskCreateConfig, Page, Params, Result, Storage, Tags,
    expect_single, fetch_all, params, wait_deleted, wait_status,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const VOLUME_PAGE_SIZE: u64 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VolumeInfo {
    pub volume_id: String,
    pub volume_name: String,
    pub description: String,
    pub volume_type: String,
    /// "system" or "data"
    pub kind: String,
    /// GB
    pub size: u64,
    pub status: String,
    pub zone_id: String,
    pub instance_id: String,
    pub created_at: String,
    pub tags: Vec<TagEntry>,
}

/// Narrows a DescribeVolumes query
#[derive(Debug, Clone, Default)]
pub struct VolumeFilter {
    pub ids: Vec<String>,
    pub zone_id: Option<String>,
    pub volume_type: Option<String>,
    pub instance_id: Option<String>,
}

impl VolumeFilter {
    fn params(&self) -> Params {
        let mut params = Params::new();
        for (i, id) in self.ids.iter().enumerate() {
            params.insert(format!("VolumeIds.{}", i + 1), id.clone());
        }
        if let Some(zone_id) = &self.zone_id {
            params.insert("ZoneId".to_string(), zone_id.clone());
        }
        if let Some(volume_type) = &self.volume_type {
            params.insert("VolumeType".to_string(), volume_type.clone());
        }
        if let Some(instance_id) = &self.instance_id {
            params.insert("InstanceId".to_string(), instance_id.clone());
        }
        params
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct VolumePage {
    volumes: Vec<VolumeInfo>,
    total_count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreatedVolume {
    volume_id: String,
}

impl VolcEngineClient {
    /// Page-numbered volume listing
    pub async fn describe_volumes(
        &self,
        region_id: &str,
        filter: &VolumeFilter,
    ) -> Result<Vec<VolumeInfo>> {
        let first = Cursor::PageNumber {
            page: 1,
            size: VOLUME_PAGE_SIZE,
        };
        fetch_all(Some(first), move |cursor| async move {
            let (page_number, size) = cursor
                .as_ref()
                .and_then(Cursor::as_page_number)
                .unwrap_or((1, VOLUME_PAGE_SIZE));
            let mut params = filter.params();
            params.insert("PageNumber".to_string(), page_number.to_string());
            params.insert("PageSize".to_string(), size.to_string());

            let page: VolumePage = self
                .call_as(Service::Ebs, region_id, "DescribeVolumes", params)
                .await?;
            Ok(Page::with_page_number(
                page.volumes,
                page_number,
                size,
                Some(page.total_count),
            ))
        })
        .await
    }

    /// Create a data volume, returning its id
    pub async fn create_volume(
        &self,
        region_id: &str,
        zone_id: &str,
        volume_type: &str,
        config: &DiskCreateConfig,
    ) -> Result<String> {
        let size = config.size_gb.to_string();
        let mut params = params([
            ("ZoneId", zone_id),
            ("VolumeName", config.name.as_str()),
            ("VolumeType", volume_type),
            ("Kind", "data"),
            ("Size", size.as_str()),
        ]);
        if !config.description.is_empty() {
            params.insert("Description".to_string(), config.description.clone());
        }
        if !config.project_id.is_empty() {
            params.insert("ProjectName".to_string(), config.project_id.clone());
        }
        let mut tags: Vec<(&String, &String)> = config.tags.iter().collect();
        tags.sort();
        for (i, (key, value)) in tags.into_iter().enumerate() {
            params.insert(format!("Tags.{}.Key", i + 1), key.clone());
            params.insert(format!("Tags.{}.Value", i + 1), value.clone());
        }

        let created: CreatedVolume = self
            .call_as(Service::Ebs, region_id, "CreateVolume", params)
            .await?;
        if created.volume_id.is_empty() {
            return Err(CloudError::ApiError(
                "CreateVolume returned no volume id".to_string(),
            ));
        }
        Ok(created.volume_id)
    }
}

fn disk_status(raw: &str) -> &'static str {
    match raw {
        "available" | "attached" => status::disk::READY,
        "creating" => status::disk::ALLOCATING,
        "attaching" => status::disk::ATTACHING,
        "detaching" => status::disk::DETACHING,
        "deleting" => status::disk::DELETING,
        _ => status::disk::UNKNOWN,
    }
}

pub struct VolcEngineDisk {
    client: Arc<VolcEngineClient>,
    region_id: String,
    info: VolumeInfo,
}

impl VolcEngineDisk {
    pub fn new(client: Arc<VolcEngineClient>, region_id: &str, info: VolumeInfo) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            info,
        }
    }

    /// Handle for a volume that was just requested
    pub fn pending(client: Arc<VolcEngineClient>, region_id: &str, volume_id: &str) -> Self {
        Self::new(
            client,
            region_id,
            VolumeInfo {
                volume_id: volume_id.to_string(),
                status: "creating".to_string(),
                ..Default::default()
            },
        )
    }

    pub fn info(&self) -> &VolumeInfo {
        &self.info
    }

    fn all_tags(&self) -> Tags {
        tags::from_entries(self.info.tags.iter().cloned())
    }
}

#[async_trait]
impl CloudResource for VolcEngineDisk {
    fn id(&self) -> String {
        self.info.volume_id.clone()
    }

    fn name(&self) -> String {
        self.info.volume_name.clone()
    }

    fn global_id(&self) -> String {
        self.info.volume_id.clone()
    }

    fn status(&self) -> String {
        disk_status(&self.info.status).to_string()
    }

    fn description(&self) -> String {
        self.info.description.clone()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.info.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    fn sys_tags(&self) -> Tags {
        self.client.tag_policy().split(self.all_tags()).1
    }

    async fn refresh(&mut self) -> Result<()> {
        let filter = VolumeFilter {
            ids: vec![self.info.volume_id.clone()],
            ..Default::default()
        };
        let found = self
            .client
            .describe_volumes(&self.region_id, &filter)
            .await?;
        self.info = expect_single(found, &self.info.volume_id)?;
        Ok(())
    }

    async fn get_tags(&self) -> Result<Tags> {
        Ok(self.client.tag_policy().split(self.all_tags()).0)
    }

    async fn set_tags(&mut self, desired: &Tags, replace: bool) -> Result<()> {
        let current = self.all_tags();
        self.client
            .update_tags(
                Service::Ebs,
                &self.region_id,
                "volume",
                &self.info.volume_id,
                &current,
                desired,
                replace,
            )
            .await?;
        self.refresh().await
    }
}

#[async_trait]
impl Disk for VolcEngineDisk {
    fn storage_id(&self) -> String {
        format!("{}-{}", self.info.zone_id, self.info.volume_type)
    }

    fn size_mb(&self) -> i64 {
        self.info.size as i64 * 1024
    }

    fn disk_type(&self) -> String {
        self.info.kind.clone()
    }

    async fn storage(&self) -> Result<Box<dyn Storage>> {
        Ok(Box::new(VolcEngineStorage::new(
            self.client.clone(),
            &self.region_id,
            &self.info.zone_id,
            &self.info.volume_type,
        )))
    }

    async fn delete(&mut self) -> Result<()> {
        if self.info.status == "attached" {
            return Err(CloudError::InvalidStatus(format!(
                "volume {} is attached to {}",
                self.info.volume_id, self.info.instance_id
            )));
        }
        let params = params([("VolumeId", self.info.volume_id.as_str())]);
        self.client
            .call(Service::Ebs, &self.region_id, "DeleteVolume", params)
            .await?;
        tracing::info!("Deleting volume {}", self.info.volume_id);
        wait_deleted(self, Duration::from_secs(5), Duration::from_secs(300)).await
    }

    async fn resize(&mut self, size_mb: i64) -> Result<()> {
        let size_gb = (size_mb.max(0) as u64).div_ceil(1024);
        if size_gb <= self.info.size {
            return Err(CloudError::InputParameter(format!(
                "volume {} can only grow: {} GB requested, {} GB now",
                self.info.volume_id, size_gb, self.info.size
            )));
        }
        let new_size = size_gb.to_string();
        let params = params([
            ("VolumeId", self.info.volume_id.as_str()),
            ("NewSize", new_size.as_str()),
        ]);
        self.client
            .call(Service::Ebs, &self.region_id, "ExtendVolume", params)
            .await?;
        wait_status(
            self,
            status::disk::READY,
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
        .await
    }
}
