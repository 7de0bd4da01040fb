//! ECS instances

use crate::PROVIDER_ID;
use crate::client::{Service, VolcEngineClient};
use crate::disk::{VolcEngineDisk, VolumeFilter};
use crate::zone::VolcEngineHost;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudbridge::resource::status;
use cloudbridge::tags::{self, TagEntry};
use cloudbridge::{
    CloudError, CloudResource, Cursor, Disk, Host, Instance, InstanceStopOptions, Page, Result,
    RetryConfig, Tags, expect_single, fetch_all, params, retry_on_error, retry_with_config,
    wait_deleted, wait_status,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// DescribeInstances rejects larger pages
const INSTANCE_PAGE_SIZE: u32 = 10;

const CONFLICT: &str = "InvalidOperation.Conflict";
const INITIALIZING: &str = "IncorrectInstanceStatus.Initializing";

/// Raw instance states
pub mod state {
    pub const CREATING: &str = "CREATING";
    pub const RUNNING: &str = "RUNNING";
    pub const STOPPING: &str = "STOPPING";
    pub const STOPPED: &str = "STOPPED";
    pub const REBOOTING: &str = "REBOOTING";
    pub const STARTING: &str = "STARTING";
    pub const DELETING: &str = "DELETING";
    pub const ERROR: &str = "ERROR";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetworkInterface {
    pub network_interface_id: String,
    pub primary_ip_address: String,
    pub security_group_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub instance_name: String,
    pub description: String,
    pub zone_id: String,
    pub status: String,
    pub instance_type_id: String,
    pub cpus: u32,
    /// MB
    pub memory_size: u32,
    pub vpc_id: String,
    pub created_at: String,
    pub project_name: String,
    pub tags: Vec<TagEntry>,
    pub network_interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstancePage {
    instances: Vec<InstanceInfo>,
    next_token: String,
}

impl VolcEngineClient {
    /// Instances of a region, optionally narrowed to one zone or to ids
    pub async fn describe_instances(
        &self,
        region_id: &str,
        zone_id: Option<&str>,
        ids: &[String],
    ) -> Result<Vec<InstanceInfo>> {
        fetch_all(None, move |cursor| async move {
            let page_size = INSTANCE_PAGE_SIZE.to_string();
            let mut params = params([("MaxResults", page_size.as_str())]);
            if let Some(token) = cursor.as_ref().and_then(Cursor::as_token) {
                params.insert("NextToken".to_string(), token.to_string());
            }
            if let Some(zone_id) = zone_id {
                params.insert("ZoneId".to_string(), zone_id.to_string());
            }
            for (i, id) in ids.iter().enumerate() {
                params.insert(format!("InstanceIds.{}", i + 1), id.clone());
            }

            let page: InstancePage = self
                .call_as(Service::Ecs, region_id, "DescribeInstances", params)
                .await?;
            Ok(Page::with_token(page.instances, page.next_token))
        })
        .await
    }
}

fn instance_status(raw: &str) -> &'static str {
    match raw {
        state::RUNNING => status::instance::RUNNING,
        state::STARTING => status::instance::STARTING,
        state::STOPPING => status::instance::STOPPING,
        state::STOPPED => status::instance::READY,
        state::DELETING => status::instance::DELETING,
        _ => status::instance::UNKNOWN,
    }
}

pub struct VolcEngineInstance {
    client: Arc<VolcEngineClient>,
    region_id: String,
    info: InstanceInfo,
}

impl VolcEngineInstance {
    pub fn new(client: Arc<VolcEngineClient>, region_id: &str, info: InstanceInfo) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            info,
        }
    }

    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    fn all_tags(&self) -> Tags {
        tags::from_entries(self.info.tags.iter().cloned())
    }

    fn invalid_status(&self, operation: &str) -> CloudError {
        CloudError::InvalidStatus(format!(
            "cannot {} instance {} in state {}",
            operation, self.info.instance_id, self.info.status
        ))
    }

    async fn volume_call(&self, action: &str, disk_id: &str) -> Result<()> {
        let client = &self.client;
        let region_id = self.region_id.as_str();
        let instance_id = self.info.instance_id.as_str();
        retry_on_error(
            move || {
                client.call(
                    Service::Ebs,
                    region_id,
                    action,
                    params([("InstanceId", instance_id), ("VolumeId", disk_id)]),
                )
            },
            &[CONFLICT],
            4,
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl CloudResource for VolcEngineInstance {
    fn id(&self) -> String {
        self.info.instance_id.clone()
    }

    fn name(&self) -> String {
        self.info.instance_name.clone()
    }

    fn global_id(&self) -> String {
        self.info.instance_id.clone()
    }

    fn status(&self) -> String {
        instance_status(&self.info.status).to_string()
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
        let ids = [self.info.instance_id.clone()];
        let found = self
            .client
            .describe_instances(&self.region_id, None, &ids)
            .await?;
        self.info = expect_single(found, &self.info.instance_id)?;
        Ok(())
    }

    async fn get_tags(&self) -> Result<Tags> {
        Ok(self.client.tag_policy().split(self.all_tags()).0)
    }

    async fn set_tags(&mut self, desired: &Tags, replace: bool) -> Result<()> {
        let current = self.all_tags();
        self.client
            .update_tags(
                Service::Ecs,
                &self.region_id,
                "instance",
                &self.info.instance_id,
                &current,
                desired,
                replace,
            )
            .await?;
        self.refresh().await
    }
}

#[async_trait]
impl Instance for VolcEngineInstance {
    fn host_id(&self) -> String {
        VolcEngineHost::new(self.client.clone(), &self.region_id, &self.info.zone_id).global_id()
    }

    fn instance_type(&self) -> String {
        self.info.instance_type_id.clone()
    }

    fn vcpu_count(&self) -> u32 {
        self.info.cpus
    }

    fn memory_mb(&self) -> u32 {
        self.info.memory_size
    }

    fn hypervisor(&self) -> String {
        PROVIDER_ID.to_string()
    }

    async fn host(&self) -> Result<Box<dyn Host>> {
        Ok(Box::new(VolcEngineHost::new(
            self.client.clone(),
            &self.region_id,
            &self.info.zone_id,
        )))
    }

    async fn disks(&self) -> Result<Vec<Box<dyn Disk>>> {
        let filter = VolumeFilter {
            instance_id: Some(self.info.instance_id.clone()),
            ..Default::default()
        };
        let volumes = self
            .client
            .describe_volumes(&self.region_id, &filter)
            .await?;
        Ok(volumes
            .into_iter()
            .map(|info| {
                Box::new(VolcEngineDisk::new(self.client.clone(), &self.region_id, info))
                    as Box<dyn Disk>
            })
            .collect())
    }

    async fn security_group_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .info
            .network_interfaces
            .iter()
            .flat_map(|nic| nic.security_group_ids.iter().cloned())
            .collect())
    }

    async fn start(&mut self) -> Result<()> {
        if self.info.status != state::STOPPED {
            return Err(self.invalid_status("start"));
        }
        let params = params([("InstanceId", self.info.instance_id.as_str())]);
        self.client
            .call(Service::Ecs, &self.region_id, "StartInstance", params)
            .await?;
        tracing::info!("Starting instance {}", self.info.instance_id);
        wait_status(
            self,
            status::instance::RUNNING,
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
        .await
    }

    async fn stop(&mut self, options: &InstanceStopOptions) -> Result<()> {
        if self.info.status == state::STOPPED {
            return Ok(());
        }
        if self.info.status != state::RUNNING {
            return Err(self.invalid_status("stop"));
        }
        let stopped_mode = if options.stop_charging {
            "StopCharging"
        } else {
            "KeepCharging"
        };
        let params = params([
            ("InstanceId", self.info.instance_id.as_str()),
            ("ForceStop", if options.force { "true" } else { "false" }),
            ("StoppedMode", stopped_mode),
        ]);
        self.client
            .call(Service::Ecs, &self.region_id, "StopInstance", params)
            .await?;
        tracing::info!("Stopping instance {}", self.info.instance_id);
        wait_status(
            self,
            status::instance::READY,
            Duration::from_secs(10),
            Duration::from_secs(300),
        )
        .await
    }

    async fn delete(&mut self) -> Result<()> {
        {
            let client = &self.client;
            let region_id = self.region_id.as_str();
            let instance_id = self.info.instance_id.as_str();
            // a freshly created instance refuses deletion until it is initialized
            let config = RetryConfig::immediate(30)
                .with_backoff(Duration::from_secs(10), Duration::from_secs(10));
            retry_with_config(
                move || {
                    client.call(
                        Service::Ecs,
                        region_id,
                        "DeleteInstance",
                        params([("InstanceId", instance_id)]),
                    )
                },
                &[INITIALIZING],
                &config,
            )
            .await?;
        }
        tracing::info!("Deleting instance {}", self.info.instance_id);
        wait_deleted(self, Duration::from_secs(10), Duration::from_secs(300)).await
    }

    async fn attach_disk(&mut self, disk_id: &str) -> Result<()> {
        self.volume_call("AttachVolume", disk_id).await
    }

    async fn detach_disk(&mut self, disk_id: &str) -> Result<()> {
        self.volume_call("DetachVolume", disk_id).await
    }
}
