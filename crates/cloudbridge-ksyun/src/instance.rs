//! KEC instances

use crate::PROVIDER_ID;
use crate::client::{KsyunClient, Service};
use crate::zone::KsyunHost;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudbridge::resource::status;
use cloudbridge::{
    CloudError, CloudResource, Cursor, Host, Instance, InstanceStopOptions, Page, Params, Result,
    expect_single, fetch_all, params, wait_deleted, wait_status,
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const INSTANCE_PAGE_SIZE: u64 = 1000;

/// Raw `InstanceState.Name` values
pub mod state {
    pub const SCHEDULING: &str = "scheduling";
    pub const BLOCK_DEVICE_MAPPING: &str = "block_device_mapping";
    pub const ACTIVE: &str = "active";
    pub const STOPPING: &str = "stopping";
    pub const STOPPED: &str = "stopped";
    pub const DELETING: &str = "deleting";
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstanceConfigure {
    #[serde(rename = "VCPU")]
    pub vcpu: u32,
    #[serde(rename = "MemoryGb")]
    pub memory_gb: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstanceState {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SecurityGroupRef {
    pub security_group_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NetworkInterface {
    pub network_interface_id: String,
    pub network_interface_type: String,
    pub vpc_id: String,
    pub subnet_id: String,
    #[serde(rename = "PrivateIpAddress")]
    pub private_ip_address: String,
    pub security_group_set: Vec<SecurityGroupRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub instance_name: String,
    pub instance_type: String,
    pub instance_configure: InstanceConfigure,
    pub instance_state: InstanceState,
    pub availability_zone: String,
    pub creation_date: String,
    pub project_id: String,
    pub charge_type: String,
    pub network_interface_set: Vec<NetworkInterface>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstancePage {
    instances_set: Vec<InstanceInfo>,
    instance_count: u64,
}

impl KsyunClient {
    /// Instances of a region, optionally narrowed to one zone or to ids.
    ///
    /// `Marker` is a numeric offset; paging stops once `InstanceCount`
    /// instances have been collected.
    pub async fn describe_instances(
        &self,
        region_id: &str,
        zone_id: Option<&str>,
        ids: &[String],
    ) -> Result<Vec<InstanceInfo>> {
        let mut base = Params::new();
        if let Some(zone_id) = zone_id {
            base.insert("Filter.1.Name".to_string(), "availability-zone-name".to_string());
            base.insert("Filter.1.Value.1".to_string(), zone_id.to_string());
        }
        for (i, id) in ids.iter().enumerate() {
            base.insert(format!("InstanceId.{}", i + 1), id.clone());
        }
        for (i, project) in self.project_ids().iter().enumerate() {
            base.insert(format!("ProjectId.{}", i + 1), project.clone());
        }

        let initial = Cursor::Offset {
            offset: 0,
            limit: INSTANCE_PAGE_SIZE,
        };
        let base = &base;
        fetch_all(Some(initial), move |cursor| async move {
            let (offset, limit) = cursor
                .as_ref()
                .and_then(Cursor::as_offset)
                .unwrap_or((0, INSTANCE_PAGE_SIZE));
            let mut params = base.clone();
            params.insert("MaxResults".to_string(), limit.to_string());
            params.insert("Marker".to_string(), offset.to_string());

            let page: InstancePage = self
                .call_as(Service::Kec, region_id, "DescribeInstances", params)
                .await?;
            Ok(Page::with_offset(
                page.instances_set,
                offset,
                limit,
                Some(page.instance_count),
            ))
        })
        .await
    }
}

fn instance_status(raw: &str) -> &'static str {
    match raw {
        state::SCHEDULING | state::BLOCK_DEVICE_MAPPING => status::instance::STARTING,
        state::ACTIVE => status::instance::RUNNING,
        state::STOPPING => status::instance::STOPPING,
        state::STOPPED => status::instance::READY,
        state::DELETING => status::instance::DELETING,
        _ => status::instance::UNKNOWN,
    }
}

pub struct KsyunInstance {
    client: Arc<KsyunClient>,
    region_id: String,
    info: InstanceInfo,
}

impl KsyunInstance {
    pub fn new(client: Arc<KsyunClient>, region_id: &str, info: InstanceInfo) -> Self {
        Self {
            client,
            region_id: region_id.to_string(),
            info,
        }
    }

    pub fn info(&self) -> &InstanceInfo {
        &self.info
    }

    fn raw_state(&self) -> &str {
        &self.info.instance_state.name
    }

    fn invalid_status(&self, operation: &str) -> CloudError {
        CloudError::InvalidStatus(format!(
            "cannot {} instance {} in state {}",
            operation,
            self.info.instance_id,
            self.raw_state()
        ))
    }

    async fn volume_call(&self, action: &str, disk_id: &str) -> Result<()> {
        let mut params = params([
            ("InstanceId", self.info.instance_id.as_str()),
            ("VolumeId", disk_id),
        ]);
        if action == "AttachVolume" {
            params.insert("DeleteWithInstance".to_string(), "true".to_string());
        }
        self.client
            .call(Service::Ebs, &self.region_id, action, params)
            .await?;
        tracing::info!("{} {} on {}", action, disk_id, self.info.instance_id);
        Ok(())
    }
}

#[async_trait]
impl CloudResource for KsyunInstance {
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
        instance_status(self.raw_state()).to_string()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.info.creation_date)
            .ok()
            .map(|t| t.with_timezone(&Utc))
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
}

#[async_trait]
impl Instance for KsyunInstance {
    fn host_id(&self) -> String {
        self.host_handle().global_id()
    }

    fn instance_type(&self) -> String {
        self.info.instance_type.clone()
    }

    fn vcpu_count(&self) -> u32 {
        self.info.instance_configure.vcpu
    }

    fn memory_mb(&self) -> u32 {
        self.info.instance_configure.memory_gb * 1024
    }

    fn hypervisor(&self) -> String {
        PROVIDER_ID.to_string()
    }

    async fn host(&self) -> Result<Box<dyn Host>> {
        Ok(Box::new(self.host_handle()))
    }

    async fn security_group_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .info
            .network_interface_set
            .iter()
            .flat_map(|nic| nic.security_group_set.iter())
            .map(|group| group.security_group_id.clone())
            .collect())
    }

    async fn start(&mut self) -> Result<()> {
        if self.raw_state() != state::STOPPED {
            return Err(self.invalid_status("start"));
        }
        let params = params([("InstanceId.1", self.info.instance_id.as_str())]);
        self.client
            .call(Service::Kec, &self.region_id, "StartInstances", params)
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
        match self.raw_state() {
            state::STOPPED => return Ok(()),
            state::ACTIVE => {}
            _ => return Err(self.invalid_status("stop")),
        }
        let mode = if options.stop_charging {
            "StopCharging"
        } else {
            "KeepCharging"
        };
        let mut params = params([
            ("InstanceId.1", self.info.instance_id.as_str()),
            ("StoppedMode", mode),
        ]);
        if options.force {
            params.insert("ForceStop".to_string(), "true".to_string());
        }
        self.client
            .call(Service::Kec, &self.region_id, "StopInstances", params)
            .await?;
        tracing::info!("Stopping instance {} ({})", self.info.instance_id, mode);

        wait_status(
            self,
            status::instance::READY,
            Duration::from_secs(5),
            Duration::from_secs(300),
        )
        .await
    }

    async fn delete(&mut self) -> Result<()> {
        let params = params([
            ("InstanceId.1", self.info.instance_id.as_str()),
            ("ForceDelete", "true"),
        ]);
        self.client
            .call(Service::Kec, &self.region_id, "TerminateInstances", params)
            .await?;
        tracing::info!("Terminating instance {}", self.info.instance_id);

        wait_deleted(self, Duration::from_secs(10), Duration::from_secs(300)).await
    }

    async fn attach_disk(&mut self, disk_id: &str) -> Result<()> {
        self.volume_call("AttachVolume", disk_id).await
    }

    async fn detach_disk(&mut self, disk_id: &str) -> Result<()> {
        self.volume_call("DetachVolume", disk_id).await
    }
}

impl KsyunInstance {
    fn host_handle(&self) -> KsyunHost {
        KsyunHost::new(
            self.client.clone(),
            &self.region_id,
            &self.info.availability_zone,
        )
    }
}
