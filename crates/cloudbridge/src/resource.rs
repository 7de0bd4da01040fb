//! Capability contracts for cloud resources
//!
//! Every vendor resource is exposed to callers as a trait object from this
//! module. Adapters implement the traits for their own types; callers never
//! downcast. Operations a vendor does not offer keep the default body,
//! which fails with [`CloudError::NotImplemented`].
//!
//! Ownership edges (zone to region, disk to storage, ...) are exposed as the
//! parent's id. Adapters that can resolve the parent lazily override the
//! matching lookup method.

use crate::error::{CloudError, Result, expect_single};
use crate::pagination::Page;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type Tags = HashMap<String, String>;

/// Normalized status vocabularies
pub mod status {
    pub mod instance {
        pub const RUNNING: &str = "running";
        /// Stopped and ready to start
        pub const READY: &str = "ready";
        pub const STARTING: &str = "starting";
        pub const STOPPING: &str = "stopping";
        pub const DELETING: &str = "deleting";
        pub const UNKNOWN: &str = "unknown";
    }

    pub mod disk {
        pub const ALLOCATING: &str = "allocating";
        pub const READY: &str = "ready";
        pub const ATTACHING: &str = "attaching";
        pub const DETACHING: &str = "detaching";
        pub const DELETING: &str = "deleting";
        pub const UNKNOWN: &str = "unknown";
    }

    pub mod snapshot {
        pub const CREATING: &str = "creating";
        pub const READY: &str = "ready";
        pub const DELETING: &str = "deleting";
        pub const FAILED: &str = "failed";
        pub const UNKNOWN: &str = "unknown";
    }

    pub mod eip {
        pub const ALLOCATING: &str = "allocating";
        pub const READY: &str = "ready";
        pub const ASSOCIATING: &str = "associating";
        pub const DISSOCIATING: &str = "dissociating";
        pub const DELETING: &str = "deleting";
        pub const UNKNOWN: &str = "unknown";
    }

    /// Regions, zones, VPCs, networks and other mostly-static resources
    pub mod common {
        pub const AVAILABLE: &str = "available";
        pub const PENDING: &str = "pending";
        pub const DELETING: &str = "deleting";
        pub const UNAVAILABLE: &str = "unavailable";
        pub const UNKNOWN: &str = "unknown";
    }
}

fn not_implemented<T>(operation: &str) -> Result<T> {
    Err(CloudError::NotImplemented(operation.to_string()))
}

/// Pick the single resource whose global id matches `id`
pub fn select_by_global_id<T>(items: Vec<Box<T>>, id: &str) -> Result<Box<T>>
where
    T: CloudResource + ?Sized,
{
    let matched = items
        .into_iter()
        .filter(|item| item.global_id() == id)
        .collect();
    expect_single(matched, id)
}

/// Identity, status and tags shared by every resource kind
#[async_trait]
pub trait CloudResource: Send + Sync {
    /// Provider-local id
    fn id(&self) -> String;

    fn name(&self) -> String;

    /// Unique across every account of the same vendor
    fn global_id(&self) -> String;

    /// Normalized status, see [`status`]
    fn status(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    /// Synthesized by the adapter rather than returned by the vendor
    fn is_emulated(&self) -> bool {
        false
    }

    /// Vendor-managed tags the caller cannot change
    fn sys_tags(&self) -> Tags {
        Tags::new()
    }

    /// Re-read this snapshot from the vendor in place
    async fn refresh(&mut self) -> Result<()>;

    async fn get_tags(&self) -> Result<Tags> {
        Ok(Tags::new())
    }

    /// Set user tags; with `replace` keys absent from `tags` are removed
    async fn set_tags(&mut self, _tags: &Tags, _replace: bool) -> Result<()> {
        not_implemented("set_tags")
    }
}

#[async_trait]
pub trait Region: CloudResource {
    /// Registered provider id
    fn provider(&self) -> String;

    async fn zones(&self) -> Result<Vec<Box<dyn Zone>>>;

    async fn zone_by_id(&self, id: &str) -> Result<Box<dyn Zone>> {
        select_by_global_id(self.zones().await?, id)
    }

    async fn vpcs(&self) -> Result<Vec<Box<dyn Vpc>>> {
        not_implemented("Region::vpcs")
    }

    async fn vpc_by_id(&self, id: &str) -> Result<Box<dyn Vpc>> {
        select_by_global_id(self.vpcs().await?, id)
    }

    async fn instance_by_id(&self, _id: &str) -> Result<Box<dyn Instance>> {
        not_implemented("Region::instance_by_id")
    }

    async fn disk_by_id(&self, _id: &str) -> Result<Box<dyn Disk>> {
        not_implemented("Region::disk_by_id")
    }

    async fn eips(&self) -> Result<Vec<Box<dyn Eip>>> {
        not_implemented("Region::eips")
    }

    async fn eip_by_id(&self, id: &str) -> Result<Box<dyn Eip>> {
        select_by_global_id(self.eips().await?, id)
    }

    async fn security_groups(&self) -> Result<Vec<Box<dyn SecurityGroup>>> {
        not_implemented("Region::security_groups")
    }

    async fn security_group_by_id(&self, id: &str) -> Result<Box<dyn SecurityGroup>> {
        select_by_global_id(self.security_groups().await?, id)
    }

    async fn snapshots(&self) -> Result<Vec<Box<dyn Snapshot>>> {
        not_implemented("Region::snapshots")
    }

    async fn snapshot_by_id(&self, id: &str) -> Result<Box<dyn Snapshot>> {
        select_by_global_id(self.snapshots().await?, id)
    }

    async fn buckets(&self) -> Result<Vec<Box<dyn Bucket>>> {
        not_implemented("Region::buckets")
    }

    async fn bucket_by_name(&self, name: &str) -> Result<Box<dyn Bucket>> {
        let matched = self
            .buckets()
            .await?
            .into_iter()
            .filter(|bucket| bucket.name() == name)
            .collect();
        expect_single(matched, name)
    }

    async fn create_bucket(&self, _name: &str, _storage_class: &str, _acl: &str) -> Result<()> {
        not_implemented("Region::create_bucket")
    }

    async fn delete_bucket(&self, _name: &str) -> Result<()> {
        not_implemented("Region::delete_bucket")
    }
}

#[async_trait]
pub trait Zone: CloudResource {
    fn region_id(&self) -> String;

    async fn hosts(&self) -> Result<Vec<Box<dyn Host>>> {
        not_implemented("Zone::hosts")
    }

    async fn host_by_id(&self, id: &str) -> Result<Box<dyn Host>> {
        select_by_global_id(self.hosts().await?, id)
    }

    async fn storages(&self) -> Result<Vec<Box<dyn Storage>>> {
        not_implemented("Zone::storages")
    }

    async fn storage_by_id(&self, id: &str) -> Result<Box<dyn Storage>> {
        select_by_global_id(self.storages().await?, id)
    }
}

/// Physical or emulated host; public clouds expose one per zone
#[async_trait]
pub trait Host: CloudResource {
    fn zone_id(&self) -> String;

    fn host_type(&self) -> String;

    async fn instances(&self) -> Result<Vec<Box<dyn Instance>>> {
        not_implemented("Host::instances")
    }

    async fn instance_by_id(&self, id: &str) -> Result<Box<dyn Instance>> {
        select_by_global_id(self.instances().await?, id)
    }

    async fn storages(&self) -> Result<Vec<Box<dyn Storage>>> {
        not_implemented("Host::storages")
    }
}

#[async_trait]
pub trait Vpc: CloudResource {
    fn region_id(&self) -> String;

    fn cidr_block(&self) -> String;

    fn is_default(&self) -> bool {
        false
    }

    async fn wires(&self) -> Result<Vec<Box<dyn Wire>>> {
        not_implemented("Vpc::wires")
    }

    async fn security_groups(&self) -> Result<Vec<Box<dyn SecurityGroup>>> {
        not_implemented("Vpc::security_groups")
    }

    async fn nat_gateways(&self) -> Result<Vec<Box<dyn NatGateway>>> {
        not_implemented("Vpc::nat_gateways")
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("Vpc::delete")
    }
}

/// Layer-2 segment of a VPC inside one zone
#[async_trait]
pub trait Wire: CloudResource {
    fn vpc_id(&self) -> String;

    fn zone_id(&self) -> String;

    async fn networks(&self) -> Result<Vec<Box<dyn Network>>> {
        not_implemented("Wire::networks")
    }

    async fn network_by_id(&self, id: &str) -> Result<Box<dyn Network>> {
        select_by_global_id(self.networks().await?, id)
    }
}

/// Subnet
#[async_trait]
pub trait Network: CloudResource {
    fn wire_id(&self) -> String;

    fn ip_start(&self) -> String;

    fn ip_end(&self) -> String;

    fn ip_mask(&self) -> u8;

    fn gateway(&self) -> String;

    async fn delete(&mut self) -> Result<()> {
        not_implemented("Network::delete")
    }
}

/// Disk category within a zone
#[async_trait]
pub trait Storage: CloudResource {
    fn zone_id(&self) -> String;

    fn storage_type(&self) -> String;

    fn capacity_mb(&self) -> i64 {
        0
    }

    async fn disks(&self) -> Result<Vec<Box<dyn Disk>>> {
        not_implemented("Storage::disks")
    }

    async fn disk_by_id(&self, id: &str) -> Result<Box<dyn Disk>> {
        select_by_global_id(self.disks().await?, id)
    }

    async fn create_disk(&self, _config: &DiskCreateConfig) -> Result<Box<dyn Disk>> {
        not_implemented("Storage::create_disk")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiskCreateConfig {
    pub name: String,
    pub size_gb: u32,
    pub description: String,
    pub project_id: String,
    pub tags: Tags,
}

#[async_trait]
pub trait Disk: CloudResource {
    fn storage_id(&self) -> String;

    fn size_mb(&self) -> i64;

    fn disk_type(&self) -> String;

    async fn storage(&self) -> Result<Box<dyn Storage>> {
        not_implemented("Disk::storage")
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("Disk::delete")
    }

    async fn resize(&mut self, _size_mb: i64) -> Result<()> {
        not_implemented("Disk::resize")
    }

    async fn create_snapshot(&self, _name: &str, _description: &str) -> Result<Box<dyn Snapshot>> {
        not_implemented("Disk::create_snapshot")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceStopOptions {
    pub force: bool,
    /// Release compute billing while stopped, where the vendor allows it
    pub stop_charging: bool,
}

/// Virtual machine
#[async_trait]
pub trait Instance: CloudResource {
    fn host_id(&self) -> String;

    fn instance_type(&self) -> String;

    fn vcpu_count(&self) -> u32;

    fn memory_mb(&self) -> u32;

    fn hypervisor(&self) -> String;

    async fn host(&self) -> Result<Box<dyn Host>> {
        not_implemented("Instance::host")
    }

    async fn disks(&self) -> Result<Vec<Box<dyn Disk>>> {
        not_implemented("Instance::disks")
    }

    async fn security_group_ids(&self) -> Result<Vec<String>> {
        not_implemented("Instance::security_group_ids")
    }

    async fn set_security_groups(&mut self, _ids: &[String]) -> Result<()> {
        not_implemented("Instance::set_security_groups")
    }

    async fn start(&mut self) -> Result<()> {
        not_implemented("Instance::start")
    }

    async fn stop(&mut self, _options: &InstanceStopOptions) -> Result<()> {
        not_implemented("Instance::stop")
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("Instance::delete")
    }

    async fn attach_disk(&mut self, _disk_id: &str) -> Result<()> {
        not_implemented("Instance::attach_disk")
    }

    async fn detach_disk(&mut self, _disk_id: &str) -> Result<()> {
        not_implemented("Instance::detach_disk")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupRuleCreateOptions {
    pub direction: RuleDirection,
    pub action: RuleAction,
    pub protocol: String,
    /// `"22"`, `"8000-8080"` or empty for all ports
    pub ports: String,
    pub cidr: String,
    pub priority: i32,
    pub description: String,
}

#[async_trait]
pub trait SecurityGroup: CloudResource {
    fn vpc_id(&self) -> String;

    async fn rules(&self) -> Result<Vec<Box<dyn SecurityGroupRule>>> {
        not_implemented("SecurityGroup::rules")
    }

    async fn create_rule(
        &mut self,
        _options: &SecurityGroupRuleCreateOptions,
    ) -> Result<Box<dyn SecurityGroupRule>> {
        not_implemented("SecurityGroup::create_rule")
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("SecurityGroup::delete")
    }
}

/// Rule owned by a security group
#[async_trait]
pub trait SecurityGroupRule: Send + Sync {
    fn global_id(&self) -> String;

    fn security_group_id(&self) -> String;

    fn direction(&self) -> RuleDirection;

    fn action(&self) -> RuleAction;

    fn protocol(&self) -> String;

    fn ports(&self) -> String;

    fn cidrs(&self) -> Vec<String>;

    fn priority(&self) -> i32;

    fn description(&self) -> String {
        String::new()
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("SecurityGroupRule::delete")
    }
}

/// Elastic public IP
#[async_trait]
pub trait Eip: CloudResource {
    fn ip_addr(&self) -> String;

    fn bandwidth_mbps(&self) -> u32;

    /// Id of the resource the address is bound to, empty when free
    fn association_id(&self) -> String;

    async fn associate(&mut self, _instance_id: &str) -> Result<()> {
        not_implemented("Eip::associate")
    }

    async fn dissociate(&mut self) -> Result<()> {
        not_implemented("Eip::dissociate")
    }

    async fn change_bandwidth(&mut self, _mbps: u32) -> Result<()> {
        not_implemented("Eip::change_bandwidth")
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("Eip::delete")
    }
}

#[async_trait]
pub trait Snapshot: CloudResource {
    fn disk_id(&self) -> String;

    fn size_mb(&self) -> i64;

    async fn delete(&mut self) -> Result<()> {
        not_implemented("Snapshot::delete")
    }
}

#[async_trait]
pub trait NatGateway: CloudResource {
    fn vpc_id(&self) -> String;

    fn spec(&self) -> String;

    async fn dnat_entries(&self) -> Result<Vec<Box<dyn NatEntry>>> {
        not_implemented("NatGateway::dnat_entries")
    }

    async fn snat_entries(&self) -> Result<Vec<Box<dyn NatEntry>>> {
        not_implemented("NatGateway::snat_entries")
    }

    async fn delete(&mut self) -> Result<()> {
        not_implemented("NatGateway::delete")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NatEntryType {
    Dnat,
    Snat,
}

/// DNAT or SNAT rule owned by a NAT gateway
#[async_trait]
pub trait NatEntry: CloudResource {
    fn nat_gateway_id(&self) -> String;

    fn entry_type(&self) -> NatEntryType;

    fn external_ip(&self) -> String;

    fn internal_ip(&self) -> String;

    async fn delete(&mut self) -> Result<()> {
        not_implemented("NatEntry::delete")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size_bytes: i64,
    pub etag: String,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Object storage bucket
#[async_trait]
pub trait Bucket: CloudResource {
    fn region_id(&self) -> String;

    fn location(&self) -> String;

    fn storage_class(&self) -> String;

    fn acl(&self) -> String;

    async fn set_acl(&mut self, _acl: &str) -> Result<()> {
        not_implemented("Bucket::set_acl")
    }

    /// One page of objects under `prefix`, marker-paged
    async fn list_objects(
        &self,
        _prefix: &str,
        _marker: &str,
        _max_keys: u32,
    ) -> Result<Page<ObjectInfo>> {
        not_implemented("Bucket::list_objects")
    }

    async fn delete_object(&self, _key: &str) -> Result<()> {
        not_implemented("Bucket::delete_object")
    }
}

/// IAM user
#[async_trait]
pub trait Clouduser: Send + Sync {
    fn global_id(&self) -> String;

    fn name(&self) -> String;

    fn email(&self) -> String {
        String::new()
    }

    fn is_console_login(&self) -> bool {
        false
    }

    async fn groups(&self) -> Result<Vec<Box<dyn Cloudgroup>>> {
        not_implemented("Clouduser::groups")
    }

    async fn policies(&self) -> Result<Vec<Box<dyn Cloudpolicy>>> {
        not_implemented("Clouduser::policies")
    }

    async fn attach_policy(&self, _policy: &str) -> Result<()> {
        not_implemented("Clouduser::attach_policy")
    }

    async fn detach_policy(&self, _policy: &str) -> Result<()> {
        not_implemented("Clouduser::detach_policy")
    }

    async fn reset_password(&self, _password: &str) -> Result<()> {
        not_implemented("Clouduser::reset_password")
    }

    async fn delete(&self) -> Result<()> {
        not_implemented("Clouduser::delete")
    }
}

/// IAM group
#[async_trait]
pub trait Cloudgroup: Send + Sync {
    fn global_id(&self) -> String;

    fn name(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    async fn users(&self) -> Result<Vec<Box<dyn Clouduser>>> {
        not_implemented("Cloudgroup::users")
    }

    async fn policies(&self) -> Result<Vec<Box<dyn Cloudpolicy>>> {
        not_implemented("Cloudgroup::policies")
    }

    async fn add_user(&self, _user: &str) -> Result<()> {
        not_implemented("Cloudgroup::add_user")
    }

    async fn remove_user(&self, _user: &str) -> Result<()> {
        not_implemented("Cloudgroup::remove_user")
    }

    async fn attach_policy(&self, _policy: &str) -> Result<()> {
        not_implemented("Cloudgroup::attach_policy")
    }

    async fn detach_policy(&self, _policy: &str) -> Result<()> {
        not_implemented("Cloudgroup::detach_policy")
    }

    async fn delete(&self) -> Result<()> {
        not_implemented("Cloudgroup::delete")
    }
}

/// IAM policy
#[async_trait]
pub trait Cloudpolicy: Send + Sync {
    fn global_id(&self) -> String;

    fn name(&self) -> String;

    fn description(&self) -> String {
        String::new()
    }

    async fn document(&self) -> Result<serde_json::Value> {
        not_implemented("Cloudpolicy::document")
    }

    async fn update_document(&self, _document: &serde_json::Value) -> Result<()> {
        not_implemented("Cloudpolicy::update_document")
    }

    async fn delete(&self) -> Result<()> {
        not_implemented("Cloudpolicy::delete")
    }
}
