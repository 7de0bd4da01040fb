//! cloudbridge
//!
//! Provider-agnostic cloud resource contracts and the shared engine every
//! vendor adapter builds on.
//!
//! # Components
//!
//! - **Capability contracts**: [`resource`] traits for regions, zones,
//!   instances, disks, buckets, IAM objects and the rest, plus the
//!   account-level [`CloudProvider`]
//! - **Pagination**: token, marker and offset paging behind one lazy stream
//! - **Polling**: wait for a predicate or a resource status with a deadline
//! - **Retry**: bounded retry on known-transient vendor error codes
//! - **Read-only guard**: transport wrapper that blocks mutating calls
//! - **Tags**: canonical tag maps and remove/add deltas
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              orchestration layer                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │ CloudProvider / resource traits
//! ┌─────────────────▼───────────────────────────────┐
//! │                 cloudbridge                      │
//! │  ┌────────────┐ ┌──────────┐ ┌──────────────┐   │
//! │  │ pagination │ │   wait   │ │    retry     │   │
//! │  └────────────┘ └──────────┘ └──────────────┘   │
//! │  ┌────────────┐ ┌──────────┐ ┌──────────────┐   │
//! │  │    tags    │ │  cache   │ │ error kinds  │   │
//! │  └────────────┘ └──────────┘ └──────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  ReadOnlyGuard<Transport> + RequestSigner │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  volcengine   │ │     ksyun     │
//! │   adapter     │ │    adapter    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod guard;
pub mod pagination;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod retry;
pub mod tags;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod wait;

// Re-exports
pub use cache::ResourceCache;
pub use config::ProviderConfig;
pub use error::{CloudError, ErrorClassifier, ErrorKind, Result, ResultExt, expect_single};
pub use guard::{PermissionHook, ReadOnlyGuard};
pub use pagination::{Cursor, Page, fetch_all, paginate};
pub use provider::{
    AuthStatus, CloudProvider, ClouduserCreateOptions, ProviderFactory, find_in_regions,
};
pub use registry::{
    ProviderRegistry, create_provider, is_supported, provider_factory, register_factory,
    registered_provider_ids,
};
pub use resource::{
    Bucket, CloudResource, Cloudgroup, Cloudpolicy, Clouduser, Disk, DiskCreateConfig, Eip, Host,
    Instance, InstanceStopOptions, NatEntry, NatGateway, Network, Region, SecurityGroup,
    SecurityGroupRule, Snapshot, Storage, Tags, Vpc, Wire, Zone,
};
pub use retry::{RetryConfig, retry_on_error, retry_with_config};
pub use tags::{TagDelta, TagPolicy, apply_tag_delta};
pub use transport::{
    ApiRequest, ApiResponse, BearerSigner, HttpMethod, NoopSigner, Params, RequestSigner,
    ReqwestTransport, SigningScope, Transport, params,
};
pub use wait::{wait, wait_deleted, wait_multi_status, wait_status};
