//! VolcEngine adapter for cloudbridge
//!
//! Implements the cloudbridge capability contracts on top of the VolcEngine
//! OpenAPI (ECS and EBS) and TOS object storage.
//!
//! # Features
//!
//! - Regions (cached) and zones
//! - Instances: start, stop, delete, attach and detach volumes
//! - Volumes: create, resize, delete
//! - Instance and volume tags
//! - TOS buckets (cached per account) and their objects
//!
//! Every call is signed by the caller's [`RequestSigner`], routed through
//! the account's read-only guard, and vendor error codes are mapped to
//! cloudbridge error kinds.
//!
//! # Example
//!
//! ```ignore
//! use cloudbridge::{ProviderConfig, create_provider};
//!
//! cloudbridge_volcengine::register_with_signer(Arc::new(MyGatewaySigner::new()));
//!
//! let config = ProviderConfig::new("volcengine", access_key, secret_key);
//! let provider = create_provider(config).await?;
//! for region in provider.regions().await? {
//!     println!("{}", region.global_id());
//! }
//! ```

pub mod bucket;
pub mod client;
pub mod disk;
pub mod error;
pub mod instance;
pub mod provider;
pub mod region;
pub mod zone;

#[cfg(test)]
mod testing;

pub use bucket::{BucketInfo, VolcEngineBucket};
pub use client::{Service, VolcEngineClient};
pub use error::{Result, VolcEngineError};
pub use provider::{VolcEngineFactory, VolcEngineProvider};

use cloudbridge::RequestSigner;
use std::sync::{Arc, OnceLock};

/// Registry id of this adapter
pub const PROVIDER_ID: &str = "volcengine";

static REGISTERED: OnceLock<()> = OnceLock::new();

/// Add an unsigned VolcEngine factory to the cloudbridge registry, unless
/// one is already registered
pub fn register() {
    REGISTERED.get_or_init(|| {
        if !cloudbridge::is_supported(PROVIDER_ID) {
            cloudbridge::register_factory(Arc::new(VolcEngineFactory::default()));
        }
    });
}

/// Register (or replace) the factory with one that signs through `signer`
pub fn register_with_signer(signer: Arc<dyn RequestSigner>) {
    cloudbridge::register_factory(Arc::new(VolcEngineFactory::with_signer(signer)));
}
