//! Kingsoft Cloud (ksyun) adapter for cloudbridge
//!
//! Covers regions, availability zones and KEC instances. Listings use the
//! numeric `Marker` offset and stop at the reported `InstanceCount`.
//!
//! Accounts may restrict listings to projects with the `project_ids`
//! option:
//!
//! ```yaml
//! accounts:
//!   - vendor: ksyun
//!     account: AKLT...
//!     secret: ...
//!     options:
//!       project_ids: ["100", "200"]
//! ```
//!
//! Request signing is left to the caller: pass a [`RequestSigner`] to
//! [`register_with_signer`] or [`KsyunProvider::new`]. Each call is signed
//! with its region and the `kec` or `ebs` service name.

pub mod client;
pub mod error;
pub mod instance;
pub mod provider;
pub mod region;
pub mod zone;

#[cfg(test)]
mod testing;

pub use client::{KsyunClient, Service};
pub use error::{KsyunError, Result};
pub use provider::{KsyunFactory, KsyunProvider};

use cloudbridge::RequestSigner;
use std::sync::{Arc, OnceLock};

pub const PROVIDER_ID: &str = "ksyun";

static REGISTERED: OnceLock<()> = OnceLock::new();

/// Add an unsigned Kingsoft Cloud factory to the cloudbridge registry,
/// unless one is already registered
pub fn register() {
    REGISTERED.get_or_init(|| {
        if !cloudbridge::is_supported(PROVIDER_ID) {
            cloudbridge::register_factory(Arc::new(KsyunFactory::default()));
        }
    });
}

/// Register (or replace) the factory with one that signs through `signer`
pub fn register_with_signer(signer: Arc<dyn RequestSigner>) {
    cloudbridge::register_factory(Arc::new(KsyunFactory::with_signer(signer)));
}
