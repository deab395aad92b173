//! Provider registries
//!
//! Two distinct families of providers live here and are never mixed:
//!
//! - [`DohProvider`]: public DoH resolvers, each bound to a fixed endpoint
//! - [`BackendKind`]: zone backends that can write records, created through
//!   factories registered in a [`BackendRegistry`]
//!
//! ## Registration
//!
//! Backend crates register themselves during initialization:
//!
//! ```rust,ignore
//! # use doh_ddns_core::registry::{BackendKind, BackendRegistry};
//! // In doh-ddns-backend-cloudflare crate
//! pub fn register(registry: &mut BackendRegistry) {
//!     registry.register_backend(BackendKind::Cloudflare, Box::new(CloudflareFactory));
//! }
//! ```

mod doh_provider;

pub use doh_provider::{resolve_endpoint, DohProvider};

use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::traits::{ZoneBackend, ZoneBackendFactory};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A zone backend able to write records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Cloudflare API v4
    Cloudflare,
    /// prepaid-hoster.de
    #[serde(rename = "prepaidhoster")]
    PrepaidHoster,
}

impl BackendKind {
    /// Every backend kind
    pub const ALL: [BackendKind; 2] = [BackendKind::Cloudflare, BackendKind::PrepaidHoster];

    /// Configuration name of this backend
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Cloudflare => "cloudflare",
            BackendKind::PrepaidHoster => "prepaidhoster",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

/// Registry of zone backend factories
///
/// Maps a [`BackendKind`] to the factory that builds it, so the daemon
/// picks a backend from configuration without a hardcoded match.
#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Box<dyn ZoneBackendFactory>>,
}

impl BackendRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory, replacing any previous one for `kind`
    pub fn register_backend(&mut self, kind: BackendKind, factory: Box<dyn ZoneBackendFactory>) {
        self.backends.insert(kind, factory);
    }

    /// Create a zone backend from configuration
    ///
    /// Fails with [`Error::Config`] if no factory is registered for the
    /// configured kind (e.g. the crate was built without that backend).
    pub fn create_backend(&self, config: &BackendConfig) -> Result<Box<dyn ZoneBackend>> {
        let kind = config.kind();
        let factory = self.backends.get(&kind).ok_or_else(|| {
            Error::config(format!("backend {kind} is not available in this build"))
        })?;

        factory.create(config)
    }

    /// Registered backend kinds, in declaration order
    pub fn list_backends(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|k| self.backends.contains_key(k))
            .collect()
    }

    /// Check if a backend kind is registered
    pub fn has_backend(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }
}
