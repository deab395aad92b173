// # doh-ddns-core
//
// Core library for keeping a DNS record in sync with the host's public
// address, reading the published state over DNS-over-HTTPS.
//
// ## Architecture Overview
//
// - **wire**: RFC 1035 message codec (query encoder, answer decoder)
// - **DohClient**: RFC 8484 query entry point over an injected `DohTransport`
// - **DohProvider**: Named public resolvers bound to fixed endpoints
// - **reconcile**: Converges one record through a `ZoneBackend` with at most one write
// - **BackendRegistry**: Plugin-based registry for zone backends
//
// ## Design Principles
//
// 1. **Capabilities are injected**: transport, backend and address source are traits
// 2. **No hidden work**: no retries, no background tasks, one write per update
// 3. **Library-First**: the daemon is a thin shell over this crate

pub mod config;
pub mod doh;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod traits;
pub mod wire;

// Re-export core types for convenience
pub use config::{BackendConfig, DdnsConfig, DiscoveryConfig, DohConfig, RecordConfig};
pub use doh::DohClient;
pub use error::{Error, Result};
pub use reconcile::{plan_update, update, UpdateOutcome, UpdatePlan};
pub use registry::{resolve_endpoint, BackendKind, BackendRegistry, DohProvider};
pub use traits::{AddressFamily, AddressSource, DohTransport, ZoneBackend, ZoneRecord};
pub use wire::RecordType;
