//! Capability traits for doh-ddns
//!
//! This module defines the abstract interfaces the core consumes.
//!
//! - [`ZoneBackend`]: Read and write records through a provider API
//! - [`DohTransport`]: Carry an encoded DNS query to a DoH endpoint
//! - [`AddressSource`]: Discover the host's current public address

pub mod address_source;
pub mod doh_transport;
pub mod zone_backend;

pub use address_source::{AddressFamily, AddressSource};
pub use doh_transport::DohTransport;
pub use zone_backend::{relative_name, ZoneBackend, ZoneBackendFactory, ZoneRecord};
