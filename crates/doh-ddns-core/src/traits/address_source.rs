// # Address Source Trait
//
// Defines the interface for discovering the host's current public address.
//
// ## Implementations
//
// - Plain-text HTTPS services: `doh-ddns-ip-http` crate

use crate::wire::RecordType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Address family to discover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family published by an address record type, `None` for CNAME/TXT
    pub fn for_record_type(record_type: RecordType) -> Option<Self> {
        match record_type {
            RecordType::A => Some(AddressFamily::V4),
            RecordType::Aaaa => Some(AddressFamily::V6),
            RecordType::Cname | RecordType::Txt => None,
        }
    }

    /// Whether `addr` belongs to this family
    pub fn matches(self, addr: &IpAddr) -> bool {
        match self {
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Trait for address discovery implementations
///
/// # Trust Level: Semi-Trusted
///
/// Sources perform network I/O to learn the address but never touch DNS
/// records and never decide whether an update is needed.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Current public address of the requested family
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: an address of `family`
    /// - `Err(Error)`: if the address cannot be determined
    async fn current(&self, family: AddressFamily) -> Result<IpAddr, crate::Error>;

    /// Source name (for logging/debugging)
    fn source_name(&self) -> &str;
}
