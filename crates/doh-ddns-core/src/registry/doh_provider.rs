//! Public DoH resolvers known by name

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A DoH provider
///
/// Every named variant is bound to one fixed HTTPS endpoint. `Custom`
/// has none; the caller supplies the endpoint.
///
/// Names are case-sensitive: `"google"` parses, `"Google"` does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum DohProvider {
    Custom,
    Cloudflare,
    Google,
    Quad9,
    Wikimedia,
    JoinDns4Eu,
}

impl DohProvider {
    /// Every provider, `Custom` first
    pub const ALL: [DohProvider; 6] = [
        DohProvider::Custom,
        DohProvider::Cloudflare,
        DohProvider::Google,
        DohProvider::Quad9,
        DohProvider::Wikimedia,
        DohProvider::JoinDns4Eu,
    ];

    /// Configuration name of this provider
    pub fn as_str(self) -> &'static str {
        match self {
            DohProvider::Custom => "custom",
            DohProvider::Cloudflare => "cloudflare",
            DohProvider::Google => "google",
            DohProvider::Quad9 => "quad9",
            DohProvider::Wikimedia => "wikimedia",
            DohProvider::JoinDns4Eu => "joindns4eu",
        }
    }

    /// Fixed endpoint, `None` for `Custom`
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            DohProvider::Custom => None,
            DohProvider::Cloudflare => Some("https://cloudflare-dns.com/dns-query"),
            DohProvider::Google => Some("https://dns.google/dns-query"),
            DohProvider::Quad9 => Some("https://dns.quad9.net/dns-query"),
            DohProvider::Wikimedia => Some("https://wikimedia-dns.org/dns-query"),
            DohProvider::JoinDns4Eu => Some("https://unfiltered.joindns4.eu/dns-query"),
        }
    }
}

impl fmt::Display for DohProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DohProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

impl TryFrom<String> for DohProvider {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DohProvider> for &'static str {
    fn from(provider: DohProvider) -> Self {
        provider.as_str()
    }
}

/// Endpoint of the provider called `name`
///
/// - a named provider → `Some(endpoint)`
/// - `"custom"` → `None`; the caller must supply the endpoint
/// - anything else → [`Error::UnknownProvider`]
pub fn resolve_endpoint(name: &str) -> Result<Option<&'static str>> {
    Ok(name.parse::<DohProvider>()?.endpoint())
}
