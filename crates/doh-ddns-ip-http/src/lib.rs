// # HTTP Address Source
//
// Discovers the host's public address from a service that answers a plain
// GET with the caller's address as text (e.g. `https://myip.wtf/text`).
//
// ## Architecture
//
// Two HTTP clients are kept, one bound to IPv4 and one bound to IPv6, so
// the family of the discovered address follows the family of the socket
// that asked. Pool and timeout settings are shared with the DoH transport.

use doh_ddns_core::config::DiscoveryConfig;
use doh_ddns_core::traits::{AddressFamily, AddressSource};
use doh_ddns_core::{Error, Result};
use doh_ddns_transport::{client_builder, TransportOptions};

use std::net::IpAddr;
use tracing::debug;
use url::Url;

/// Address discovery over plain-text HTTP(S)
#[derive(Debug, Clone)]
pub struct AddressTxtClient {
    /// Service URL
    endpoint: Url,

    /// Client bound to 0.0.0.0
    v4: reqwest::Client,

    /// Client bound to ::
    v6: reqwest::Client,
}

impl AddressTxtClient {
    /// Create a client for `endpoint`
    pub fn new(endpoint: &str) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(Error::config("discovery endpoint cannot be empty"));
        }
        let endpoint = Url::parse(endpoint).map_err(|e| {
            Error::config(format!("invalid discovery endpoint {:?}: {}", endpoint, e))
        })?;

        Ok(Self {
            endpoint,
            v4: build_client(AddressFamily::V4)?,
            v6: build_client(AddressFamily::V6)?,
        })
    }

    /// Create a client from the discovery section of the configuration
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::new(&config.discovery_url)
    }

    /// Service URL
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn fetch(&self, family: AddressFamily) -> Result<String> {
        let client = match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        };

        let response = client
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| Error::discovery(format!("{} request failed: {}", family, e)))?;

        if !response.status().is_success() {
            return Err(Error::discovery(format!(
                "{} answered with HTTP {}",
                self.endpoint,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::discovery(format!("failed to read response: {}", e)))
    }
}

fn build_client(family: AddressFamily) -> Result<reqwest::Client> {
    client_builder(&TransportOptions::pinned(family))
        .build()
        .map_err(|e| Error::config(format!("failed to build {} HTTP client: {}", family, e)))
}

/// Parse the body of a discovery response as an address of `family`
pub fn parse_address(body: &str, family: AddressFamily) -> Result<IpAddr> {
    let text = body.trim();
    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::discovery(format!("invalid IP address: {:?}", text)))?;

    if !family.matches(&ip) {
        return Err(Error::discovery(format!("expected {}, got {}", family, ip)));
    }
    Ok(ip)
}

#[async_trait::async_trait]
impl AddressSource for AddressTxtClient {
    async fn current(&self, family: AddressFamily) -> Result<IpAddr> {
        let body = self.fetch(family).await?;
        let ip = parse_address(&body, family)?;
        debug!("Discovered {} address {} via {}", family, ip, self.endpoint);
        Ok(ip)
    }

    fn source_name(&self) -> &str {
        self.endpoint.as_str()
    }
}
