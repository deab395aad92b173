// # HTTPS DoH Transport
//
// reqwest implementation of the core `DohTransport` trait (RFC 8484 GET).
//
// ## Exchange
//
// ```text
// GET {endpoint}?dns={base64url(query), unpadded}
// Content-Type: application/dns-message
// Accept: application/dns-message
// ```
//
// One request per call. Connections are pooled per host and kept alive so
// repeated queries to the same provider skip the TLS handshake.
//
// ## Address families
//
// A transport can be pinned to IPv4 or IPv6 by binding its sockets to the
// unspecified address of that family. Unpinned transports let the OS pick.

use doh_ddns_core::traits::{AddressFamily, DohTransport};
use doh_ddns_core::wire::DNS_MESSAGE_MEDIA_TYPE;
use doh_ddns_core::{Error, Result};

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Connect timeout (TCP and TLS handshake)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Timeout for the whole exchange
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle connections kept per host
pub const POOL_MAX_IDLE_PER_HOST: usize = 256;

/// TCP keepalive interval
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(60);

/// Transport settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Pin sockets to one address family (`None` = any)
    pub family: Option<AddressFamily>,
    /// Connect timeout (TCP and TLS handshake)
    pub connect_timeout: Duration,
    /// Timeout for the whole exchange
    pub request_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            family: None,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl TransportOptions {
    /// Default options pinned to `family`
    pub fn pinned(family: AddressFamily) -> Self {
        Self {
            family: Some(family),
            ..Self::default()
        }
    }
}

/// A reqwest client builder with the shared pool and timeout settings
///
/// Also used by the address discovery client so both HTTP paths behave
/// the same way.
pub fn client_builder(options: &TransportOptions) -> reqwest::ClientBuilder {
    let builder = reqwest::Client::builder()
        .user_agent(concat!("doh-ddns/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(options.connect_timeout)
        .timeout(options.request_timeout)
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .tcp_keepalive(TCP_KEEPALIVE);

    match options.family {
        Some(AddressFamily::V4) => builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        Some(AddressFamily::V6) => builder.local_address(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        None => builder,
    }
}

/// RFC 8484 transport over HTTPS
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    client: reqwest::Client,
    family: Option<AddressFamily>,
}

impl HttpsTransport {
    /// Create a transport with the default settings
    pub fn new() -> Result<Self> {
        Self::with_options(TransportOptions::default())
    }

    /// Create a transport pinned to `family`
    pub fn pinned(family: AddressFamily) -> Result<Self> {
        Self::with_options(TransportOptions::pinned(family))
    }

    /// Create a transport with explicit settings
    pub fn with_options(options: TransportOptions) -> Result<Self> {
        let client = client_builder(&options)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTPS client: {}", e)))?;

        Ok(Self {
            client,
            family: options.family,
        })
    }

    /// Address family this transport is pinned to, if any
    pub fn family(&self) -> Option<AddressFamily> {
        self.family
    }
}

#[async_trait::async_trait]
impl DohTransport for HttpsTransport {
    async fn get(&self, endpoint: &Url, message: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(endpoint.clone())
            .query(&[("dns", message)])
            .header(CONTENT_TYPE, DNS_MESSAGE_MEDIA_TYPE)
            .header(ACCEPT, DNS_MESSAGE_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| Error::transport(endpoint.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(
                endpoint.as_str(),
                format!("HTTP status {}", status),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(DNS_MESSAGE_MEDIA_TYPE) {
            warn!(
                "{} answered with content type {:?}, expected {}",
                endpoint, content_type, DNS_MESSAGE_MEDIA_TYPE
            );
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(endpoint.as_str(), e))?;

        debug!("{} returned {} bytes ({})", endpoint, body.len(), status);
        Ok(body.to_vec())
    }
}
