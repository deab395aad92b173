//! Configuration types for doh-ddns
//!
//! The on-disk form is a flat JSON object:
//!
//! ```json
//! {
//!   "zone": "example.com",
//!   "record_name": "home",
//!   "record_type": "A",
//!   "record_ttl_seconds": 300,
//!   "doh_provider": "google",
//!   "dyndns_provider": "cloudflare",
//!   "dyndns_api_token": "..."
//! }
//! ```

use crate::error::{Error, Result};
use crate::registry::{BackendKind, DohProvider};
use crate::traits::ZoneRecord;
use crate::wire::{Name, RecordType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use url::Url;

/// Default service used to discover the public address
pub const DEFAULT_DISCOVERY_URL: &str = "https://myip.wtf/text";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Record to keep up to date
    #[serde(flatten)]
    pub record: RecordConfig,

    /// DoH resolver used to read the published value
    #[serde(flatten)]
    pub doh: DohConfig,

    /// Zone backend used to write the record
    #[serde(flatten)]
    pub backend: BackendConfig,

    /// Address discovery
    #[serde(flatten)]
    pub discovery: DiscoveryConfig,
}

impl DdnsConfig {
    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("reading config file {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.record.validate()?;
        self.doh.validate()?;
        self.backend.validate()?;
        self.discovery.validate()?;
        Ok(())
    }
}

/// The record to converge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Zone the record lives in (e.g. "example.com")
    pub zone: String,

    /// Name relative to the zone; empty for the apex
    #[serde(default)]
    pub record_name: String,

    /// Record type
    #[serde(default = "default_record_type")]
    pub record_type: RecordType,

    /// TTL to write; `None` keeps the backend default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_ttl_seconds: Option<u32>,
}

impl RecordConfig {
    /// Create a record configuration with the default type (A)
    pub fn new(zone: impl Into<String>, record_name: impl Into<String>) -> Self {
        Self {
            zone: zone.into(),
            record_name: record_name.into(),
            record_type: default_record_type(),
            record_ttl_seconds: None,
        }
    }

    /// Set the record type
    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl_secs: u32) -> Self {
        self.record_ttl_seconds = Some(ttl_secs);
        self
    }

    /// Fully-qualified name of the record
    pub fn fqdn(&self) -> String {
        self.desired(String::new()).fqdn(&self.zone)
    }

    /// The zone record to converge to, carrying `value`
    pub fn desired(&self, value: impl Into<String>) -> ZoneRecord {
        let record = ZoneRecord::new(self.record_name.clone(), self.record_type, value);
        match self.record_ttl_seconds {
            Some(ttl) => record.with_ttl(ttl),
            None => record,
        }
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<()> {
        if self.zone.trim_end_matches('.').is_empty() {
            return Err(Error::config("zone cannot be empty"));
        }
        Name::parse(&self.zone)?;
        Name::parse(&self.fqdn())?;
        if self.record_ttl_seconds == Some(0) {
            return Err(Error::config("record_ttl_seconds must be > 0"));
        }
        Ok(())
    }
}

fn default_record_type() -> RecordType {
    RecordType::A
}

/// DoH resolver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohConfig {
    /// Named provider, or `custom`
    #[serde(default = "default_doh_provider")]
    pub doh_provider: DohProvider,

    /// Endpoint for the `custom` provider; ignored otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doh_endpoint: Option<String>,
}

impl DohConfig {
    /// Validate the DoH configuration
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.doh_endpoint.as_deref().unwrap_or_default();
        match self.doh_provider {
            DohProvider::Custom if endpoint.is_empty() => Err(Error::config(
                "doh_endpoint is required when doh_provider is \"custom\"",
            )),
            DohProvider::Custom => Url::parse(endpoint).map(|_| ()).map_err(|e| {
                Error::config(format!("doh_endpoint {endpoint:?} is not a valid URL: {e}"))
            }),
            _ => Ok(()),
        }
    }
}

impl Default for DohConfig {
    fn default() -> Self {
        Self {
            doh_provider: default_doh_provider(),
            doh_endpoint: None,
        }
    }
}

fn default_doh_provider() -> DohProvider {
    DohProvider::Google
}

/// Zone backend configuration
///
/// The Debug implementation never prints the API token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "dyndns_provider", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// API token with Zone:DNS:Edit permission
        #[serde(rename = "dyndns_api_token")]
        api_token: String,
        /// Zone ID (optional, looked up from the zone name otherwise)
        #[serde(default, rename = "dyndns_zone_id", skip_serializing_if = "Option::is_none")]
        zone_id: Option<String>,
    },

    /// prepaid-hoster.de
    #[serde(rename = "prepaidhoster")]
    PrepaidHoster {
        /// API token
        #[serde(rename = "dyndns_api_token")]
        api_token: String,
    },
}

impl BackendConfig {
    /// Backend kind selected by this configuration
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Cloudflare { .. } => BackendKind::Cloudflare,
            BackendConfig::PrepaidHoster { .. } => BackendKind::PrepaidHoster,
        }
    }

    /// Validate the backend configuration
    pub fn validate(&self) -> Result<()> {
        let api_token = match self {
            BackendConfig::Cloudflare { api_token, .. } => api_token,
            BackendConfig::PrepaidHoster { api_token } => api_token,
        };
        if api_token.is_empty() {
            return Err(Error::config(format!(
                "{} API token cannot be empty",
                self.kind()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendConfig::Cloudflare { zone_id, .. } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .finish(),
            BackendConfig::PrepaidHoster { .. } => f
                .debug_struct("PrepaidHoster")
                .field("api_token", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Address discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Service answering with the caller's address as plain text
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
}

impl DiscoveryConfig {
    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.discovery_url).map_err(|e| {
            Error::config(format!(
                "discovery_url {:?} is not a valid URL: {}",
                self.discovery_url, e
            ))
        })?;
        match url.scheme() {
            "https" | "http" => Ok(()),
            other => Err(Error::config(format!(
                "discovery_url must use HTTP or HTTPS, got {other}"
            ))),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
        }
    }
}

fn default_discovery_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FLAT_JSON: &str = r#"{
        "zone": "example.com",
        "record_name": "home",
        "record_type": "AAAA",
        "record_ttl_seconds": 120,
        "doh_provider": "quad9",
        "dyndns_provider": "cloudflare",
        "dyndns_api_token": "secret-token-value"
    }"#;

    #[test]
    fn test_parse_flat_json() {
        let config: DdnsConfig = serde_json::from_str(FLAT_JSON).unwrap();

        assert_eq!(config.record.zone, "example.com");
        assert_eq!(config.record.record_type, RecordType::Aaaa);
        assert_eq!(config.record.record_ttl_seconds, Some(120));
        assert_eq!(config.record.fqdn(), "home.example.com");
        assert_eq!(config.doh.doh_provider, DohProvider::Quad9);
        assert_eq!(config.backend.kind(), BackendKind::Cloudflare);
        assert_eq!(config.discovery.discovery_url, DEFAULT_DISCOVERY_URL);
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: DdnsConfig = serde_json::from_str(
            r#"{"zone":"example.com","dyndns_provider":"cloudflare","dyndns_api_token":"t"}"#,
        )
        .unwrap();

        assert_eq!(config.record.record_name, "");
        assert_eq!(config.record.record_type, RecordType::A);
        assert_eq!(config.record.fqdn(), "example.com");
        assert_eq!(config.doh, DohConfig::default());
    }

    #[test]
    fn test_unknown_doh_provider_is_rejected() {
        let err = serde_json::from_str::<DdnsConfig>(
            r#"{"zone":"example.com","doh_provider":"not-a-real-provider",
                "dyndns_provider":"cloudflare","dyndns_api_token":"t"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not-a-real-provider"));
    }

    #[test]
    fn test_custom_provider_requires_endpoint() {
        let doh = DohConfig {
            doh_provider: DohProvider::Custom,
            doh_endpoint: None,
        };
        assert!(matches!(doh.validate(), Err(Error::Config(_))));

        let doh = DohConfig {
            doh_provider: DohProvider::Custom,
            doh_endpoint: Some("https://doh.example.net/dns-query".to_string()),
        };
        doh.validate().unwrap();
    }

    #[test]
    fn test_record_validation() {
        assert!(RecordConfig::new("", "www").validate().is_err());
        assert!(RecordConfig::new("example.com", "bad name").validate().is_err());
        assert!(RecordConfig::new("example.com", "www").with_ttl(0).validate().is_err());
        RecordConfig::new("example.com.", "www").validate().unwrap();
    }

    #[test]
    fn test_desired_record_carries_ttl() {
        let record = RecordConfig::new("example.com", "www")
            .with_record_type(RecordType::Txt)
            .with_ttl(60)
            .desired("hello");
        assert_eq!(record, ZoneRecord::new("www", RecordType::Txt, "hello").with_ttl(60));
    }

    #[test]
    fn test_empty_api_token_is_rejected() {
        let backend = BackendConfig::Cloudflare {
            api_token: String::new(),
            zone_id: None,
        };
        assert!(matches!(backend.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let config: DdnsConfig = serde_json::from_str(FLAT_JSON).unwrap();
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret-token-value"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FLAT_JSON.as_bytes()).unwrap();

        let config = DdnsConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.record.record_name, "home");

        let missing = DdnsConfig::from_json_file("/nonexistent/doh-ddns.json");
        assert!(matches!(missing, Err(Error::Config(_))));
    }
}
