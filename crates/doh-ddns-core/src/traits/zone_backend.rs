// # Zone Backend Trait
//
// Defines the capability through which the reconciler reads and writes
// the records of a zone.
//
// ## Implementations
//
// - Cloudflare: `doh-ddns-backend-cloudflare` crate
// - Future: prepaid-hoster, other libdns-style APIs
//
// ## Usage
//
// ```rust,ignore
// use doh_ddns_core::{reconcile, ZoneRecord, RecordType};
//
// let backend = /* ZoneBackend implementation */;
// let desired = ZoneRecord::new("www", RecordType::A, "192.0.2.1");
// reconcile::update("example.com", &desired, &backend).await?;
// ```

use crate::wire::RecordType;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A record as the backend understands it
///
/// `name` is relative to the zone it lives in: empty (or `@`) for the
/// apex, `www` for `www.<zone>`. An absolute name (trailing dot) is taken
/// as-is. Backends build names with [`relative_name`], which falls back to
/// the absolute form whenever the relative one could be read differently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    /// Name relative to the zone
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Presentation-form value ("192.0.2.1", "target.example.", "v=spf1 -all")
    pub value: String,
    /// Time-to-live; `None` leaves the backend default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u32>,
}

impl ZoneRecord {
    /// Create a record without an explicit TTL
    pub fn new(name: impl Into<String>, record_type: RecordType, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type,
            value: value.into(),
            ttl_secs: None,
        }
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl_secs: u32) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    /// Fully-qualified name of this record inside `zone`, without trailing dot
    ///
    /// - empty or `@` → the zone itself
    /// - absolute (trailing dot) → unchanged
    /// - already ending in the zone → unchanged, so callers may write
    ///   `www.example.com` as well as `www`
    /// - otherwise → `name + "." + zone`
    pub fn fqdn(&self, zone: &str) -> String {
        let zone = zone.trim_end_matches('.');
        let name = self.name.as_str();

        if name.is_empty() || name == "@" {
            return zone.to_string();
        }
        if let Some(absolute) = name.strip_suffix('.') {
            return absolute.to_string();
        }
        if name.eq_ignore_ascii_case(zone) || ends_with_label(name, zone) {
            return name.to_string();
        }
        format!("{name}.{zone}")
    }

    /// Whether `self` and `other` carry the same value for this record type
    ///
    /// Addresses compare by parsed value, names case-insensitively and
    /// regardless of the trailing dot, everything else byte for byte.
    pub fn same_value(&self, other: &ZoneRecord) -> bool {
        match self.record_type {
            RecordType::A | RecordType::Aaaa => {
                match (self.value.parse::<IpAddr>(), other.value.parse::<IpAddr>()) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => self.value == other.value,
                }
            }
            RecordType::Cname => self
                .value
                .trim_end_matches('.')
                .eq_ignore_ascii_case(other.value.trim_end_matches('.')),
            RecordType::Txt => self.value == other.value,
        }
    }
}

/// Name of `fqdn` relative to `zone` ("" for the apex)
///
/// Used by backends whose API speaks fully-qualified names. The result
/// always maps back to `fqdn` through [`ZoneRecord::fqdn`]: names outside
/// the zone, and names whose relative part would itself look qualified
/// (`www.example.com.example.com`) or like the apex, come back absolute.
pub fn relative_name(fqdn: &str, zone: &str) -> String {
    let fqdn = fqdn.trim_end_matches('.');
    let zone = zone.trim_end_matches('.');
    if fqdn.eq_ignore_ascii_case(zone) {
        return String::new();
    }
    if ends_with_label(fqdn, zone) {
        let relative = &fqdn[..fqdn.len() - zone.len() - 1];
        let ambiguous = relative == "@"
            || relative.eq_ignore_ascii_case(zone)
            || ends_with_label(relative, zone);
        if !ambiguous {
            return relative.to_string();
        }
    }
    format!("{fqdn}.")
}

fn ends_with_label(name: &str, zone: &str) -> bool {
    name.len() > zone.len() + 1
        && name.as_bytes()[name.len() - zone.len() - 1] == b'.'
        && name[name.len() - zone.len()..].eq_ignore_ascii_case(zone)
}

/// Trait for zone backend implementations
///
/// Three operations, modelled on the libdns record interfaces: read every
/// record of a zone, set records (replacing records of the same name and
/// type), and delete records.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Translate between the API's record shape and [`ZoneRecord`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (callers re-invoke on failure)
/// - ❌ Decide whether an update is needed (owned by `reconcile`)
/// - ❌ Cache records between calls
/// - ❌ Spawn tasks or threads
#[async_trait]
pub trait ZoneBackend: Send + Sync {
    /// All records of `zone`, in backend order
    async fn get_records(&self, zone: &str) -> Result<Vec<ZoneRecord>, crate::Error>;

    /// Create or replace `records` in `zone`
    ///
    /// Existing records with the same name and type as an input record are
    /// replaced by it. Returns the records as written.
    async fn set_records(
        &self,
        zone: &str,
        records: &[ZoneRecord],
    ) -> Result<Vec<ZoneRecord>, crate::Error>;

    /// Delete `records` from `zone`
    ///
    /// A record matches by name and type, and by value unless the input
    /// value is empty. Returns the records that were deleted.
    async fn delete_records(
        &self,
        zone: &str,
        records: &[ZoneRecord],
    ) -> Result<Vec<ZoneRecord>, crate::Error>;

    /// Backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}

/// Helper trait for constructing zone backends from configuration
pub trait ZoneBackendFactory: Send + Sync {
    /// Create a ZoneBackend instance from configuration
    fn create(
        &self,
        config: &crate::config::BackendConfig,
    ) -> Result<Box<dyn ZoneBackend>, crate::Error>;
}
