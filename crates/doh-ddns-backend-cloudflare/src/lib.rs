// # Cloudflare Zone Backend
//
// Cloudflare API v4 implementation of the core `ZoneBackend` trait.
//
// ## Behaviour
//
// - One HTTP request per logical step; no retries, no backoff, no caching
// - Errors carry the HTTP status class so callers can tell auth problems
//   from rate limits and transient (5xx) failures, which are retryable
// - Dry-run mode performs every read and logs the writes it would make
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Backend creation fails fast if the token is empty
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use doh_ddns_core::config::BackendConfig;
use doh_ddns_core::registry::{BackendKind, BackendRegistry};
use doh_ddns_core::traits::{relative_name, ZoneBackend, ZoneBackendFactory, ZoneRecord};
use doh_ddns_core::wire::RecordType;
use doh_ddns_core::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for record listings; large enough for a single page per zone
const RECORDS_PER_PAGE: u32 = 5000;

/// TTL value meaning "automatic"
const AUTOMATIC_TTL: u32 = 1;

/// Cloudflare API response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
}

/// A DNS record as returned by the API
#[derive(Debug, Clone, Deserialize)]
struct ApiRecord {
    id: String,
    #[serde(rename = "type")]
    record_type: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: u32,
}

impl ApiRecord {
    /// Convert to a zone record relative to `zone`; `None` for unsupported types
    fn to_zone_record(&self, zone: &str) -> Option<ZoneRecord> {
        let record_type = self.record_type.parse::<RecordType>().ok()?;
        let record = ZoneRecord::new(relative_name(&self.name, zone), record_type, &self.content);
        Some(match self.ttl {
            0 | AUTOMATIC_TTL => record,
            ttl => record.with_ttl(ttl),
        })
    }

    fn matches(&self, zone: &str, record: &ZoneRecord) -> bool {
        self.record_type.eq_ignore_ascii_case(record.record_type.as_str())
            && self
                .name
                .trim_end_matches('.')
                .eq_ignore_ascii_case(&record.fqdn(zone))
    }
}

/// Cloudflare zone backend
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the backend will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/PUT/DELETE requests
/// - **NOT** actually modify DNS records
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct CloudflareBackend {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID (optional, looked up from the zone name otherwise)
    zone_id: Option<String>,

    /// API base URL (overridable for tests)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform reads but skip writes
    dry_run: bool,
}

impl std::fmt::Debug for CloudflareBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareBackend")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareBackend {
    /// Create a new Cloudflare backend
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Optional zone ID (looked up by zone name otherwise)
    /// - `dry_run`: If true, perform reads but skip writes
    pub fn new(api_token: impl Into<String>, zone_id: Option<String>, dry_run: bool) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Use another API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send an authenticated request and decode the `result` field
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status.as_u16(), what, &error_text));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("Failed to parse response: {}", e)))?;

        match envelope.result {
            Some(result) => Ok(result),
            None => Err(Error::provider(
                "cloudflare",
                format!("{} returned no result: {}", what, describe(&envelope.errors)),
            )),
        }
    }

    /// Resolve the zone ID for `zone`
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn zone_id(&self, zone: &str) -> Result<String> {
        if let Some(ref zone_id) = self.zone_id {
            tracing::debug!("Using pre-configured zone ID");
            return Ok(zone_id.clone());
        }

        let zone = zone.trim_end_matches('.');
        tracing::debug!("Looking up zone ID for {}", zone);

        let request = self
            .client
            .get(format!("{}/zones", self.api_base))
            .query(&[("name", zone)]);
        let zones: Vec<Zone> = self.call(request, "zone lookup").await?;

        let zone_id = zones
            .into_iter()
            .next()
            .map(|z| z.id)
            .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone)))?;

        tracing::debug!("Found zone ID: {}", zone_id);
        Ok(zone_id)
    }

    /// All records of a zone
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?per_page=5000
    /// ```
    async fn list(&self, zone_id: &str) -> Result<Vec<ApiRecord>> {
        let request = self
            .client
            .get(format!("{}/zones/{}/dns_records", self.api_base, zone_id))
            .query(&[("per_page", RECORDS_PER_PAGE)]);
        self.call(request, "record listing").await
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    async fn delete(&self, zone_id: &str, record: &ApiRecord) -> Result<()> {
        let url = format!("{}/{}", self.records_url(zone_id), record.id);
        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        let _: serde_json::Value = self.call(self.client.delete(&url), "record delete").await?;
        tracing::info!("Deleted {} {} ({})", record.name, record.record_type, record.content);
        Ok(())
    }

    async fn write(
        &self,
        zone: &str,
        zone_id: &str,
        existing: Option<&ApiRecord>,
        record: &ZoneRecord,
    ) -> Result<ZoneRecord> {
        let payload = json!({
            "type": record.record_type.as_str(),
            "name": record.fqdn(zone),
            "content": record.value,
            "ttl": record.ttl_secs.unwrap_or(AUTOMATIC_TTL),
        });

        let (request, url) = match existing {
            Some(old) => {
                let url = format!("{}/{}", self.records_url(zone_id), old.id);
                (self.client.put(&url), url)
            }
            None => {
                let url = self.records_url(zone_id);
                (self.client.post(&url), url)
            }
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send {} request to {} with payload: {}",
                if existing.is_some() { "PUT" } else { "POST" },
                url,
                payload
            );
            return Ok(record.clone());
        }

        let written: ApiRecord = self.call(request.json(&payload), "record write").await?;
        Ok(written.to_zone_record(zone).unwrap_or_else(|| record.clone()))
    }
}

/// Map a non-success HTTP status to an error
fn status_error(status: u16, what: &str, body: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions (HTTP {})",
            what, status
        )),
        404 => Error::not_found(format!("{}: HTTP 404", what)),
        429 => Error::rate_limited(format!("{}: rate limit exceeded (HTTP 429)", what)),
        500..=599 => Error::http(format!(
            "{}: server error (transient): {} - {}",
            what, status, body
        )),
        _ => Error::provider("cloudflare", format!("{} failed: {} - {}", what, status, body)),
    }
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl ZoneBackend for CloudflareBackend {
    async fn get_records(&self, zone: &str) -> Result<Vec<ZoneRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let records = self.list(&zone_id).await?;

        Ok(records
            .iter()
            .filter_map(|r| r.to_zone_record(zone))
            .collect())
    }

    /// Create or replace records
    ///
    /// For every input record the first existing record of the same name
    /// and type is updated in place (PUT) and any further duplicates are
    /// deleted; without an existing record a new one is created (POST).
    async fn set_records(&self, zone: &str, records: &[ZoneRecord]) -> Result<Vec<ZoneRecord>> {
        tracing::info!(
            "Setting {} record(s) in {} [mode: {}]",
            records.len(),
            zone,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let zone_id = self.zone_id(zone).await?;
        let existing = self.list(&zone_id).await?;

        let mut written = Vec::with_capacity(records.len());
        for record in records {
            let mut matching = existing.iter().filter(|r| r.matches(zone, record));
            let first = matching.next();

            written.push(self.write(zone, &zone_id, first, record).await?);
            for duplicate in matching {
                self.delete(&zone_id, duplicate).await?;
            }
        }

        Ok(written)
    }

    async fn delete_records(&self, zone: &str, records: &[ZoneRecord]) -> Result<Vec<ZoneRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let existing = self.list(&zone_id).await?;

        let mut deleted = Vec::new();
        for record in records {
            for old in existing.iter().filter(|r| r.matches(zone, record)) {
                let Some(old_record) = old.to_zone_record(zone) else {
                    continue;
                };
                if !record.value.is_empty() && !old_record.same_value(record) {
                    continue;
                }
                self.delete(&zone_id, old).await?;
                deleted.push(old_record);
            }
        }

        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Factory for creating Cloudflare backends
pub struct CloudflareFactory;

impl ZoneBackendFactory for CloudflareFactory {
    fn create(&self, config: &BackendConfig) -> Result<Box<dyn ZoneBackend>> {
        match config {
            BackendConfig::Cloudflare { api_token, zone_id } => {
                // Check for dry-run mode environment variable
                let dry_run = std::env::var("DDNS_MODE")
                    .unwrap_or_default()
                    .eq_ignore_ascii_case("dry-run");

                if dry_run {
                    tracing::warn!("Cloudflare backend running in DRY-RUN mode - no changes will be made");
                }

                Ok(Box::new(CloudflareBackend::new(
                    api_token.clone(),
                    zone_id.clone(),
                    dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Cloudflare backend")),
        }
    }
}

/// Register the Cloudflare backend with a registry
///
/// # Example
///
/// ```rust
/// use doh_ddns_core::registry::{BackendKind, BackendRegistry};
///
/// let mut registry = BackendRegistry::new();
/// doh_ddns_backend_cloudflare::register(&mut registry);
/// assert!(registry.has_backend(BackendKind::Cloudflare));
/// ```
pub fn register(registry: &mut BackendRegistry) {
    registry.register_backend(BackendKind::Cloudflare, Box::new(CloudflareFactory));
}
