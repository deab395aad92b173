// # doh-ddnsd - one-shot DoH-verified DDNS updater
//
// Thin integration layer: reads configuration, wires the capabilities
// together and runs a single reconciliation pass. Scheduling is left to
// cron or a systemd timer.
//
// 1. Load configuration (`DDNS_CONFIG_FILE` JSON, then `DDNS_*` overrides)
// 2. Discover the public address for the record's family
// 3. Ask a DoH resolver what is published; stop if it already matches
// 4. Reconcile the record through the configured zone backend
//
// ## Configuration
//
// ### Record
// - `DDNS_ZONE`: Zone (e.g. example.com)
// - `DDNS_RECORD_NAME`: Name relative to the zone (empty for the apex)
// - `DDNS_RECORD_TYPE`: A (default), AAAA, CNAME or TXT
// - `DDNS_RECORD_TTL`: TTL in seconds (optional)
// - `DDNS_RECORD_VALUE`: Fixed value; required for CNAME/TXT, skips discovery
//
// ### DoH
// - `DDNS_DOH_PROVIDER`: custom, cloudflare, google (default), quad9, wikimedia, joindns4eu
// - `DDNS_DOH_ENDPOINT`: Endpoint for the custom provider
//
// ### Backend
// - `DDNS_BACKEND`: cloudflare (default) or prepaidhoster
// - `DDNS_BACKEND_API_TOKEN`: API token
// - `DDNS_BACKEND_ZONE_ID`: Zone ID (optional)
// - `DDNS_MODE`: set to `dry-run` to log writes instead of sending them
//
// ### Other
// - `DDNS_DISCOVERY_URL`: Plain-text address service (default https://myip.wtf/text)
// - `DDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export DDNS_ZONE=example.com
// export DDNS_RECORD_NAME=home
// export DDNS_BACKEND_API_TOKEN=your_token
// doh-ddnsd
// ```

use anyhow::{Context, Result};
use doh_ddns_core::registry::BackendRegistry;
use doh_ddns_core::traits::{AddressFamily, AddressSource, ZoneRecord};
use doh_ddns_core::{DdnsConfig, DohClient, UpdateOutcome};
use doh_ddns_ip_http::AddressTxtClient;
use doh_ddns_transport::HttpsTransport;
use serde_json::{Map, Value};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Record is up to date (or was updated)
/// - 1: Configuration error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Environment variables mapped onto configuration file fields
const ENV_FIELDS: &[(&str, &str)] = &[
    ("DDNS_ZONE", "zone"),
    ("DDNS_RECORD_NAME", "record_name"),
    ("DDNS_DOH_PROVIDER", "doh_provider"),
    ("DDNS_DOH_ENDPOINT", "doh_endpoint"),
    ("DDNS_BACKEND", "dyndns_provider"),
    ("DDNS_BACKEND_API_TOKEN", "dyndns_api_token"),
    ("DDNS_BACKEND_ZONE_ID", "dyndns_zone_id"),
    ("DDNS_DISCOVERY_URL", "discovery_url"),
];

/// Everything a run needs
#[derive(Debug)]
struct Settings {
    config: DdnsConfig,
    /// Fixed record value; discovered when absent
    record_value: Option<String>,
    log_level: Level,
}

impl Settings {
    /// Load settings from the process environment
    fn from_env() -> Result<Self> {
        Self::load(|key| env::var(key).ok())
    }

    /// Load settings through `lookup` (an environment accessor)
    fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut fields = match lookup("DDNS_CONFIG_FILE").filter(|p| !p.is_empty()) {
            Some(path) => read_config_file(&path)?,
            None => Map::new(),
        };

        for &(var, field) in ENV_FIELDS {
            if let Some(value) = lookup(var) {
                fields.insert(field.to_string(), Value::String(value));
            }
        }
        if let Some(record_type) = lookup("DDNS_RECORD_TYPE") {
            fields.insert(
                "record_type".to_string(),
                Value::String(record_type.to_ascii_uppercase()),
            );
        }
        if let Some(ttl) = lookup("DDNS_RECORD_TTL") {
            let ttl: u32 = ttl
                .parse()
                .with_context(|| format!("DDNS_RECORD_TTL must be a number of seconds, got {ttl:?}"))?;
            fields.insert("record_ttl_seconds".to_string(), Value::from(ttl));
        }
        fields
            .entry("dyndns_provider")
            .or_insert_with(|| Value::String("cloudflare".to_string()));

        if !fields.contains_key("zone") {
            anyhow::bail!("DDNS_ZONE is required. Set it via: export DDNS_ZONE=example.com");
        }
        if !fields.contains_key("dyndns_api_token") {
            anyhow::bail!(
                "DDNS_BACKEND_API_TOKEN is required. \
                Set it via: export DDNS_BACKEND_API_TOKEN=your_token"
            );
        }

        let config: DdnsConfig =
            serde_json::from_value(Value::Object(fields)).context("invalid configuration")?;
        config.validate()?;

        let record_value = lookup("DDNS_RECORD_VALUE").filter(|v| !v.is_empty());
        let record_type = config.record.record_type;
        if record_value.is_none() && AddressFamily::for_record_type(record_type).is_none() {
            anyhow::bail!(
                "DDNS_RECORD_VALUE is required for {} records (only A and AAAA are discovered)",
                record_type
            );
        }

        let log_level = parse_log_level(&lookup("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()))?;

        Ok(Self {
            config,
            record_value,
            log_level,
        })
    }
}

fn read_config_file(path: &str) -> Result<Map<String, Value>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path))?;
    let value: Value =
        serde_json::from_str(&raw).with_context(|| format!("parsing config file {}", path))?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => anyhow::bail!("config file {} must contain a JSON object", path),
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Whether any published value already equals the desired record
fn already_published(desired: &ZoneRecord, published: &[String]) -> bool {
    published.iter().any(|value| {
        desired.same_value(&ZoneRecord::new(
            desired.name.clone(),
            desired.record_type,
            value.as_str(),
        ))
    })
}

/// Configuration mistakes surface as exit code 1 even when found late
fn exit_code_for(err: &anyhow::Error) -> DdnsExitCode {
    match err.downcast_ref::<doh_ddns_core::Error>() {
        Some(doh_ddns_core::Error::Config(_)) | Some(doh_ddns_core::Error::UnknownProvider(_)) => {
            DdnsExitCode::ConfigError
        }
        _ => DdnsExitCode::RuntimeError,
    }
}

fn main() -> ExitCode {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(settings).await {
            Ok(_) => DdnsExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Run one reconciliation pass
async fn run(settings: Settings) -> Result<UpdateOutcome> {
    let config = &settings.config;
    let record = &config.record;
    let fqdn = record.fqdn();
    let family = AddressFamily::for_record_type(record.record_type);

    info!(
        "Checking {} {} (DoH: {}, backend: {})",
        fqdn,
        record.record_type,
        config.doh.doh_provider,
        config.backend.kind()
    );

    // Step 1: desired value
    let value = match (&settings.record_value, family) {
        (Some(value), _) => value.clone(),
        (None, Some(family)) => {
            let source = AddressTxtClient::from_config(&config.discovery)?;
            let ip = source
                .current(family)
                .await
                .with_context(|| format!("discovering {} address", family))?;
            info!("Current {} address: {}", family, ip);
            ip.to_string()
        }
        (None, None) => anyhow::bail!("no value for {} record", record.record_type),
    };
    let desired = record.desired(value);

    // Step 2: published value
    let transport = match family {
        Some(family) => HttpsTransport::pinned(family)?,
        None => HttpsTransport::new()?,
    };
    let doh = DohClient::from_config(&config.doh, transport)?;
    match doh.query(&fqdn, record.record_type).await {
        Ok(published) if already_published(&desired, &published) => {
            info!("{} {} already resolves to {}", fqdn, record.record_type, desired.value);
            return Ok(UpdateOutcome::UpToDate);
        }
        Ok(published) => info!("{} currently resolves to {:?}", fqdn, published),
        Err(e) if e.is_no_data() => info!("{} has no {} record published", fqdn, record.record_type),
        Err(e) => warn!("DoH check failed, reconciling anyway: {}", e),
    }

    // Step 3: reconcile
    let mut registry = BackendRegistry::new();
    #[cfg(feature = "cloudflare")]
    doh_ddns_backend_cloudflare::register(&mut registry);

    let backend = registry.create_backend(&config.backend)?;
    let outcome = doh_ddns_core::update(&record.zone, &desired, backend.as_ref()).await?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use doh_ddns_core::RecordType;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_minimal_env() {
        let settings = Settings::load(lookup(&[
            ("DDNS_ZONE", "example.com"),
            ("DDNS_RECORD_NAME", "home"),
            ("DDNS_BACKEND_API_TOKEN", "token-value"),
        ]))
        .unwrap();

        let config = &settings.config;
        assert_eq!(config.record.fqdn(), "home.example.com");
        assert_eq!(config.record.record_type, RecordType::A);
        assert_eq!(config.doh.doh_provider.as_str(), "google");
        assert_eq!(config.backend.kind().as_str(), "cloudflare");
        assert_eq!(settings.record_value, None);
        assert_eq!(settings.log_level, Level::INFO);
    }

    #[test]
    fn test_missing_zone_is_rejected() {
        let err = Settings::load(lookup(&[("DDNS_BACKEND_API_TOKEN", "token-value")])).unwrap_err();
        assert!(err.to_string().contains("DDNS_ZONE"));
    }

    #[test]
    fn test_unknown_doh_provider_is_rejected() {
        let err = Settings::load(lookup(&[
            ("DDNS_ZONE", "example.com"),
            ("DDNS_BACKEND_API_TOKEN", "token-value"),
            ("DDNS_DOH_PROVIDER", "not-a-real-provider"),
        ]))
        .unwrap_err();
        assert!(format!("{:#}", err).contains("not-a-real-provider"));
    }

    #[test]
    fn test_txt_record_requires_value() {
        let vars = [
            ("DDNS_ZONE", "example.com"),
            ("DDNS_BACKEND_API_TOKEN", "token-value"),
            ("DDNS_RECORD_TYPE", "txt"),
        ];
        assert!(Settings::load(lookup(&vars)).is_err());

        let mut with_value = vars.to_vec();
        with_value.push(("DDNS_RECORD_VALUE", "hello"));
        let settings = Settings::load(lookup(&with_value)).unwrap();
        assert_eq!(settings.config.record.record_type, RecordType::Txt);
        assert_eq!(settings.record_value.as_deref(), Some("hello"));
    }

    #[test]
    fn test_env_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"zone":"example.com","record_name":"home","record_type":"AAAA",
                "doh_provider":"quad9","dyndns_provider":"cloudflare","dyndns_api_token":"from-file"}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let settings = Settings::load(lookup(&[
            ("DDNS_CONFIG_FILE", path.as_str()),
            ("DDNS_RECORD_NAME", "office"),
            ("DDNS_RECORD_TTL", "120"),
            ("DDNS_LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        let record = &settings.config.record;
        assert_eq!(record.fqdn(), "office.example.com");
        assert_eq!(record.record_type, RecordType::Aaaa);
        assert_eq!(record.record_ttl_seconds, Some(120));
        assert_eq!(settings.config.doh.doh_provider.as_str(), "quad9");
        assert_eq!(settings.log_level, Level::DEBUG);
    }

    #[test]
    fn test_invalid_ttl_and_log_level() {
        let base = [
            ("DDNS_ZONE", "example.com"),
            ("DDNS_BACKEND_API_TOKEN", "token-value"),
        ];

        let mut ttl = base.to_vec();
        ttl.push(("DDNS_RECORD_TTL", "soon"));
        assert!(Settings::load(lookup(&ttl)).is_err());

        let mut level = base.to_vec();
        level.push(("DDNS_LOG_LEVEL", "loud"));
        assert!(Settings::load(lookup(&level)).is_err());
    }

    #[test]
    fn test_already_published() {
        let desired = ZoneRecord::new("home", RecordType::Aaaa, "2001:db8::1");
        assert!(already_published(
            &desired,
            &["2001:db8::2".to_string(), "2001:DB8:0::1".to_string()]
        ));
        assert!(!already_published(&desired, &["2001:db8::2".to_string()]));
        assert!(!already_published(&desired, &[]));
    }

    #[test]
    fn test_exit_code_classification() {
        let config_err = anyhow::Error::new(doh_ddns_core::Error::config("no backend"));
        let runtime_err = anyhow::Error::new(doh_ddns_core::Error::http("reset"));
        let other = anyhow::anyhow!("boom");

        assert_eq!(exit_code_for(&config_err), DdnsExitCode::ConfigError);
        assert_eq!(exit_code_for(&runtime_err), DdnsExitCode::RuntimeError);
        assert_eq!(exit_code_for(&other), DdnsExitCode::RuntimeError);
    }
}
