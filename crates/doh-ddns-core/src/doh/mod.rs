//! DoH query client
//!
//! [`DohClient::query`] is the one entry point of the DoH subsystem:
//!
//! ```text
//! name ──► absolute ──► encode_query ──► base64url ──► DohTransport::get
//!                                                              │
//! values ◄───────────────── decode_answers ◄───────────────────┘
//! ```
//!
//! The endpoint is resolved once, when the client is built.

use crate::config::DohConfig;
use crate::error::{Error, Result};
use crate::registry::DohProvider;
use crate::traits::DohTransport;
use crate::wire::{absolute, decode_answers, encode_query, RecordType};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::{debug, warn};
use url::Url;

/// Client for one DoH endpoint
#[derive(Debug)]
pub struct DohClient<T> {
    provider: DohProvider,
    endpoint: Url,
    transport: T,
}

impl<T: DohTransport> DohClient<T> {
    /// Build a client for `provider`
    ///
    /// `custom_endpoint` is required for [`DohProvider::Custom`] and ignored
    /// for named providers.
    pub fn new(provider: DohProvider, custom_endpoint: Option<&str>, transport: T) -> Result<Self> {
        let endpoint = match (provider.endpoint(), custom_endpoint) {
            (Some(fixed), _) => fixed,
            (None, Some(custom)) if !custom.is_empty() => custom,
            (None, _) => {
                return Err(Error::config(format!(
                    "DoH provider {provider} requires an explicit endpoint"
                )));
            }
        };

        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::config(format!("invalid DoH endpoint {endpoint:?}: {e}")))?;
        match endpoint.scheme() {
            "https" => {}
            "http" => warn!("DoH endpoint {} is not using HTTPS", endpoint),
            other => {
                return Err(Error::config(format!(
                    "DoH endpoint must use HTTPS, got {other}"
                )));
            }
        }

        Ok(Self {
            provider,
            endpoint,
            transport,
        })
    }

    /// Build a client from the DoH section of the configuration
    pub fn from_config(config: &DohConfig, transport: T) -> Result<Self> {
        Self::new(config.doh_provider, config.doh_endpoint.as_deref(), transport)
    }

    /// Provider this client was built for
    pub fn provider(&self) -> DohProvider {
        self.provider
    }

    /// Endpoint queries are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Ask the resolver for the `record_type` records of `name`
    ///
    /// Returns the presentation values of the matching answers in response
    /// order. An answer-less response is [`Error::NoData`].
    pub async fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<String>> {
        let name = absolute(name);
        let message = encode_query(&name, record_type)?;
        let encoded = URL_SAFE_NO_PAD.encode(&message);

        debug!(
            "Querying {} for {} {} ({} byte message)",
            self.endpoint,
            name,
            record_type,
            message.len()
        );

        let response = self.transport.get(&self.endpoint, &encoded).await?;
        let values = decode_answers(&response, record_type)?;

        debug!("{} {} -> {:?}", name, record_type, values);
        Ok(values)
    }
}
