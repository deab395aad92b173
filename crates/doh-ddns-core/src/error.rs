//! Error types for doh-ddns
//!
//! This module defines all error types used throughout the workspace.
//!
//! The first six variants form the core taxonomy of the DoH query engine
//! and the reconciler. The remaining variants are produced by the adapters
//! (zone backends, address discovery, configuration loading).

use thiserror::Error;

/// Result type alias for doh-ddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by transport and backend errors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core error type for doh-ddns
#[derive(Error, Debug)]
pub enum Error {
    /// A DoH provider or zone backend name that is not known
    #[error("unknown provider {0:?}")]
    UnknownProvider(String),

    /// A domain name that cannot be encoded on the wire
    #[error("invalid domain name {name:?}: {reason}")]
    InvalidName {
        /// The offending name as supplied by the caller
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Network or HTTP level failure while talking to a DoH endpoint
    #[error("DoH transport error ({endpoint}): {source}")]
    Transport {
        /// Endpoint the request was sent to
        endpoint: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// A DNS response that cannot be parsed
    #[error("malformed DNS message: {0}")]
    MalformedMessage(String),

    /// A well-formed response without a single answer of the requested type
    #[error("no {record_type} data for {name}")]
    NoData {
        /// Queried name
        name: String,
        /// Queried record type
        record_type: String,
    },

    /// Failure reported by a zone backend while reading or writing records
    #[error("backend failed to {operation} in zone {zone}: {source}")]
    Backend {
        /// Operation that failed (e.g. "set records")
        operation: &'static str,
        /// Zone the operation targeted
        zone: String,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Address discovery errors
    #[error("Address discovery error: {0}")]
    Discovery(String),

    /// HTTP failures talking to backend APIs (network errors, 5xx responses)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Backend name
        provider: String,
        /// Error message
        message: String,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A DNS response whose RCODE reports that the server could not answer
    #[error("DNS server answered {meaning} (rcode {rcode}) for {name}")]
    ServerFailure {
        /// Queried name
        name: String,
        /// Response code from the header
        rcode: u8,
        /// Mnemonic of the response code
        meaning: &'static str,
    },
}

impl Error {
    /// Create an invalid name error
    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error for `endpoint`
    pub fn transport(endpoint: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    /// Create a malformed message error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedMessage(msg.into())
    }

    /// Create a "no data" outcome for a query
    pub fn no_data(name: impl Into<String>, record_type: impl ToString) -> Self {
        Self::NoData {
            name: name.into(),
            record_type: record_type.to_string(),
        }
    }

    /// Wrap a failure returned by a zone backend
    pub fn backend(operation: &'static str, zone: impl Into<String>, source: Error) -> Self {
        Self::Backend {
            operation,
            zone: zone.into(),
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an address discovery error
    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an error for a response carrying a failure `rcode`
    pub fn server_failure(name: impl Into<String>, rcode: u8) -> Self {
        let meaning = match rcode {
            1 => "FORMERR",
            2 => "SERVFAIL",
            4 => "NOTIMP",
            5 => "REFUSED",
            _ => "an error",
        };
        Self::ServerFailure {
            name: name.into(),
            rcode,
            meaning,
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// `true` for the legitimate empty result of a query
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    /// `true` when re-invoking the failed operation later may succeed
    ///
    /// Nothing in this workspace retries on its own; this only tells the
    /// caller which failures are worth scheduling again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::RateLimited(_) | Self::Http(_) => true,
            Self::ServerFailure { rcode, .. } => *rcode == 2,
            Self::Backend { source, .. } => source
                .downcast_ref::<Error>()
                .is_some_and(Error::is_retryable),
            _ => false,
        }
    }
}
