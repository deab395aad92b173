// # DoH Transport Trait
//
// Carries an already encoded DNS query to a DoH endpoint and returns the
// raw response body. The reqwest implementation lives in the
// `doh-ddns-transport` crate; tests substitute canned responses.

use async_trait::async_trait;
use url::Url;

/// Trait for RFC 8484 transports
///
/// # Contract
///
/// - One HTTP exchange per call, no retries
/// - `message` is the unpadded base64url encoding of the query and goes
///   into the `dns` query parameter unchanged
/// - Any network, HTTP status or body failure is reported as
///   [`crate::Error::Transport`] carrying the cause
#[async_trait]
pub trait DohTransport: Send + Sync {
    /// Perform the GET exchange and return the response body
    async fn get(&self, endpoint: &Url, message: &str) -> Result<Vec<u8>, crate::Error>;
}
