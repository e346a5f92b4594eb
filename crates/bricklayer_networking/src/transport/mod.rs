//! # Transport Layer
//!
//! How wire text reaches the server and how the reply comes back.
//!
//! - [`ServerLink`]: one blocking request/response exchange
//! - [`HttpLink`]: HTTP POST to the authority's endpoint
//!
//! The dispatcher thread is the only caller, so a link is free to block for
//! the whole round trip.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::TransportError;

/// A blocking request/response channel to the server.
pub trait ServerLink: Send + Sync {
    /// Sends `message` and returns the raw reply body.
    ///
    /// # Errors
    ///
    /// Any failure to deliver the message or read the reply.
    fn send(&self, message: &str) -> Result<String, TransportError>;
}

/// Link statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Requests attempted.
    pub requests: u64,
    /// Requests that failed.
    pub failures: u64,
    /// Bytes posted.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
}

#[derive(Debug, Default)]
struct AtomicLinkStats {
    requests: AtomicU64,
    failures: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
}

impl AtomicLinkStats {
    fn snapshot(&self) -> LinkStats {
        LinkStats {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

/// HTTP transport: each message is the body of a POST.
#[derive(Debug)]
pub struct HttpLink {
    url: String,
    client: reqwest::blocking::Client,
    stats: AtomicLinkStats,
}

impl HttpLink {
    /// Creates a link to `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("bricklayer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { url: url.into(), client, stats: AtomicLinkStats::default() })
    }

    /// Endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Counters since creation.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        self.stats.snapshot()
    }

    fn post(&self, message: &str) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(message.to_owned())
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

impl ServerLink for HttpLink {
    fn send(&self, message: &str) -> Result<String, TransportError> {
        self.stats.requests.fetch_add(1, Ordering::Relaxed);
        self.stats.bytes_sent.fetch_add(message.len() as u64, Ordering::Relaxed);

        match self.post(message) {
            Ok(body) => {
                self.stats.bytes_received.fetch_add(body.len() as u64, Ordering::Relaxed);
                Ok(body)
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Network request to {} failed: {}", self.url, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on localhost is closed on test machines.
        let link = HttpLink::new("http://127.0.0.1:9/lego", Duration::from_millis(500)).unwrap();
        let result = link.send("TransactionsSince\n0 0\n");
        assert!(result.is_err());

        let stats = link.stats();
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.bytes_sent, 22);
        assert_eq!(stats.bytes_received, 0);
    }
}
