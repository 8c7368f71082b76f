//! Single-attempt link probes.

use std::future::Future;

use reqwest::Client;
use skillsync_shared::{Result, SyncError};
use tracing::trace;
use url::Url;

/// User-Agent string for link checks.
const USER_AGENT: &str = concat!("skillsync/", env!("CARGO_PKG_VERSION"));

/// Redirect hops followed before giving up on a link.
const MAX_REDIRECTS: usize = 10;

/// What one network read of a link produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The server answered with this final status code.
    Status(u16),
    /// Connection, TLS, or body-read failure. Eligible for retry.
    Transport(String),
}

/// Performs exactly one attempt at reading a link.
///
/// Timeouts are applied by the caller; implementations must be safe to drop
/// mid-flight.
pub trait LinkProbe: Send + Sync + 'static {
    fn probe(&self, url: &Url) -> impl Future<Output = ProbeOutcome> + Send;
}

/// Probe that GETs the link and reads the full body.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Build a probe with redirect following enabled.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| SyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl LinkProbe for HttpProbe {
    async fn probe(&self, url: &Url) -> ProbeOutcome {
        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => return ProbeOutcome::Transport(e.to_string()),
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => {
                trace!(%url, status, bytes = body.len(), "probe completed");
                ProbeOutcome::Status(status)
            }
            Err(e) => ProbeOutcome::Transport(format!("body read failed: {e}")),
        }
    }
}
