//! Live transport over libcurl.

use async_trait::async_trait;
use std::time::Duration;

use super::{redact_service_key, Transport};
use crate::config::UpstreamConfig;
use crate::retry::{Outcome, TransportError};

/// Blocking curl GET moved onto the blocking pool per call.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    connect_timeout: Duration,
    timeout: Duration,
}

impl CurlTransport {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Self {
        Self {
            connect_timeout,
            timeout,
        }
    }

    pub fn from_config(cfg: &UpstreamConfig) -> Self {
        Self::new(
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::from_config(&UpstreamConfig::default())
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn get(&self, url: &str) -> Outcome {
        let url = url.to_string();
        let connect_timeout = self.connect_timeout;
        let timeout = self.timeout;
        match tokio::task::spawn_blocking(move || get_blocking(&url, connect_timeout, timeout))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Transport(TransportError::Other(format!("transport task join: {e}"))),
        }
    }
}

/// Performs a GET and returns status and body.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
fn get_blocking(url: &str, connect_timeout: Duration, timeout: Duration) -> Outcome {
    let mut body: Vec<u8> = Vec::new();
    let mut easy = curl::easy::Easy::new();

    if let Err(e) = configure(&mut easy, url, connect_timeout, timeout) {
        return Outcome::Transport(TransportError::from_curl(&e));
    }

    let performed = {
        let mut transfer = easy.transfer();
        let result = match transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        }) {
            Ok(()) => transfer.perform(),
            Err(e) => Err(e),
        };
        result
    };
    if let Err(e) = performed {
        tracing::debug!(url = %redact_service_key(url), "upstream request failed: {}", e);
        return Outcome::Transport(TransportError::from_curl(&e));
    }

    match easy.response_code() {
        Ok(status) => Outcome::Response { status, body },
        Err(e) => Outcome::Transport(TransportError::from_curl(&e)),
    }
}

fn configure(
    easy: &mut curl::easy::Easy,
    url: &str,
    connect_timeout: Duration,
    timeout: Duration,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.get(true)?;
    easy.follow_location(true)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(timeout)?;
    // Accept any encoding libcurl can decode.
    easy.accept_encoding("")?;
    Ok(())
}
