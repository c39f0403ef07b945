//! Reachability check for the site under test
//!
//! The shop is an external deployment, so instead of spawning a server the
//! runner only confirms the base URL answers before launching browsers.

use std::time::{Duration, Instant};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    /// Give up after this long
    pub timeout_ms: u64,
    /// Per-request timeout
    pub request_timeout_ms: u64,
    /// Pause between attempts
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 30_000,
            request_timeout_ms: 5_000,
            interval_ms: 500,
        }
    }
}

/// HTTP probe against the base URL
pub struct SiteProbe {
    client: reqwest::Client,
    url: String,
    config: ProbeConfig,
}

impl SiteProbe {
    pub fn new(url: &str, config: ProbeConfig) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            config,
        })
    }

    /// Poll until the site answers with a success status
    ///
    /// Returns the number of attempts it took.
    pub async fn wait_until_reachable(&self) -> E2eResult<usize> {
        let deadline = Duration::from_millis(self.config.timeout_ms);
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(&self.url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Site is reachable at {}", self.url);
                    return Ok(attempts);
                }
                Ok(resp) => {
                    warn!("Probe of {} returned {}", self.url, resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {}...", self.url);
                    }
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("Probe error: {}", e);
                    }
                }
            }

            if start.elapsed() >= deadline {
                break;
            }
            sleep(Duration::from_millis(self.config.interval_ms)).await;
        }

        Err(E2eError::SiteUnreachable {
            url: self.url.clone(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn quick() -> ProbeConfig {
        ProbeConfig {
            enabled: true,
            timeout_ms: 300,
            request_timeout_ms: 200,
            interval_ms: 50,
        }
    }

    #[tokio::test]
    async fn test_reachable_site() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                    .await;
            }
        });

        let probe = SiteProbe::new(&format!("http://{}/", addr), quick()).unwrap();
        assert_eq!(probe.wait_until_reachable().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_site() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = SiteProbe::new(&format!("http://127.0.0.1:{}/", port), quick()).unwrap();
        match probe.wait_until_reachable().await {
            Err(E2eError::SiteUnreachable { attempts, .. }) => assert!(attempts >= 2),
            other => panic!("expected SiteUnreachable, got {:?}", other.map(|_| ())),
        }
    }
}
