use crate::error::{ProbeError, Result};
use lnsim_core::config::ProbeConfig;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Polls a daemon's HTTP endpoint until it answers.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    interval: Duration,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new() -> Result<Self> {
        Self::from_config(&ProbeConfig::default())
    }

    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("lnsim/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(5))
            // LND serves a self-signed certificate
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            interval: config.interval(),
            timeout: config.timeout(),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Single attempt. Any HTTP response counts, even an error status: the
    /// daemon is listening.
    pub async fn check(&self, url: &Url) -> bool {
        match self.client.get(url.clone()).send().await {
            Ok(response) => {
                debug!("{} answered with {}", url, response.status());
                true
            }
            Err(e) => {
                debug!("{} not ready: {}", url, e);
                false
            }
        }
    }

    /// Retries [`check`](Self::check) every interval until it succeeds or the
    /// probe's timeout elapses.
    pub async fn wait_until_online(&self, url: &Url) -> Result<()> {
        let poll = async {
            let mut attempts = 0u32;
            loop {
                attempts += 1;
                if self.check(url).await {
                    return attempts;
                }
                tokio::time::sleep(self.interval).await;
            }
        };

        match tokio::time::timeout(self.timeout, poll).await {
            Ok(attempts) => {
                info!("{} online after {} attempt(s)", url, attempts);
                Ok(())
            }
            Err(_) => Err(ProbeError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }),
        }
    }
}
