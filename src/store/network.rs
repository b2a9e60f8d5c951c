//! Network reachability checks.

use super::NetworkReachability;
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use std::time::Duration;
use tracing::debug;

/// Fixed answer, used for `--offline` and when no check URL is configured.
#[derive(Debug, Clone, Copy)]
pub struct StaticReachability(pub bool);

impl NetworkReachability for StaticReachability {
    fn is_reachable(&self) -> BoxFuture<'_, bool> {
        futures::future::ready(self.0).boxed()
    }
}

/// Checks a URL with a HEAD request. Any HTTP response counts as reachable.
pub struct HttpReachability {
    client: reqwest::Client,
    check_url: String,
}

impl HttpReachability {
    pub fn new(check_url: &str, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            check_url: check_url.to_string(),
        })
    }
}

impl NetworkReachability for HttpReachability {
    fn is_reachable(&self) -> BoxFuture<'_, bool> {
        async move {
            match self.client.head(&self.check_url).send().await {
                Ok(response) => {
                    debug!("Check of {} answered {}", self.check_url, response.status());
                    true
                }
                Err(e) if e.is_timeout() => {
                    debug!("Check of {} timed out", self.check_url);
                    false
                }
                Err(e) if e.is_connect() => {
                    debug!("Cannot connect to {}", self.check_url);
                    false
                }
                Err(e) => {
                    debug!("Check of {} failed: {}", self.check_url, e);
                    false
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_reachability() {
        assert!(StaticReachability(true).is_reachable().await);
        assert!(!StaticReachability(false).is_reachable().await);
    }

    #[tokio::test]
    async fn test_http_check_unreachable_host() {
        // Port 9 on localhost is the discard port and is normally closed.
        let checker = HttpReachability::new("http://127.0.0.1:9/", 1).unwrap();
        assert!(!checker.is_reachable().await);
    }
}
