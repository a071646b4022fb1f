use std::time::Duration;

use log::{error, warn};
use reqwest::Client;

use crate::images::tools::ImageProxyError;

/// Fetches upstream image bytes. Two clients because the two processing
/// paths differ on timeouts: the standard path aborts after the configured
/// deadline, the thumbnail path has no explicit timeout.
pub struct ImageProxy {
    client: Client,
    thumbnail_client: Client,
    allowed_hosts: Option<Vec<String>>,
}

impl ImageProxy {
    pub fn new(timeout: u64, user_agent: &str, allowed_hosts: Option<Vec<String>>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        let thumbnail_client = Client::builder()
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        if allowed_hosts.is_none() {
            warn!("No image host allow-list configured - the proxy will fetch from any host");
        }

        Self {
            client,
            thumbnail_client,
            allowed_hosts,
        }
    }

    /// Fetch the raw bytes at `url`. Any non-success upstream status is an
    /// error; nothing is retried.
    pub async fn fetch_image(&self, url: &str, thumbnail: bool) -> Result<Vec<u8>, ImageProxyError> {
        self.check_host(url)?;

        let client = if thumbnail {
            &self.thumbnail_client
        } else {
            &self.client
        };

        let response = client.get(url).header("Accept", "image/*").send().await?;

        let status = response.status();
        if !status.is_success() {
            error!("Image request failed with status: {}", status);
            return Err(ImageProxyError::UpstreamError(format!(
                "Image request failed with status: {}",
                status
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    fn check_host(&self, url: &str) -> Result<(), ImageProxyError> {
        let allowed = match &self.allowed_hosts {
            Some(hosts) => hosts,
            None => return Ok(()),
        };

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| ImageProxyError::UpstreamError(format!("Invalid image URL: {}", e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ImageProxyError::UpstreamError("Image URL has no host".to_string()))?
            .to_lowercase();

        if allowed.iter().any(|h| h.to_lowercase() == host) {
            Ok(())
        } else {
            warn!("Blocked image fetch from host '{}'", host);
            Err(ImageProxyError::BlockedHost(host))
        }
    }
}
