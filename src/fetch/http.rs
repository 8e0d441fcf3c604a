use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use tracing::{debug, warn};

use super::{AssetFetcher, FetchError};
use crate::cache::keys::AssetCacheKey;
use crate::config::Config;
use crate::models::Asset;

/// Fetches one asset listing from an upstream HTTP service:
/// `GET {upstream}/assets/{address}/{chain}?assets={supported_assets_key}`
#[derive(Clone)]
pub struct HttpAssetFetcher {
    client: Client,
    url: String,
    supported_assets_key: String,
    max_retries: usize,
}

impl HttpAssetFetcher {
    pub fn new(client: Client, config: &Config, key: &AssetCacheKey) -> Self {
        let url = format!(
            "{}/assets/{}/{}",
            config.upstream_url.trim_end_matches('/'),
            key.address,
            key.chain_type
        );

        Self {
            client,
            url,
            supported_assets_key: key.supported_assets_key.clone(),
            max_retries: config.fetch_max_retries,
        }
    }

    /// Shared client honouring the configured timeout
    pub fn build_client(config: &Config) -> Result<Client, FetchError> {
        Ok(Client::builder().timeout(config.fetch_timeout).build()?)
    }

    async fn fetch_once(&self) -> Result<Vec<Asset>, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("assets", self.supported_assets_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let assets: Vec<Asset> = response.json().await?;
        debug!("Fetched {} assets from {}", assets.len(), self.url);
        Ok(assets)
    }
}

fn is_transient(err: &FetchError) -> bool {
    match err {
        FetchError::Http(e) => e.is_timeout() || e.is_connect(),
        FetchError::Upstream { status, .. } => *status == 429 || *status >= 500,
        FetchError::Other(_) => false,
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self) -> Result<Vec<Asset>, FetchError> {
        let backoff = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(200))
            .with_max_times(self.max_retries);

        (|| self.fetch_once())
            .retry(backoff)
            .when(is_transient)
            .notify(|err: &FetchError, dur: Duration| {
                warn!("Retrying {} in {:?} after error: {}", self.url, dur, err);
            })
            .await
    }
}
