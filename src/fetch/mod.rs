//! Source of fresh asset listings

pub mod http;

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Asset;

pub use http::HttpAssetFetcher;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("Fetch failed: {0}")]
    Other(String),
}

/// Produces the current asset list for one (address, chain, asset set) request
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Asset>, FetchError>;
}

#[async_trait]
impl<F, Fut> AssetFetcher for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<Asset>, FetchError>> + Send,
{
    async fn fetch(&self) -> Result<Vec<Asset>, FetchError> {
        (self)().await
    }
}
