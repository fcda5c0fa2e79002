use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};
use url::Url;

use crate::app::{Result, TransportError};
use crate::fetcher::{Transport, TransportResponse};

pub const DEFAULT_USER_AGENT: &str = concat!("fetchpool/", env!("CARGO_PKG_VERSION"));
pub const MAX_REDIRECTS: usize = 10;

/// reqwest-backed transport. One client is shared by every worker so
/// connections are pooled across fetches.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> std::result::Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
            final_url,
        })
    }
}
