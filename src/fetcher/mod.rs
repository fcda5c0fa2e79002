pub mod headers;
pub mod http_transport;
pub mod resolver;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::app::{Result, TransportError};
use crate::domain::{FailureKind, FetchResponse};
use crate::pool::PoolConfig;

pub use headers::serialize_headers;
pub use http_transport::HttpTransport;
pub use resolver::{Resolver, SystemResolver};

/// What the transport hands back for a completed GET.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// URL the body was served from, after redirects
    pub final_url: Url,
}

#[async_trait]
pub trait Transport {
    /// Issue a GET. HTTP error statuses are returned as data; only failures to
    /// obtain a response are errors.
    async fn get(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> std::result::Result<TransportResponse, TransportError>;
}

impl TransportError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TransportError::Timeout(_) => FailureKind::Timeout,
            TransportError::Body(_) => FailureKind::Body,
            TransportError::Connect(_) | TransportError::Request(_) => FailureKind::Transport,
        }
    }
}

/// Performs single fetches. Never returns an error: every outcome is folded
/// into the [`FetchResponse`].
pub struct Fetcher {
    transport: Arc<dyn Transport + Send + Sync>,
    resolver: Arc<dyn Resolver>,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn Transport + Send + Sync>,
        resolver: Arc<dyn Resolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            resolver,
            timeout,
        }
    }

    /// HTTP transport and system resolver configured from `config`.
    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        let transport = match &config.user_agent {
            Some(agent) => HttpTransport::with_user_agent(agent)?,
            None => HttpTransport::new()?,
        };

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(SystemResolver),
            config.timeout(),
        ))
    }

    pub async fn fetch(&self, url: &str) -> FetchResponse {
        self.fetch_with(url, &CancellationToken::new()).await
    }

    /// Fetch `raw_url`, giving up early if `cancel` fires.
    pub async fn fetch_with(&self, raw_url: &str, cancel: &CancellationToken) -> FetchResponse {
        let mut response = FetchResponse::new(raw_url);

        let url = match parse_target(raw_url) {
            Ok(url) => url,
            Err(message) => {
                tracing::warn!(url = raw_url, error = %message, "invalid URL");
                response.fail(FailureKind::InvalidUrl, message);
                return response;
            }
        };

        if cancel.is_cancelled() {
            response.fail(FailureKind::Cancelled, "batch cancelled before fetch");
            return response;
        }

        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.transport.get(&url, self.timeout) => Some(result),
        };
        response.duration_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);

        let reply = match result {
            Some(Ok(reply)) => reply,
            Some(Err(e)) => {
                tracing::warn!(url = raw_url, error = %e, "fetch failed");
                response.fail(e.failure_kind(), e.to_string());
                return response;
            }
            None => {
                tracing::debug!(url = raw_url, "fetch cancelled");
                response.fail(FailureKind::Cancelled, "batch cancelled during fetch");
                return response;
            }
        };

        response.body = reply.body;
        if reply.final_url != url {
            response.final_url = reply.final_url.to_string();
        }
        response.ip = resolver::lookup_ip(self.resolver.as_ref(), &url).await;
        response.stamp_date();
        response.header = serialize_headers(&reply.headers);
        response.response_code = reply.status;

        tracing::debug!(
            url = raw_url,
            status = response.response_code,
            bytes = response.body.len(),
            "fetched"
        );

        response
    }
}

/// Only absolute http(s) URLs reach the transport.
fn parse_target(raw_url: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw_url.trim()).map_err(|e| format!("{raw_url}: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("{raw_url}: unsupported scheme '{other}'")),
    }
}
