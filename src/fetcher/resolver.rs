use std::io;
use std::net::IpAddr;

use async_trait::async_trait;
use url::{Host, Url};

/// Name lookup used to fill [`FetchResponse::ip`](crate::domain::FetchResponse).
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Resolves through the operating system via `tokio::net::lookup_host`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((host, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Best-effort address of the URL's host. Never fails; an unresolvable host
/// yields an empty string.
pub async fn lookup_ip(resolver: &dyn Resolver, url: &Url) -> String {
    match url.host() {
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        Some(Host::Domain(domain)) => match resolver.resolve(domain).await {
            Ok(addrs) => addrs.first().map(IpAddr::to_string).unwrap_or_default(),
            Err(e) => {
                tracing::debug!(host = domain, error = %e, "address lookup failed");
                String::new()
            }
        },
        None => String::new(),
    }
}
