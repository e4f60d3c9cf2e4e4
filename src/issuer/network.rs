//! Network-backed hint issuer (DNS, TCP and HTTP)

use async_trait::async_trait;
use reqwest::{Client, Proxy, header};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;
use url::Url;

use super::{Hint, HintError, HintIssuer, Result};
use crate::scheduler::Method;

/// Header browsers attach to speculative requests.
const SEC_PURPOSE: &str = "sec-purpose";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Body bytes read before a fetch is considered warm enough.
    pub max_body_bytes: usize,
    /// Explicit proxy for HTTP hints; `None` connects directly.
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("hintbox/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            proxy: None,
        }
    }
}

pub struct NetworkIssuer {
    client: Client,
    config: HttpConfig,
}

impl NetworkIssuer {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(10));

        builder = match config.proxy.as_deref() {
            Some(url) => builder.proxy(
                Proxy::all(url)
                    .map_err(|e| HintError::InvalidAddress(format!("invalid proxy: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| HintError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    async fn resolve(&self, url: &Url) -> Result<Vec<SocketAddr>> {
        let host = url
            .host_str()
            .ok_or_else(|| HintError::InvalidAddress(format!("no host in {url}")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| HintError::InvalidAddress(format!("no port for {url}")))?;

        let lookup = tokio::net::lookup_host((host, port));
        let addrs: Vec<SocketAddr> = tokio::time::timeout(self.config.connect_timeout, lookup)
            .await
            .map_err(|_| HintError::Timeout)?
            .map_err(|e| HintError::Resolve(e.to_string()))?
            .collect();

        if addrs.is_empty() {
            return Err(HintError::Resolve(format!("no addresses for {host}")));
        }
        debug!(host, count = addrs.len(), "Resolved host");
        Ok(addrs)
    }

    async fn preconnect(&self, url: &Url) -> Result<()> {
        let addrs = self.resolve(url).await?;
        let connect = TcpStream::connect(addrs[0]);
        let stream = tokio::time::timeout(self.config.connect_timeout, connect)
            .await
            .map_err(|_| HintError::Timeout)?
            .map_err(|e| HintError::Connect(e.to_string()))?;

        debug!(peer = ?stream.peer_addr().ok(), "Connection warmed");
        Ok(())
    }

    async fn fetch(&self, url: Url, method: Method) -> Result<()> {
        let mut response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, accept_for(method))
            .header(SEC_PURPOSE, "prefetch")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HintError::Timeout
                } else {
                    HintError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HintError::Status(status.as_u16()));
        }

        let mut read = 0usize;
        while read < self.config.max_body_bytes {
            match response
                .chunk()
                .await
                .map_err(|e| HintError::Request(format!("failed to read body: {e}")))?
            {
                Some(chunk) => read += chunk.len(),
                None => break,
            }
        }

        debug!(%url, %method, bytes = read, "Fetch completed");
        Ok(())
    }
}

#[async_trait]
impl HintIssuer for NetworkIssuer {
    async fn issue(&self, hint: &Hint) -> Result<()> {
        let url = Url::parse(&hint.address)
            .map_err(|e| HintError::InvalidAddress(format!("{}: {e}", hint.address)))?;

        match hint.method {
            Method::DnsPrefetch => self.resolve(&url).await.map(|_| ()),
            Method::Preconnect => self.preconnect(&url).await,
            Method::ModulePreload | Method::Preload | Method::Prefetch => {
                self.fetch(url, hint.method).await
            }
        }
    }
}

/// `Accept` value matching what a browser sends for each hint kind.
fn accept_for(method: Method) -> String {
    match method {
        Method::ModulePreload => mime::APPLICATION_JAVASCRIPT.to_string(),
        Method::Preload => format!("{},{}", mime::TEXT_CSS, mime::STAR_STAR),
        Method::Prefetch => format!("{},{}", mime::TEXT_HTML, mime::STAR_STAR),
        Method::DnsPrefetch | Method::Preconnect => mime::STAR_STAR.to_string(),
    }
}
