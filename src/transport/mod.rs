use anyhow::Context;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod cookies;

use crate::Result;

/// Local Tor SOCKS endpoint, resolving hostnames through the proxy
pub const DEFAULT_PROXY_URL: &str = "socks5h://127.0.0.1:9050";

/// Page that confirms traffic is leaving through Tor
pub const DEFAULT_PROXY_CHECK_URL: &str = "https://check.torproject.org";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// HTTP client with an explicit, immutable connection configuration.
///
/// Cloning is cheap. Dropping the proxy produces a new client that shares the
/// cookie jar instead of mutating this one, so concurrent users never observe
/// each other's proxy state.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    proxy: Option<String>,
    cookies: Arc<Jar>,
}

impl HttpClient {
    /// Direct client with an empty cookie jar
    pub fn direct() -> Result<Self> {
        Self::with_parts(None, Arc::new(Jar::default()))
    }

    /// Build a client for the given proxy (if any) and cookie jar
    pub fn with_parts(proxy: Option<&str>, cookies: Arc<Jar>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_provider(cookies.clone());

        if let Some(proxy_url) = proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            proxy: proxy.map(str::to_string),
            cookies,
        })
    }

    /// Same cookies, direct connection
    pub fn without_proxy(&self) -> Result<Self> {
        Self::with_parts(None, self.cookies.clone())
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

/// How traffic leaves the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Direct,
    Proxied,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionType::Direct => write!(f, "direct"),
            ConnectionType::Proxied => write!(f, "proxied"),
        }
    }
}

/// Advisory report on how the client was built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub using_proxy: bool,
    pub connection_type: ConnectionType,
    pub cookies_loaded: bool,
    pub error: Option<String>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            using_proxy: false,
            connection_type: ConnectionType::Direct,
            cookies_loaded: false,
            error: None,
        }
    }
}

/// Inputs for [`build_client`]
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Netscape cookie jar; a missing file is not an error
    pub cookie_file: Option<PathBuf>,
    pub use_proxy: bool,
    pub proxy_url: String,
    pub proxy_check_url: String,
    pub proxy_check_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            cookie_file: Some(PathBuf::from("cookies.txt")),
            use_proxy: true,
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            proxy_check_url: DEFAULT_PROXY_CHECK_URL.to_string(),
            proxy_check_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome of probing the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyProbe {
    Confirmed,
    Unconfirmed,
    Unavailable(String),
}

impl ProxyProbe {
    /// Interpret the check page body
    pub fn from_check_page(body: &str) -> Self {
        if body.contains("Congratulations") {
            ProxyProbe::Confirmed
        } else {
            ProxyProbe::Unconfirmed
        }
    }
}

async fn probe_proxy(options: &TransportOptions) -> ProxyProbe {
    let client = match HttpClient::with_parts(Some(&options.proxy_url), Arc::new(Jar::default())) {
        Ok(client) => client,
        Err(e) => return ProxyProbe::Unavailable(format!("{:#}", e)),
    };

    let response = client
        .get(&options.proxy_check_url)
        .timeout(options.proxy_check_timeout)
        .send()
        .await;

    match response {
        Ok(response) => match response.text().await {
            Ok(body) => ProxyProbe::from_check_page(&body),
            Err(e) => ProxyProbe::Unavailable(e.to_string()),
        },
        Err(e) => ProxyProbe::Unavailable(e.to_string()),
    }
}

/// Build the shared HTTP client.
///
/// Proxy and cookie problems are recorded in the returned status and never
/// abort construction; only a client that cannot be built at all is an error.
pub async fn build_client(options: &TransportOptions) -> Result<(HttpClient, ConnectionStatus)> {
    let mut status = ConnectionStatus::default();
    let mut proxy = None;

    if options.use_proxy {
        match probe_proxy(options).await {
            ProxyProbe::Confirmed => {
                tracing::info!("Routing traffic through proxy {}", options.proxy_url);
                proxy = Some(options.proxy_url.as_str());
                status.using_proxy = true;
                status.connection_type = ConnectionType::Proxied;
            }
            ProxyProbe::Unconfirmed => {
                tracing::warn!("Proxy answered but the connection check failed");
                status.error = Some("Tor is running but connection check failed".to_string());
            }
            ProxyProbe::Unavailable(reason) => {
                tracing::warn!("Proxy unavailable, using direct connection: {}", reason);
                status.error = Some(format!("Tor not available: {}", reason));
            }
        }
    }

    let jar = Arc::new(Jar::default());
    if let Some(path) = options.cookie_file.as_deref().filter(|p| p.exists()) {
        match cookies::load_into_jar(path, &jar) {
            Ok(count) => {
                tracing::info!("Loaded {} cookies from {}", count, path.display());
                status.cookies_loaded = true;
            }
            Err(e) => {
                tracing::warn!("Ignoring cookie file {}: {}", path.display(), e);
                status.error = Some(format!("Failed to load cookies: {}", e));
            }
        }
    }

    let client = HttpClient::with_parts(proxy, jar)?;
    Ok((client, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_proxy_drops_proxy_only_on_the_copy() {
        let client = HttpClient::with_parts(Some(DEFAULT_PROXY_URL), Arc::new(Jar::default())).unwrap();
        let direct = client.without_proxy().unwrap();

        assert!(client.is_proxied());
        assert_eq!(client.proxy(), Some(DEFAULT_PROXY_URL));
        assert!(!direct.is_proxied());
        assert!(Arc::ptr_eq(&client.cookies, &direct.cookies));
    }

    #[test]
    fn test_invalid_proxy_url_is_an_error() {
        assert!(HttpClient::with_parts(Some("not a proxy"), Arc::new(Jar::default())).is_err());
    }

    #[test]
    fn test_proxy_check_page() {
        assert_eq!(
            ProxyProbe::from_check_page("<h1>Congratulations. This browser is configured to use Tor.</h1>"),
            ProxyProbe::Confirmed
        );
        assert_eq!(
            ProxyProbe::from_check_page("<h1>Sorry. You are not using Tor.</h1>"),
            ProxyProbe::Unconfirmed
        );
    }

    #[tokio::test]
    async fn test_direct_build_without_cookie_file() {
        let options = TransportOptions {
            cookie_file: Some(PathBuf::from("/nonexistent/cookies.txt")),
            use_proxy: false,
            ..TransportOptions::default()
        };

        let (client, status) = build_client(&options).await.unwrap();
        assert!(!client.is_proxied());
        assert_eq!(status, ConnectionStatus::default());
    }

    #[tokio::test]
    async fn test_malformed_cookie_file_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(&path, "garbage").unwrap();

        let options = TransportOptions {
            cookie_file: Some(path),
            use_proxy: false,
            ..TransportOptions::default()
        };

        let (_client, status) = build_client(&options).await.unwrap();
        assert!(!status.cookies_loaded);
        assert!(status.error.unwrap().starts_with("Failed to load cookies"));
    }

    #[tokio::test]
    async fn test_valid_cookie_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(
            &path,
            "# Netscape HTTP Cookie File\n.youtube.com\tTRUE\t/\tTRUE\t0\tPREF\thl=en\n",
        )
        .unwrap();

        let options = TransportOptions {
            cookie_file: Some(path),
            use_proxy: false,
            ..TransportOptions::default()
        };

        let (_client, status) = build_client(&options).await.unwrap();
        assert!(status.cookies_loaded);
        assert_eq!(status.error, None);
    }
}
