// src/services/transport.rs

//! Browser-like HTTP transport.
//!
//! One `reqwest::Client` is built per run. Every request carries a complete
//! header set for the configured browser family, and the set rotates with the
//! attempt index from a random per-session offset so retries do not repeat
//! the same user agent.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy, redirect};

use crate::error::Result;
use crate::models::{BrowserFamily, CrawlerConfig};

/// Shape of the payload a request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Markup,
    Api,
}

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// A network session the fetcher can issue GETs through.
#[async_trait]
pub trait HttpSession: Send + Sync {
    /// Issue one GET. `attempt` is zero-based and drives header rotation.
    async fn get(&self, url: &str, kind: PayloadKind, attempt: u32) -> Result<RawResponse>;
}

/// Browser header profile.
#[derive(Debug)]
struct HeaderProfile {
    family: BrowserFamily,
    user_agent: &'static str,
    /// `sec-ch-ua` and `sec-ch-ua-platform` for Chromium identities
    client_hints: Option<(&'static str, &'static str)>,
}

const PROFILES: &[HeaderProfile] = &[
    HeaderProfile {
        family: BrowserFamily::Chrome,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
        client_hints: Some((
            "\"Chromium\";v=\"130\", \"Google Chrome\";v=\"130\", \"Not?A_Brand\";v=\"99\"",
            "\"Windows\"",
        )),
    },
    HeaderProfile {
        family: BrowserFamily::Chrome,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36",
        client_hints: Some((
            "\"Google Chrome\";v=\"129\", \"Not=A?Brand\";v=\"8\", \"Chromium\";v=\"129\"",
            "\"macOS\"",
        )),
    },
    HeaderProfile {
        family: BrowserFamily::Chrome,
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36",
        client_hints: Some((
            "\"Chromium\";v=\"128\", \"Not;A=Brand\";v=\"24\", \"Google Chrome\";v=\"128\"",
            "\"Linux\"",
        )),
    },
    HeaderProfile {
        family: BrowserFamily::Firefox,
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0",
        client_hints: None,
    },
    HeaderProfile {
        family: BrowserFamily::Firefox,
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
        client_hints: None,
    },
    HeaderProfile {
        family: BrowserFamily::Safari,
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        client_hints: None,
    },
];

const MARKUP_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const API_ACCEPT: &str = "application/json,text/plain;q=0.9,*/*;q=0.8";

/// Reusable, fingerprinted HTTP session for one run.
pub struct Transport {
    client: Client,
    profiles: Vec<&'static HeaderProfile>,
    offset: usize,
}

impl Transport {
    /// Build the session from crawler settings and an optional forward proxy.
    pub fn new(config: &CrawlerConfig, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs.min(15)))
            .redirect(redirect::Policy::limited(config.max_redirects))
            .pool_idle_timeout(Duration::from_secs(90))
            .gzip(true)
            .brotli(true)
            .deflate(true);

        if let Some(proxy_url) = proxy {
            log::info!("Routing requests through proxy {}", redact_proxy(proxy_url));
            builder = builder.proxy(Proxy::all(proxy_url)?);
        }

        if config.impersonate_tls {
            log::warn!(
                "TLS fingerprint impersonation is not available in this build; continuing with the standard rustls handshake"
            );
        }

        let profiles: Vec<&'static HeaderProfile> = PROFILES
            .iter()
            .filter(|p| config.browser == BrowserFamily::Any || p.family == config.browser)
            .collect();
        let offset = rand::thread_rng().gen_range(0..profiles.len().max(1));

        Ok(Self {
            client: builder.build()?,
            profiles,
            offset,
        })
    }

    /// User agent presented on the given attempt.
    pub fn user_agent_for(&self, attempt: u32) -> &'static str {
        self.profile_for(attempt).user_agent
    }

    /// Full header set for one request.
    pub fn headers_for(&self, kind: PayloadKind, attempt: u32) -> HeaderMap {
        let profile = self.profile_for(attempt);
        let mut headers = HeaderMap::new();

        headers.insert(header::USER_AGENT, HeaderValue::from_static(profile.user_agent));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(match kind {
                PayloadKind::Markup => MARKUP_ACCEPT,
                PayloadKind::Api => API_ACCEPT,
            }),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::REFERER, HeaderValue::from_static("https://google.com/"));

        if kind == PayloadKind::Markup {
            headers.insert(
                header::UPGRADE_INSECURE_REQUESTS,
                HeaderValue::from_static("1"),
            );
        }

        if let Some((brands, platform)) = profile.client_hints {
            headers.insert(
                HeaderName::from_static("sec-ch-ua"),
                HeaderValue::from_static(brands),
            );
            headers.insert(
                HeaderName::from_static("sec-ch-ua-mobile"),
                HeaderValue::from_static("?0"),
            );
            headers.insert(
                HeaderName::from_static("sec-ch-ua-platform"),
                HeaderValue::from_static(platform),
            );
        }

        headers
    }

    fn profile_for(&self, attempt: u32) -> &'static HeaderProfile {
        if self.profiles.is_empty() {
            return &PROFILES[0];
        }
        self.profiles[(self.offset + attempt as usize) % self.profiles.len()]
    }
}

#[async_trait]
impl HttpSession for Transport {
    async fn get(&self, url: &str, kind: PayloadKind, attempt: u32) -> Result<RawResponse> {
        log::debug!("GET {} as {}", url, self.user_agent_for(attempt));
        let response = self
            .client
            .get(url)
            .headers(self.headers_for(kind, attempt))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Hide proxy credentials in log output.
fn redact_proxy(proxy_url: &str) -> String {
    match url::Url::parse(proxy_url) {
        Ok(mut parsed) if parsed.password().is_some() || !parsed.username().is_empty() => {
            let _ = parsed.set_username("***");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => proxy_url.to_string(),
    }
}
