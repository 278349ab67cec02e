use crate::extractor::default::{DEFAULT_REFERER, DEFAULT_UA};
use crate::media::PlayableSource;

use super::error::ExtractorError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use tracing::debug;

/// Session context shared by every upstream call.
///
/// Holds the HTTP client, the headers that make requests look like the
/// first-party web client, and the cookies of an authenticated session
/// (`SESSDATA` and friends). Cookies are supplied by the caller; this type
/// never logs in on its own.
///
/// # Example Usage
///
/// ```rust,no_run
/// use bilivod_resolver::extractor::platform_extractor::Extractor;
///
/// let mut extractor = Extractor::new("Bilibili", reqwest::Client::new());
/// extractor.set_cookies_from_string("SESSDATA=abc123; buvid3=xyz789");
/// assert!(extractor.has_cookie("SESSDATA"));
/// ```
#[derive(Debug, Clone)]
pub struct Extractor {
    // name of the platform, used in logs
    pub platform_name: String,
    pub client: Client,
    platform_headers: HeaderMap,
    /// Cookie storage. Each extractor instance keeps its own session.
    pub cookies: FxHashMap<String, String>,
}

impl Extractor {
    pub fn new<S: Into<String>>(platform_name: S, client: Client) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(DEFAULT_UA),
        );
        default_headers.insert(
            reqwest::header::REFERER,
            HeaderValue::from_static(DEFAULT_REFERER),
        );
        default_headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        default_headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.8,en-US;q=0.5,en;q=0.3"),
        );

        Self {
            platform_name: platform_name.into(),
            client,
            platform_headers: default_headers,
            cookies: FxHashMap::default(),
        }
    }

    pub fn add_header<K: AsRef<str>, V: AsRef<str>>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(), ExtractorError> {
        let name = HeaderName::from_str(key.as_ref())
            .map_err(|e| ExtractorError::InvalidHeader(format!("{}: {e}", key.as_ref())))?;
        let value = HeaderValue::from_str(value.as_ref())
            .map_err(|e| ExtractorError::InvalidHeader(format!("{}: {e}", key.as_ref())))?;
        self.platform_headers.insert(name, value);
        Ok(())
    }

    pub fn add_cookie<N: Into<String>, V: Into<String>>(&mut self, name: N, value: V) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Set cookies from a cookie string (format: "name1=value1; name2=value2").
    /// This is useful for importing cookies from browsers or external sources.
    pub fn set_cookies_from_string(&mut self, cookie_string: &str) {
        for cookie in cookie_string.split(';') {
            let cookie = cookie.trim();
            if let Some((name, value)) = cookie.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn get_cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    /// Convert stored cookies to a Cookie header value string.
    fn build_cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }

        let mut pairs = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>();
        pairs.sort();

        Some(pairs.join("; "))
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Create an HTTP request carrying the platform headers and session cookies.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .headers(self.platform_headers.clone());

        if let Some(value) = self
            .build_cookie_header()
            .and_then(|header| HeaderValue::from_str(&header).ok())
        {
            debug!("Adding {} cookies to request", self.cookies.len());
            builder = builder.header(reqwest::header::COOKIE, value);
        }

        builder
    }

    /// Header value by name, for collaborators that replay the session (range fetches).
    pub fn header_str(&self, name: HeaderName) -> Option<&str> {
        self.platform_headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

/// Turns a content id (plus optional page id) into one playable source.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    fn get_extractor(&self) -> &Extractor;

    async fn resolve(
        &self,
        content_id: &str,
        page_id: Option<u64>,
    ) -> Result<PlayableSource, ExtractorError>;
}
