// Range fetcher: downloads the byte range holding a representation's segment index.

use async_trait::async_trait;
use bilivod_resolver::ByteRange;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, RANGE, REFERER, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Fetches exactly `range` (inclusive) of the resource at `url`.
    async fn fetch_range(&self, url: &str, range: ByteRange) -> Result<Bytes>;
}

/// [`RangeFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpRangeFetcher {
    client: Client,
    headers: HeaderMap,
}

impl HttpRangeFetcher {
    pub fn new(client: Client, config: &BridgeConfig) -> Result<Self> {
        let header = |name: &str, value: &str| {
            HeaderValue::from_str(value)
                .map_err(|e| BridgeError::InvalidConfig(format!("{name}: {e}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert(REFERER, header("referer", &config.referer)?);
        headers.insert(USER_AGENT, header("user-agent", &config.user_agent)?);

        Ok(Self { client, headers })
    }
}

#[async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn fetch_range(&self, url: &str, range: ByteRange) -> Result<Bytes> {
        debug!("fetching {} of {}", range.http_range(), url);

        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .header(RANGE, range.http_range())
            .send()
            .await
            .map_err(|e| BridgeError::range_fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::range_fetch(url, format!("http {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::range_fetch(url, e))?;

        // servers that ignore Range answer 200 with the whole file
        if status == StatusCode::OK && body.len() as u64 > range.length() {
            let (start, end) = (range.start as usize, range.end as usize);
            if end >= body.len() {
                return Err(BridgeError::range_fetch(
                    url,
                    format!("body of {} bytes does not cover {range}", body.len()),
                ));
            }
            return Ok(body.slice(start..=end));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fetcher() -> HttpRangeFetcher {
        HttpRangeFetcher::new(Client::new(), &BridgeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_sends_range_and_session_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v.m4s"))
            .and(header("range", "bytes=10-13"))
            .and(header("referer", "https://www.bilibili.com"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![1, 2, 3, 4]))
            .expect(1)
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_range(&format!("{}/v.m4s", server.uri()), ByteRange::new(10, 13).unwrap())
            .await
            .unwrap();
        assert_eq!(&body[..], &[1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_full_body_is_sliced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes((0u8..20).collect::<Vec<_>>()))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch_range(&server.uri(), ByteRange::new(4, 6).unwrap())
            .await
            .unwrap();
        assert_eq!(&body[..], &[4, 5, 6]);
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_range(&server.uri(), ByteRange::new(0, 9).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::RangeFetchFailure { reason, .. } if reason.contains("403")));
    }

    #[test]
    fn test_rejects_invalid_header_config() {
        let config = BridgeConfig {
            referer: "bad\nvalue".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpRangeFetcher::new(Client::new(), &config),
            Err(BridgeError::InvalidConfig(_))
        ));
    }
}
