use super::error::ExtractorError;
use reqwest::Client;
use rustls::{ClientConfig, crypto::ring};
use rustls_platform_verifier::BuilderVerifierExt;
use std::{sync::Arc, time::Duration};
use tracing::warn;

/// Desktop browser UA; the CDN rejects range requests without a first-party looking client.
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15";
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub fn create_client(
    proxy_config: Option<ProxyConfig>,
    timeout: Duration,
) -> Result<Client, ExtractorError> {
    let provider = Arc::new(ring::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| ExtractorError::ClientError(format!("tls protocol versions: {e}")))?
        .with_platform_verifier()
        .map_err(|e| ExtractorError::ClientError(format!("platform verifier: {e}")))?
        .with_no_client_auth();

    let mut builder = Client::builder()
        .use_preconfigured_tls(tls_config)
        .timeout(timeout);

    if let Some(config) = proxy_config {
        match reqwest::Proxy::all(&config.url) {
            Ok(mut proxy) => {
                if let (Some(username), Some(password)) = (config.username, config.password) {
                    proxy = proxy.basic_auth(&username, &password);
                }
                builder = builder.proxy(proxy);
            }
            Err(e) => {
                warn!("Failed to configure proxy '{}': {}", config.url, e);
            }
        }
    }

    builder.build().map_err(ExtractorError::from)
}
