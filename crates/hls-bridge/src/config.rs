use bilivod_resolver::extractor::{DEFAULT_REFERER, DEFAULT_UA};

/// Base URI of the reserved playlist scheme.
pub const DEFAULT_BASE_URI: &str = "custom-scheme://playlist";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Prefix of every intercepted URL, without a trailing slash.
    ///
    /// Players that cannot register a custom scheme can point this at a
    /// loopback HTTP server instead, e.g. `http://127.0.0.1:7878/playlist`.
    pub base_uri: String,
    /// Sent with every range request; the CDN rejects requests without it.
    pub referer: String,
    pub user_agent: String,
}

impl BridgeConfig {
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into().trim_end_matches('/').to_string();
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_uri: DEFAULT_BASE_URI.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            user_agent: DEFAULT_UA.to_string(),
        }
    }
}
