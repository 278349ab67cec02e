use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Extractor error: {0}")]
    Extractor(#[from] bilivod_resolver::ExtractorError),

    #[error("Playlist bridge error: {0}")]
    Bridge(#[from] hls_bridge::BridgeError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
