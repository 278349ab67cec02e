use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("invalid content id: {0}")]
    InvalidContentId(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("client error: {0}")]
    ClientError(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The mixin key could not be derived. Nothing is cached.
    #[error("signing failure: {0}")]
    SigningFailure(String),
    /// The server answered with a non-zero embedded status code.
    #[error("api error {code}: {message}")]
    ApiError { code: i64, message: String },
    /// One tier was rejected or lacked the expected fields. Recovered inside the cascade.
    #[error("tier {tier} not viable: {reason}")]
    TierNotViable { tier: String, reason: String },
    /// Every tier was attempted and none produced a source.
    #[error("no playable source for {content_id} after {attempted} tiers")]
    NoPlayableSource { content_id: String, attempted: usize },
    #[error("no pages found for {0}")]
    MissingPageId(String),
    #[error("invalid byte range: {0:?}")]
    InvalidByteRange(String),
}

impl ExtractorError {
    pub(crate) fn tier_not_viable(tier: impl ToString, reason: impl Into<String>) -> Self {
        Self::TierNotViable {
            tier: tier.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the tier cascade may continue past this error.
    pub fn is_tier_local(&self) -> bool {
        matches!(self, Self::TierNotViable { .. })
    }
}
