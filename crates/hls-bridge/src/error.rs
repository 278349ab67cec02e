use sidx::SidxError;
use thiserror::Error;

/// Errors raised while answering one playlist request.
///
/// None of them poison the session: the next request starts from scratch
/// and a failed index fetch is never cached.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("malformed segment index: {0}")]
    MalformedSegmentIndex(#[from] SidxError),
    #[error("range fetch failed for {url}: {reason}")]
    RangeFetchFailure { url: String, reason: String },
    #[error("segment offsets of {url} run past the addressable range")]
    SegmentOffsetOverflow { url: String },
    #[error("source is a single progressive file, nothing to bridge")]
    NotSegmented,
    #[error("invalid bridge configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    pub(crate) fn range_fetch(url: &str, reason: impl ToString) -> Self {
        Self::RangeFetchFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
