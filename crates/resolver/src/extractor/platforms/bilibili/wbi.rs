use md5::Digest;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::models::{ApiResponse, NavData};
use crate::extractor::{error::ExtractorError, platform_extractor::Extractor};

/// Permutation applied to `img_key + sub_key` to obtain the mixin key.
pub const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

const MIXIN_KEY_LEN: usize = 32;

const TIMESTAMP_KEY: &str = "wts";
const SIGNATURE_KEY: &str = "w_rid";

/// Salt appended to the query before hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinKey(String);

impl MixinKey {
    /// Derives the key from the two filename stems. Both stems together must
    /// cover every index of the permutation table.
    pub fn from_stems(img_key: &str, sub_key: &str) -> Option<Self> {
        let orig = format!("{img_key}{sub_key}").chars().collect::<Vec<_>>();
        if orig.len() < MIXIN_KEY_ENC_TAB.len() {
            return None;
        }

        Some(Self(
            MIXIN_KEY_ENC_TAB
                .iter()
                .take(MIXIN_KEY_LEN)
                .map(|&i| orig[i])
                .collect(),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A parameter set carrying `wts` and `w_rid`, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedParams {
    params: BTreeMap<String, String>,
}

impl SignedParams {
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.params.get(TIMESTAMP_KEY).and_then(|v| v.parse().ok())
    }

    pub fn signature(&self) -> Option<&str> {
        self.params.get(SIGNATURE_KEY).map(String::as_str)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.params
    }
}

fn join_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={}", v.replace(' ', "+")))
        .collect::<Vec<_>>()
        .join("&")
}

/// Signs `params` with a known key and timestamp.
///
/// Caller supplied `wts`/`w_rid` entries are replaced.
pub fn sign_with_key<I, K, V>(params: I, mixin_key: &MixinKey, timestamp: u64) -> SignedParams
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    // BTreeMap keeps the keys in codepoint order
    let mut params = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .filter(|(k, _)| k != TIMESTAMP_KEY && k != SIGNATURE_KEY)
        .collect::<BTreeMap<String, String>>();
    params.insert(TIMESTAMP_KEY.to_string(), timestamp.to_string());

    let mut hasher = md5::Md5::new();
    hasher.update(join_query(&params) + mixin_key.as_str());
    let w_rid = format!("{:x}", hasher.finalize());

    params.insert(SIGNATURE_KEY.to_string(), w_rid);
    SignedParams { params }
}

/// Request signer holding the lazily derived mixin key.
///
/// Construct once per session and share it behind an `Arc`. The key is
/// fetched on first use; concurrent first callers wait on the same fetch.
/// A failed fetch leaves nothing cached.
#[derive(Debug)]
pub struct WbiSigner {
    extractor: Extractor,
    nav_url: String,
    mixin_key: Mutex<Option<MixinKey>>,
}

impl WbiSigner {
    pub fn new(extractor: Extractor, nav_url: impl Into<String>) -> Self {
        Self {
            extractor,
            nav_url: nav_url.into(),
            mixin_key: Mutex::new(None),
        }
    }

    /// Signer with a key derived elsewhere; never touches the network.
    pub fn with_key(extractor: Extractor, nav_url: impl Into<String>, key: MixinKey) -> Self {
        Self {
            extractor,
            nav_url: nav_url.into(),
            mixin_key: Mutex::new(Some(key)),
        }
    }

    pub async fn mixin_key(&self) -> Result<MixinKey, ExtractorError> {
        // held across the fetch so that concurrent callers coalesce
        let mut guard = self.mixin_key.lock().await;
        if let Some(key) = guard.as_ref() {
            return Ok(key.clone());
        }

        let key = self.fetch_mixin_key().await.inspect_err(|e| {
            warn!("Failed to derive wbi mixin key: {}", e);
        })?;
        *guard = Some(key.clone());
        Ok(key)
    }

    /// Drops the cached key; the next signature re-derives it.
    pub async fn invalidate(&self) {
        self.mixin_key.lock().await.take();
    }

    pub async fn sign<I, K, V>(&self, params: I) -> Result<SignedParams, ExtractorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let key = self.mixin_key().await?;
        Ok(sign_with_key(params, &key, current_timestamp()))
    }

    async fn fetch_mixin_key(&self) -> Result<MixinKey, ExtractorError> {
        let signing_failure = |reason: String| ExtractorError::SigningFailure(reason);

        let response = self
            .extractor
            .get(&self.nav_url)
            .send()
            .await
            .map_err(|e| signing_failure(format!("nav request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(signing_failure(format!("nav returned {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| signing_failure(format!("nav body: {e}")))?;
        // a logged-out session answers with code -101 but still carries wbi_img
        let nav: ApiResponse<NavData> = serde_json::from_str(&body)
            .map_err(|e| signing_failure(format!("nav json: {e}")))?;

        let wbi_img = nav
            .data
            .and_then(|data| data.wbi_img)
            .ok_or_else(|| signing_failure(format!("nav without wbi_img (code {})", nav.code)))?;

        let img_key = take_filename(&wbi_img.img_url)
            .ok_or_else(|| signing_failure(format!("bad img_url {:?}", wbi_img.img_url)))?;
        let sub_key = take_filename(&wbi_img.sub_url)
            .ok_or_else(|| signing_failure(format!("bad sub_url {:?}", wbi_img.sub_url)))?;

        debug!("wbi keys: img={} sub={}", img_key, sub_key);

        MixinKey::from_stems(img_key, sub_key)
            .ok_or_else(|| signing_failure("wbi keys too short".to_string()))
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn take_filename(url: &str) -> Option<&str> {
    url.rsplit_once('/')
        .and_then(|(_, s)| s.rsplit_once('.'))
        .map(|(s, _)| s)
        .filter(|s| !s.is_empty())
}
