use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::{
    extractor::{
        error::ExtractorError,
        platform_extractor::{Extractor, SourceResolver},
        platforms::bilibili::{
            models::{ApiResponse, DashStream, Durl, PageInfo, PlayUrlData},
            tiers::{DEFAULT_TIERS, PlayTier},
            wbi::WbiSigner,
        },
    },
    media::{ByteRange, PlayableMedia, PlayableSource, StreamFormat, StreamRep},
};

/// Matches a `BV` id on its own or inside a video page URL.
pub static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|bilibili\.com/video/|b23\.tv/)(BV[0-9A-Za-z_]{4,})").unwrap()
});

/// Codecs the downstream decoder cannot handle (`avc1.640034` is High@5.2).
const VIDEO_CODEC_DENYLIST: &[&str] = &["avc1.640034"];

/// PCDN / peer-assisted hosts that frequently stall or reject range requests.
const UNRELIABLE_CDN_HOSTS: &[&str] = &["mcdn.bilivideo", "szbdyd.com"];

#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub nav: String,
    pub page_list: String,
    pub play_url: String,
}

impl ApiEndpoints {
    const API_BASE: &str = "https://api.bilibili.com";

    /// All endpoints rooted at `base`, e.g. a mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            nav: format!("{base}/x/web-interface/nav"),
            page_list: format!("{base}/x/player/pagelist"),
            play_url: format!("{base}/x/player/wbi/playurl"),
        }
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::with_base(Self::API_BASE)
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub endpoints: ApiEndpoints,
    /// Attempted in order; the first viable tier wins.
    pub tiers: Vec<PlayTier>,
    pub codec_denylist: Vec<String>,
    pub unreliable_cdn_hosts: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: ApiEndpoints::default(),
            tiers: DEFAULT_TIERS.to_vec(),
            codec_denylist: VIDEO_CODEC_DENYLIST.iter().map(|s| s.to_string()).collect(),
            unreliable_cdn_hosts: UNRELIABLE_CDN_HOSTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub struct Bilibili {
    extractor: Extractor,
    signer: Arc<WbiSigner>,
    config: ResolverConfig,
}

impl Bilibili {
    /// The signer sends its nav request through a copy of `extractor`, so
    /// headers and cookies must be applied before this call.
    pub fn new(extractor: Extractor, config: ResolverConfig) -> Self {
        let signer = Arc::new(WbiSigner::new(
            extractor.clone(),
            config.endpoints.nav.clone(),
        ));
        Self::with_signer(extractor, signer, config)
    }

    /// Session extractor for this platform: default headers plus `cookies`.
    pub fn session(client: Client, cookies: Option<&str>) -> Extractor {
        let mut extractor = Extractor::new("Bilibili", client);
        if let Some(cookies) = cookies {
            extractor.set_cookies_from_string(cookies);
        }
        extractor
    }

    /// Shares an existing signer so its cached key outlives this resolver.
    pub fn with_signer(
        extractor: Extractor,
        signer: Arc<WbiSigner>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            extractor,
            signer,
            config,
        }
    }

    /// Extracts the `BV` id from a raw id or a video URL.
    pub fn extract_bvid(input: &str) -> Result<&str, ExtractorError> {
        URL_REGEX
            .captures(input.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ExtractorError::InvalidContentId(input.to_string()))
    }

    pub async fn list_pages(&self, bvid: &str) -> Result<Vec<PageInfo>, ExtractorError> {
        let response = self
            .extractor
            .get(&self.config.endpoints.page_list)
            .query(&[("bvid", bvid)])
            .send()
            .await?
            .error_for_status()?;

        let json: ApiResponse<Vec<PageInfo>> = serde_json::from_str(&response.text().await?)?;
        if json.code != 0 {
            return Err(ExtractorError::ApiError {
                code: json.code,
                message: json.message,
            });
        }

        Ok(json.data.unwrap_or_default())
    }

    async fn resolve_page_id(&self, bvid: &str, cid: Option<u64>) -> Result<u64, ExtractorError> {
        if let Some(cid) = cid {
            return Ok(cid);
        }

        let pages = self.list_pages(bvid).await?;
        let first = pages
            .first()
            .ok_or_else(|| ExtractorError::MissingPageId(bvid.to_string()))?;
        debug!("using first page of {}: cid={} ({})", bvid, first.cid, first.part);
        Ok(first.cid)
    }

    /// Walks the tiers in order and returns the first source that packages.
    pub async fn resolve_source(
        &self,
        bvid: &str,
        cid: Option<u64>,
    ) -> Result<PlayableSource, ExtractorError> {
        let cid = self.resolve_page_id(bvid, cid).await?;

        for (index, tier) in self.config.tiers.iter().enumerate() {
            match self.fetch_tier(bvid, cid, tier).await {
                Ok(mut source) => {
                    source.tier_index = index;
                    info!(
                        "resolved {} cid={} with tier {} (quality {}, {})",
                        bvid, cid, tier, source.quality, source.format
                    );
                    return Ok(source);
                }
                Err(e) if e.is_tier_local() => {
                    warn!("{}", e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ExtractorError::NoPlayableSource {
            content_id: bvid.to_string(),
            attempted: self.config.tiers.len(),
        })
    }

    async fn fetch_tier(
        &self,
        bvid: &str,
        cid: u64,
        tier: &PlayTier,
    ) -> Result<PlayableSource, ExtractorError> {
        let params = [
            ("bvid", bvid.to_string()),
            ("cid", cid.to_string()),
            ("qn", tier.quality.to_string()),
            ("fnval", tier.fnval.to_string()),
            ("fnver", "0".to_string()),
            ("fourk", "1".to_string()),
            ("platform", tier.platform.as_str().to_string()),
        ];
        let signed = self.signer.sign(params).await?;
        debug!("play url params: {:?}", signed.params());

        let response = self
            .extractor
            .get(&self.config.endpoints.play_url)
            .query(signed.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractorError::tier_not_viable(tier, format!("http {status}")));
        }

        let body = response.text().await?;
        let json: ApiResponse<PlayUrlData> = serde_json::from_str(&body)
            .map_err(|e| ExtractorError::tier_not_viable(tier, format!("malformed body: {e}")))?;

        if json.code != 0 {
            return Err(ExtractorError::tier_not_viable(
                tier,
                format!("code {}: {}", json.code, json.message),
            ));
        }

        let data = json
            .data
            .ok_or_else(|| ExtractorError::tier_not_viable(tier, "no data"))?;

        self.package(data, tier)
    }

    fn package(&self, data: PlayUrlData, tier: &PlayTier) -> Result<PlayableSource, ExtractorError> {
        let quality = data.quality.unwrap_or(tier.quality as u32);
        let format = data.format.clone().unwrap_or_default();

        if let Some(media) = self.package_dash(&data, tier)? {
            return Ok(PlayableSource {
                media,
                quality,
                format,
                stream_format: StreamFormat::Dash,
                tier_index: 0,
                duration_ms: data.timelength,
            });
        }

        if let Some(media) = data.durl.as_deref().and_then(Self::package_durl) {
            return Ok(PlayableSource {
                media,
                quality,
                stream_format: StreamFormat::from_label(&format),
                format,
                tier_index: 0,
                duration_ms: data.timelength,
            });
        }

        Err(ExtractorError::tier_not_viable(tier, "no representations"))
    }

    /// `Ok(None)` when the response carries no complete audio+video set.
    fn package_dash(
        &self,
        data: &PlayUrlData,
        tier: &PlayTier,
    ) -> Result<Option<PlayableMedia>, ExtractorError> {
        let Some(dash) = &data.dash else {
            return Ok(None);
        };
        let videos = dash.video.as_deref().unwrap_or_default();
        let audios = dash.audio.as_deref().unwrap_or_default();

        let (Some(video), Some(audio)) = (self.select_video(videos), audios.first()) else {
            debug!(
                "tier {}: dash set incomplete ({} video, {} audio)",
                tier,
                videos.len(),
                audios.len()
            );
            return Ok(None);
        };

        let video = self
            .stream_rep(video, true)
            .map_err(|e| ExtractorError::tier_not_viable(tier, format!("video: {e}")))?;
        let audio = self
            .stream_rep(audio, false)
            .map_err(|e| ExtractorError::tier_not_viable(tier, format!("audio: {e}")))?;

        Ok(Some(PlayableMedia::SegmentedPair { video, audio }))
    }

    /// First representation whose codec is not denylisted, else the first one.
    fn select_video<'a>(&self, videos: &'a [DashStream]) -> Option<&'a DashStream> {
        videos
            .iter()
            .find(|v| !self.config.codec_denylist.iter().any(|c| c == &v.codecs))
            .or_else(|| videos.first())
    }

    fn stream_rep(&self, stream: &DashStream, is_video: bool) -> Result<StreamRep, String> {
        let base_url = stream
            .base_url()
            .ok_or_else(|| format!("rep {} has no url", stream.id))?;
        let segment_base = stream
            .segment_base()
            .ok_or_else(|| format!("rep {} has no segment base", stream.id))?;

        let (url, mirrors) = self.rank_urls(base_url, stream.backup_urls());

        Ok(StreamRep {
            id: stream.id,
            bandwidth: stream.bandwidth,
            codecs: stream.codecs.clone(),
            mime_type: stream.mime_type().to_string(),
            width: stream.width.filter(|_| is_video),
            height: stream.height.filter(|_| is_video),
            frame_rate: stream
                .frame_rate()
                .filter(|_| is_video)
                .map(str::to_string),
            url,
            mirrors,
            initialization: segment_base
                .initialization
                .parse::<ByteRange>()
                .map_err(|e| e.to_string())?,
            index_range: segment_base
                .index_range
                .parse::<ByteRange>()
                .map_err(|e| e.to_string())?,
        })
    }

    /// Orders candidates: reliable hosts first, then lexicographically.
    fn rank_urls(&self, primary: &str, backups: &[String]) -> (String, Vec<String>) {
        let mut candidates = std::iter::once(primary.to_string())
            .chain(backups.iter().filter(|u| !u.is_empty()).cloned())
            .collect::<Vec<_>>();
        candidates.sort_by_cached_key(|url| (self.is_unreliable(url), url.clone()));
        candidates.dedup();

        let best = candidates.remove(0);
        (best, candidates)
    }

    fn is_unreliable(&self, url: &str) -> bool {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string());
        self.config
            .unreliable_cdn_hosts
            .iter()
            .any(|h| host.contains(h.as_str()))
    }

    /// Primary file, preferring its backup URL when one is given.
    fn package_durl(durl: &[Durl]) -> Option<PlayableMedia> {
        let first = durl.first()?;
        let url = first
            .backup_url
            .as_deref()
            .and_then(|b| b.iter().find(|u| !u.is_empty()))
            .unwrap_or(&first.url);

        if url.is_empty() {
            return None;
        }
        Some(PlayableMedia::SingleUrl { url: url.clone() })
    }
}

#[async_trait]
impl SourceResolver for Bilibili {
    fn get_extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn resolve(
        &self,
        content_id: &str,
        page_id: Option<u64>,
    ) -> Result<PlayableSource, ExtractorError> {
        let bvid = Self::extract_bvid(content_id)?;
        self.resolve_source(bvid, page_id).await
    }
}
