use std::sync::Arc;

use bilivod_resolver::media::TrackKind;
use bilivod_resolver::{PlayableMedia, PlayableSource, StreamRep};
use parking_lot::Mutex;
use sidx::SegmentIndex;
use tracing::{debug, error, warn};

use crate::cache::IndexCache;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::fetcher::RangeFetcher;
use crate::playlist::{MasterPlaylist, MediaPlaylist};

/// One of the three virtual playlists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeRequest {
    Master,
    Media(TrackKind),
}

impl BridgeRequest {
    /// Maps a playlist file name (`master.m3u8`, `video.m3u8`, `audio.m3u8`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "master.m3u8" => Some(Self::Master),
            "video.m3u8" => Some(Self::Media(TrackKind::Video)),
            "audio.m3u8" => Some(Self::Media(TrackKind::Audio)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Master => "master.m3u8",
            Self::Media(TrackKind::Video) => "video.m3u8",
            Self::Media(TrackKind::Audio) => "audio.m3u8",
        }
    }
}

/// What the bridge last did. Failures never stick: the next request moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    #[default]
    Idle,
    ServingMaster,
    ServingMediaPlaylist(TrackKind),
    Failed,
}

/// Serves HLS playlists for one segmented video+audio pair.
///
/// The player asks for `<base>/master.m3u8` and follows the references to
/// the two media playlists. Media playlists are built from each
/// representation's `sidx` box, fetched once and kept until
/// [`clear_cache`](Self::clear_cache) or drop.
pub struct PlaylistBridge {
    video: StreamRep,
    audio: StreamRep,
    config: BridgeConfig,
    fetcher: Arc<dyn RangeFetcher>,
    cache: IndexCache,
    state: Mutex<BridgeState>,
}

impl PlaylistBridge {
    pub fn new(
        source: &PlayableSource,
        fetcher: Arc<dyn RangeFetcher>,
        config: BridgeConfig,
    ) -> Result<Self> {
        let PlayableMedia::SegmentedPair { video, audio } = &source.media else {
            return Err(BridgeError::NotSegmented);
        };

        Ok(Self {
            video: video.clone(),
            audio: audio.clone(),
            config,
            fetcher,
            cache: IndexCache::new(),
            state: Mutex::new(BridgeState::Idle),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> BridgeState {
        *self.state.lock()
    }

    pub fn uri(&self, request: BridgeRequest) -> String {
        format!("{}/{}", self.config.base_uri, request.name())
    }

    pub fn master_uri(&self) -> String {
        self.uri(BridgeRequest::Master)
    }

    /// Classifies `url`; `None` means the bridge does not own it.
    pub fn route(&self, url: &str) -> Option<BridgeRequest> {
        let rest = url.strip_prefix(self.config.base_uri.as_str())?;
        let name = rest.strip_prefix('/')?;
        let name = name.split(['?', '#']).next().unwrap_or(name);
        BridgeRequest::from_name(name)
    }

    /// Answers an intercepted URL, or returns `None` so the caller can
    /// load it normally.
    pub async fn handle(&self, url: &str) -> Option<Result<String>> {
        let request = self.route(url)?;
        Some(self.serve(request).await)
    }

    pub async fn serve(&self, request: BridgeRequest) -> Result<String> {
        let result = match request {
            BridgeRequest::Master => {
                self.set_state(BridgeState::ServingMaster);
                Ok(self.master_playlist())
            }
            BridgeRequest::Media(kind) => {
                self.set_state(BridgeState::ServingMediaPlaylist(kind));
                self.media_playlist(kind).await
            }
        };

        if let Err(e) = &result {
            error!("playlist request {} failed: {}", request.name(), e);
            self.set_state(BridgeState::Failed);
        }
        result
    }

    pub fn master_playlist(&self) -> String {
        MasterPlaylist {
            video: &self.video,
            audio: &self.audio,
            video_uri: &self.uri(BridgeRequest::Media(TrackKind::Video)),
            audio_uri: &self.uri(BridgeRequest::Media(TrackKind::Audio)),
        }
        .to_string()
    }

    pub async fn media_playlist(&self, kind: TrackKind) -> Result<String> {
        let rep = self.rep(kind);
        let index = self.segment_index(rep).await?;

        if index.first_offset != 0 {
            warn!(
                "{} sidx has first_offset {}, segments are assumed to follow the index",
                kind, index.first_offset
            );
        }
        debug!(
            "{} playlist: {} segments, timescale {}",
            kind,
            index.segments.len(),
            index.timescale
        );

        Ok(MediaPlaylist::new(rep, &index)?.to_string())
    }

    /// Drops every cached index; later requests fetch again.
    pub fn clear_cache(&self) {
        self.cache.clear();
        self.set_state(BridgeState::Idle);
    }

    fn rep(&self, kind: TrackKind) -> &StreamRep {
        match kind {
            TrackKind::Video => &self.video,
            TrackKind::Audio => &self.audio,
        }
    }

    async fn segment_index(&self, rep: &StreamRep) -> Result<SegmentIndex> {
        let bytes = self
            .cache
            .get_or_fetch(&rep.url, rep.index_range, self.fetcher.as_ref())
            .await?;
        Ok(SegmentIndex::parse(&bytes)?)
    }

    fn set_state(&self, state: BridgeState) {
        *self.state.lock() = state;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bilivod_resolver::ByteRange;
    use bilivod_resolver::media::StreamFormat;
    use reqwest::Client;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::fetcher::HttpRangeFetcher;

    /// sidx v0 box, timescale 1000, references given as (size, duration).
    fn sidx_box(references: &[(u32, u32)]) -> Vec<u8> {
        let size = 32 + 12 * references.len() as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&size.to_be_bytes());
        buf.extend_from_slice(b"sidx");
        buf.extend_from_slice(&0u32.to_be_bytes()); // version + flags
        buf.extend_from_slice(&1u32.to_be_bytes()); // reference id
        buf.extend_from_slice(&1000u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes()); // earliest presentation time
        buf.extend_from_slice(&0u32.to_be_bytes()); // first offset
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&(references.len() as u16).to_be_bytes());
        for &(size, duration) in references {
            buf.extend_from_slice(&(size & 0x7fff_ffff).to_be_bytes());
            buf.extend_from_slice(&duration.to_be_bytes());
            buf.extend_from_slice(&0x9000_0000u32.to_be_bytes());
        }
        buf
    }

    fn rep(url: String, codecs: &str, index_end: u64) -> StreamRep {
        StreamRep {
            id: 80,
            bandwidth: 1_000_000,
            codecs: codecs.to_string(),
            mime_type: "video/mp4".to_string(),
            width: Some(1920),
            height: Some(1080),
            frame_rate: None,
            url,
            mirrors: vec![],
            initialization: ByteRange::new(0, 999).unwrap(),
            index_range: ByteRange::new(1000, index_end).unwrap(),
        }
    }

    fn source(video: StreamRep, audio: StreamRep) -> PlayableSource {
        PlayableSource {
            media: PlayableMedia::SegmentedPair { video, audio },
            quality: 80,
            format: "flv".to_string(),
            stream_format: StreamFormat::Dash,
            tier_index: 0,
            duration_ms: Some(4500),
        }
    }

    fn bridge(server: &MockServer, audio_path: &str) -> PlaylistBridge {
        let sidx_len = sidx_box(&[(1000, 2000), (1200, 2500)]).len() as u64;
        let video = rep(format!("{}/video.m4s", server.uri()), "avc1.640032", 999 + sidx_len);
        let audio = rep(format!("{}{audio_path}", server.uri()), "mp4a.40.2", 999 + sidx_len);
        let config = BridgeConfig::default();
        let fetcher = HttpRangeFetcher::new(Client::new(), &config).unwrap();
        PlaylistBridge::new(&source(video, audio), Arc::new(fetcher), config).unwrap()
    }

    async fn mount_sidx(server: &MockServer, at: &str, expected_fetches: u64) {
        let body = sidx_box(&[(1000, 2000), (1200, 2500)]);
        Mock::given(method("GET"))
            .and(path(at))
            .and(header("range", "bytes=1000-1055"))
            .respond_with(
                ResponseTemplate::new(206)
                    .set_body_bytes(body)
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(expected_fetches)
            .mount(server)
            .await;
    }

    #[test]
    fn test_route() {
        let config = BridgeConfig::default();
        let fetcher = HttpRangeFetcher::new(Client::new(), &config).unwrap();
        let video = rep("https://a/v.m4s".to_string(), "avc1.640032", 1055);
        let audio = rep("https://a/a.m4s".to_string(), "mp4a.40.2", 1055);
        let bridge = PlaylistBridge::new(&source(video, audio), Arc::new(fetcher), config).unwrap();

        assert_eq!(
            bridge.route("custom-scheme://playlist/master.m3u8"),
            Some(BridgeRequest::Master)
        );
        assert_eq!(
            bridge.route("custom-scheme://playlist/audio.m3u8?t=1"),
            Some(BridgeRequest::Media(TrackKind::Audio))
        );
        assert_eq!(bridge.route("custom-scheme://playlist/other.m3u8"), None);
        assert_eq!(bridge.route("custom-scheme://playlistvideo.m3u8"), None);
        assert_eq!(bridge.route("https://a/v.m4s"), None);
        assert_eq!(bridge.master_uri(), "custom-scheme://playlist/master.m3u8");
    }

    #[test]
    fn test_single_file_source_is_rejected() {
        let source = PlayableSource {
            media: PlayableMedia::SingleUrl {
                url: "https://a/v.mp4".to_string(),
            },
            quality: 64,
            format: "mp4720".to_string(),
            stream_format: StreamFormat::Mp4,
            tier_index: 2,
            duration_ms: None,
        };
        let config = BridgeConfig::default();
        let fetcher = HttpRangeFetcher::new(Client::new(), &config).unwrap();
        assert!(matches!(
            PlaylistBridge::new(&source, Arc::new(fetcher), config),
            Err(BridgeError::NotSegmented)
        ));
    }

    #[tokio::test]
    async fn test_media_playlist_from_sidx() {
        let server = MockServer::start().await;
        mount_sidx(&server, "/video.m4s", 1).await;
        let bridge = bridge(&server, "/audio.m4s");

        let text = bridge
            .handle("custom-scheme://playlist/video.m3u8")
            .await
            .unwrap()
            .unwrap();
        assert!(text.contains("#EXT-X-TARGETDURATION:4\n"));
        assert!(text.contains("#EXTINF:2.000,\n#EXT-X-BYTERANGE:1000@1056\n"));
        assert!(text.contains("#EXTINF:2.500,\n#EXT-X-BYTERANGE:1200@2056\n"));
        assert_eq!(bridge.state(), BridgeState::ServingMediaPlaylist(TrackKind::Video));

        let parsed = m3u8_rs::parse_playlist_res(text.as_bytes()).unwrap();
        let m3u8_rs::Playlist::MediaPlaylist(media) = parsed else {
            panic!("expected a media playlist");
        };
        assert!(media.end_list);
        assert_eq!(media.segments.len(), 2);
        let range = media.segments[1].byte_range.as_ref().unwrap();
        assert_eq!((range.length, range.offset), (1200, Some(2056)));
        assert!(media.segments.iter().all(|s| s.uri.ends_with("/video.m4s")));

        // served from cache
        bridge.media_playlist(TrackKind::Video).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let server = MockServer::start().await;
        mount_sidx(&server, "/both.m4s", 1).await;
        let bridge = bridge(&server, "/both.m4s");
        // same resource for both tracks
        let bridge = PlaylistBridge {
            video: StreamRep {
                url: bridge.audio.url.clone(),
                ..bridge.video.clone()
            },
            ..bridge
        };

        let (video, audio) = tokio::join!(
            bridge.handle("custom-scheme://playlist/video.m3u8"),
            bridge.handle("custom-scheme://playlist/audio.m3u8"),
        );
        assert!(video.unwrap().is_ok());
        assert!(audio.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_failure_is_scoped_to_one_request() {
        let server = MockServer::start().await;
        mount_sidx(&server, "/video.m4s", 1).await;
        Mock::given(method("GET"))
            .and(path("/missing.m4s"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let bridge = bridge(&server, "/missing.m4s");

        let err = bridge.media_playlist(TrackKind::Audio).await.unwrap_err();
        assert!(matches!(err, BridgeError::RangeFetchFailure { .. }));

        let err = bridge
            .handle("custom-scheme://playlist/audio.m3u8")
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, BridgeError::RangeFetchFailure { .. }));
        assert_eq!(bridge.state(), BridgeState::Failed);

        assert!(bridge.media_playlist(TrackKind::Video).await.is_ok());
        let master = bridge.handle(&bridge.master_uri()).await.unwrap().unwrap();
        assert!(master.contains("AUDIO=\"audio\""));
        assert_eq!(bridge.state(), BridgeState::ServingMaster);
    }

    #[tokio::test]
    async fn test_malformed_index() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/video.m4s"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(vec![0u8; 56]))
            .mount(&server)
            .await;
        let bridge = bridge(&server, "/audio.m4s");

        let err = bridge.media_playlist(TrackKind::Video).await.unwrap_err();
        assert!(matches!(err, BridgeError::MalformedSegmentIndex(_)));
    }

    #[tokio::test]
    async fn test_clear_cache_refetches() {
        let server = MockServer::start().await;
        mount_sidx(&server, "/video.m4s", 2).await;
        let bridge = bridge(&server, "/audio.m4s");

        bridge.media_playlist(TrackKind::Video).await.unwrap();
        bridge.media_playlist(TrackKind::Video).await.unwrap();
        bridge.clear_cache();
        assert_eq!(bridge.state(), BridgeState::Idle);
        bridge.media_playlist(TrackKind::Video).await.unwrap();
    }

    #[tokio::test]
    async fn test_other_urls_pass_through() {
        let server = MockServer::start().await;
        let bridge = bridge(&server, "/audio.m4s");
        assert!(bridge.handle("https://www.bilibili.com/").await.is_none());
        assert!(bridge.handle("custom-scheme://playlist/").await.is_none());
        assert_eq!(bridge.state(), BridgeState::Idle);
    }
}
