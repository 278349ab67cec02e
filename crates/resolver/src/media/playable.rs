use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::extractor::error::ExtractorError;
use crate::media::StreamFormat;

/// Byte range as written by the server (`"start-end"`, both ends inclusive).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// `end == u64::MAX` is rejected so the length always fits in a `u64`.
    pub fn new(start: u64, end: u64) -> Result<Self, ExtractorError> {
        if end < start || end == u64::MAX {
            return Err(ExtractorError::InvalidByteRange(format!("{start}-{end}")));
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered, at least one.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for an HTTP `Range` header.
    pub fn http_range(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    /// `<length>@<offset>` form used by HLS byte-range tags.
    pub fn playlist_range(&self) -> String {
        format!("{}@{}", self.length(), self.start)
    }
}

impl FromStr for ByteRange {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ExtractorError::InvalidByteRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let start = start.trim().parse::<u64>().map_err(|_| invalid())?;
        let end = end.trim().parse::<u64>().map_err(|_| invalid())?;
        Self::new(start, end).map_err(|_| invalid())
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackKind::Video => "video",
            TrackKind::Audio => "audio",
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One segmented representation (a single audio or video track in one file).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StreamRep {
    // quality id of the representation, e.g. 80 for 1080p or 30280 for 192k audio
    pub id: u32,
    pub bandwidth: u64,
    pub codecs: String,
    pub mime_type: String,
    // video only
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<String>,
    /// Best ranked candidate URL.
    pub url: String,
    /// Remaining candidates, best first.
    pub mirrors: Vec<String>,
    pub initialization: ByteRange,
    pub index_range: ByteRange,
}

impl StreamRep {
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.width.zip(self.height)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayableMedia {
    /// One progressive file, directly playable.
    SingleUrl { url: String },
    /// Separate video and audio representations; needs the playlist bridge.
    SegmentedPair { video: StreamRep, audio: StreamRep },
}

/// Result of a successful resolution. Immutable once built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayableSource {
    pub media: PlayableMedia,
    /// Quality id the server actually selected.
    pub quality: u32,
    /// Container label reported by the server.
    pub format: String,
    pub stream_format: StreamFormat,
    /// Position of the tier that produced this source in the cascade.
    pub tier_index: usize,
    pub duration_ms: Option<u64>,
}

impl PlayableSource {
    pub fn is_segmented(&self) -> bool {
        matches!(self.media, PlayableMedia::SegmentedPair { .. })
    }

    pub fn single_url(&self) -> Option<&str> {
        match &self.media {
            PlayableMedia::SingleUrl { url } => Some(url),
            PlayableMedia::SegmentedPair { .. } => None,
        }
    }

    pub fn track(&self, kind: TrackKind) -> Option<&StreamRep> {
        match (&self.media, kind) {
            (PlayableMedia::SegmentedPair { video, .. }, TrackKind::Video) => Some(video),
            (PlayableMedia::SegmentedPair { audio, .. }, TrackKind::Audio) => Some(audio),
            (PlayableMedia::SingleUrl { .. }, _) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_parse() {
        let range: ByteRange = "0-927".parse().unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 927 });
        assert_eq!(range.length(), 928);
        assert_eq!(range.playlist_range(), "928@0");
        assert_eq!(range.http_range(), "bytes=0-927");
        assert_eq!(range.to_string(), "0-927");

        let range: ByteRange = "928-2951".parse().unwrap();
        assert_eq!(range.playlist_range(), "2024@928");
    }

    #[test]
    fn test_byte_range_rejects_malformed_text() {
        for text in [
            "",
            "12",
            "a-b",
            "10-",
            "-10",
            "10-5",
            "1-2-3",
            "-1-5",
            "0-18446744073709551615",
            "18446744073709551615-18446744073709551615",
        ] {
            assert!(
                text.parse::<ByteRange>().is_err(),
                "accepted {text:?}"
            );
        }

        assert!(ByteRange::new(0, u64::MAX).is_err());
        let widest = ByteRange::new(0, u64::MAX - 1).unwrap();
        assert_eq!(widest.length(), u64::MAX);
    }

    #[test]
    fn test_media_serialization_is_tagged() {
        let source = PlayableSource {
            media: PlayableMedia::SingleUrl {
                url: "https://example.com/a.mp4".to_string(),
            },
            quality: 64,
            format: "mp4720".to_string(),
            stream_format: StreamFormat::Mp4,
            tier_index: 2,
            duration_ms: None,
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["media"]["kind"], "single_url");
        assert_eq!(json["stream_format"], "mp4");
        assert_eq!(source.single_url(), Some("https://example.com/a.mp4"));
        assert!(source.track(TrackKind::Video).is_none());
    }
}
