//! Text rendering of the synthesized playlists.

use std::fmt;

use bilivod_resolver::StreamRep;
use sidx::SegmentIndex;

use crate::error::{BridgeError, Result};

const HLS_VERSION: u8 = 6;
const AUDIO_GROUP: &str = "audio";

/// Playback codec and `SUPPLEMENTAL-CODECS` value for a video codec string.
///
/// Dolby Vision profiles 8.x are announced as their HEVC base layer so that
/// players without Dolby Vision support still pick the variant.
pub fn remap_video_codec(codecs: &str) -> (&str, Option<String>) {
    match codecs {
        "dvh1.08.07" | "dvh1.08.03" => ("hvc1.2.4.L153.b0", Some(format!("{codecs}/db4h"))),
        "dvh1.08.06" => ("hvc1.2.4.L150", Some(format!("{codecs}/db1p"))),
        other => (other, None),
    }
}

/// One audio rendition group plus one video variant.
pub struct MasterPlaylist<'a> {
    pub video: &'a StreamRep,
    pub audio: &'a StreamRep,
    pub video_uri: &'a str,
    pub audio_uri: &'a str,
}

impl fmt::Display for MasterPlaylist<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (codec, supplemental) = remap_video_codec(&self.video.codecs);

        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:{HLS_VERSION}")?;
        writeln!(f, "#EXT-X-INDEPENDENT-SEGMENTS")?;
        writeln!(
            f,
            "#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"{AUDIO_GROUP}\",NAME=\"Audio\",DEFAULT=YES,AUTOSELECT=YES,URI=\"{}\"",
            self.audio_uri
        )?;

        write!(
            f,
            "#EXT-X-STREAM-INF:BANDWIDTH={},CODECS=\"{},{}\"",
            self.video.bandwidth + self.audio.bandwidth,
            codec,
            self.audio.codecs
        )?;
        if let Some(supplemental) = supplemental {
            write!(f, ",SUPPLEMENTAL-CODECS=\"{supplemental}\"")?;
        }
        if let Some((width, height)) = self.video.resolution() {
            write!(f, ",RESOLUTION={width}x{height}")?;
        }
        if let Some(rate) = self
            .video
            .frame_rate
            .as_deref()
            .and_then(|r| r.parse::<f64>().ok())
        {
            write!(f, ",FRAME-RATE={rate:.3}")?;
        }
        writeln!(f, ",AUDIO=\"{AUDIO_GROUP}\"")?;
        writeln!(f, "{}", self.video_uri)
    }
}

/// Byte-range media playlist for one representation.
///
/// Segments follow the index box directly: the first one starts at
/// `index_range.end + 1` and each next one where the previous ended.
pub struct MediaPlaylist<'a> {
    rep: &'a StreamRep,
    index: &'a SegmentIndex,
    offsets: Vec<u64>,
}

impl<'a> MediaPlaylist<'a> {
    /// Fails when a segment would start or end past `u64::MAX`.
    pub fn new(rep: &'a StreamRep, index: &'a SegmentIndex) -> Result<Self> {
        let overflow = || BridgeError::SegmentOffsetOverflow {
            url: rep.url.clone(),
        };

        let mut next = rep.index_range.end.checked_add(1).ok_or_else(overflow)?;
        let mut offsets = Vec::with_capacity(index.segments.len());
        for segment in &index.segments {
            offsets.push(next);
            next = next
                .checked_add(u64::from(segment.size))
                .ok_or_else(overflow)?;
        }

        Ok(Self {
            rep,
            index,
            offsets,
        })
    }
}

impl fmt::Display for MediaPlaylist<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            rep,
            index,
            offsets,
        } = self;

        writeln!(f, "#EXTM3U")?;
        writeln!(f, "#EXT-X-VERSION:{HLS_VERSION}")?;
        writeln!(f, "#EXT-X-TARGETDURATION:{}", index.max_segment_duration())?;
        writeln!(f, "#EXT-X-PLAYLIST-TYPE:VOD")?;
        writeln!(
            f,
            "#EXT-X-MAP:URI=\"{}\",BYTERANGE=\"{}\"",
            rep.url,
            rep.initialization.playlist_range()
        )?;

        for (segment, offset) in index.segments.iter().zip(offsets) {
            writeln!(f, "#EXTINF:{:.3},", index.duration_secs(segment))?;
            writeln!(f, "#EXT-X-BYTERANGE:{}@{}", segment.size, offset)?;
            writeln!(f, "{}", rep.url)?;
        }

        write!(f, "#EXT-X-ENDLIST")
    }
}
