use std::fmt::Display;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

/// `qn` values understood by the play-url endpoint.
#[derive(Debug, PartialEq, Eq, Copy, Clone, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u32)]
pub enum BilibiliQuality {
    // 360P 流畅
    Smooth = 16,
    // 480P 清晰
    Clear = 32,
    // 720P 高清
    High = 64,
    // 1080P 高清
    FullHd = 80,
    // 1080P+ 高码率
    FullHdPlus = 112,
    // 1080P60 高帧率
    FullHd60 = 116,
    // 4K 超清
    FourK = 120,
    // HDR 真彩
    Hdr = 125,
    // 杜比视界
    DolbyVision = 126,
    // 8K 超高清
    EightK = 127,
}

impl Display for BilibiliQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", *self as u32)
    }
}

/// `fnval` bit set asking for progressive MP4.
pub const FNVAL_MP4: u32 = 1;
/// `fnval` bit asking for DASH.
pub const FNVAL_DASH: u32 = 16;
/// DASH plus HDR, 4K, Dolby audio, Dolby Vision, 8K and AV1 bits.
pub const FNVAL_DASH_ALL: u32 = 4048;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformHint {
    Pc,
    /// Serves progressive files that do not require a Referer on the CDN.
    Html5,
}

impl PlatformHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformHint::Pc => "pc",
            PlatformHint::Html5 => "html5",
        }
    }
}

/// One step of the quality/format cascade.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub struct PlayTier {
    pub quality: BilibiliQuality,
    pub fnval: u32,
    pub platform: PlatformHint,
}

impl PlayTier {
    pub const fn new(quality: BilibiliQuality, fnval: u32, platform: PlatformHint) -> Self {
        Self {
            quality,
            fnval,
            platform,
        }
    }

    pub fn is_segmented(&self) -> bool {
        self.fnval & FNVAL_DASH != 0
    }
}

impl Display for PlayTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "qn={}/fnval={}/{}",
            self.quality,
            self.fnval,
            self.platform.as_str()
        )
    }
}

/// Most to least desirable. Segmented tiers first, a low single-file tier last.
pub const DEFAULT_TIERS: [PlayTier; 4] = [
    PlayTier::new(BilibiliQuality::EightK, FNVAL_DASH_ALL, PlatformHint::Pc),
    PlayTier::new(BilibiliQuality::FullHd, FNVAL_DASH, PlatformHint::Pc),
    PlayTier::new(BilibiliQuality::High, FNVAL_MP4, PlatformHint::Html5),
    PlayTier::new(BilibiliQuality::Smooth, FNVAL_MP4, PlatformHint::Html5),
];
