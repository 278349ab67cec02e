mod builder;
mod models;
mod tiers;
mod wbi;

pub use builder::{ApiEndpoints, Bilibili, ResolverConfig, URL_REGEX};
pub use models::PageInfo;
pub use tiers::{
    BilibiliQuality, DEFAULT_TIERS, FNVAL_DASH, FNVAL_DASH_ALL, FNVAL_MP4, PlatformHint, PlayTier,
};
pub use wbi::{MIXIN_KEY_ENC_TAB, MixinKey, SignedParams, WbiSigner, sign_with_key};
