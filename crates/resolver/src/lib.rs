//! Resolution of an opaque content id into a playable source.
//!
//! The [`extractor`] module talks to the upstream API: it signs requests
//! (WBI), walks the quality/format tiers and normalizes whatever shape the
//! server answers with into a [`media::PlayableSource`].

pub mod extractor;
pub mod media;

pub use extractor::error::ExtractorError;
pub use extractor::platforms::bilibili::{Bilibili, ResolverConfig, WbiSigner};
pub use media::{ByteRange, PlayableMedia, PlayableSource, StreamRep};
