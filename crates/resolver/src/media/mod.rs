pub mod formats;
pub mod playable;

pub use formats::StreamFormat;
pub use playable::{ByteRange, PlayableMedia, PlayableSource, StreamRep, TrackKind};
