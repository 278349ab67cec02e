//! HLS bridge for byte-range addressed DASH representations.
//!
//! Players that only speak HLS cannot consume a separate video file and
//! audio file described by a DASH `SegmentBase`. [`PlaylistBridge`] answers
//! requests on a reserved URL prefix with synthesized playlists: a master
//! playlist tying the two tracks together and, per track, a media playlist
//! whose byte ranges come from the file's `sidx` box.
//!
//! ```rust,no_run
//! # async fn run(source: bilivod_resolver::PlayableSource) -> hls_bridge::Result<()> {
//! use std::sync::Arc;
//! use hls_bridge::{BridgeConfig, HttpRangeFetcher, PlaylistBridge};
//!
//! let config = BridgeConfig::default();
//! let fetcher = HttpRangeFetcher::new(reqwest::Client::new(), &config)?;
//! let bridge = PlaylistBridge::new(&source, Arc::new(fetcher), config)?;
//!
//! if let Some(playlist) = bridge.handle("custom-scheme://playlist/master.m3u8").await {
//!     println!("{}", playlist?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod playlist;

pub use bridge::{BridgeRequest, BridgeState, PlaylistBridge};
pub use config::{BridgeConfig, DEFAULT_BASE_URI};
pub use error::{BridgeError, Result};
pub use fetcher::{HttpRangeFetcher, RangeFetcher};
