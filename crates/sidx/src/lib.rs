//! A pure-rust decoder for the ISO-BMFF segment index box (`sidx`).
//!
//! The segment index maps byte ranges of a fragmented MP4 file to
//! time-addressable segments. This crate only decodes the box; it knows
//! nothing about networking or playlists.
//!
//! # Examples
//!
//! ```rust
//! use sidx::SegmentIndex;
//!
//! // a buffer that is too short never yields a partial index
//! assert!(SegmentIndex::decode(&[0, 0, 0, 44, b's', b'i', b'd', b'x']).is_none());
//! ```
#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(unsafe_code)]

mod error;
mod index;

pub use crate::error::SidxError;
pub use crate::index::{SIDX_BOX_TYPE, SegmentEntry, SegmentIndex};
