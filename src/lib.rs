//! Tracktap - track metadata tapped off a progressive media download
//!
//! The playback path reads a media resource through a [`source::DataSource`].
//! Wrapping it in a [`source::TeeSource`] mirrors the bytes, without altering
//! or delaying them beyond bounded backpressure, into a
//! [`extraction::TrackExtraction`] session that parses the container's track
//! list on a separate task and delivers it once.
//!
//! Container parsing itself lives in the `tracktap-media` crate.

pub mod bridge;
pub mod config;
pub mod error;
pub mod extraction;
pub mod playback;
pub mod source;

pub use error::{Error, Result};
pub use extraction::{TrackExtraction, TrackListener};
pub use source::{DataSource, FileSource, MemorySource, TeeSource};
pub use tracktap_media::{ParseResult, TrackKind, TrackRecord};
