//! tracktap-media: track metadata extraction from Matroska and MP4 streams
//!
//! This crate reads track identity and label metadata (track id, name,
//! language, kind) from a container while it is still arriving. The input is
//! any [`std::io::Read`]; it is consumed strictly forward, irrelevant regions
//! are skipped without being buffered, and reading stops as soon as the track
//! list is complete.
//!
//! # Modules
//!
//! - `container` - format sniffing and walker dispatch
//! - `ebml` - EBML variable-length integer and element header decoding
//! - `mkv` - Matroska `Segment/Tracks/TrackEntry` walker
//! - `mp4` - ISO-BMFF `moov/trak` walker
//! - `track` - track records and the parse result
//!
//! # Example
//!
//! ```no_run
//! let file = std::fs::File::open("movie.mkv").unwrap();
//! let tracks = tracktap_media::extract_tracks(std::io::BufReader::new(file));
//! for track in &tracks {
//!     println!("{} {} {:?}", track.track_id, track.kind, track.name);
//! }
//! ```

pub mod container;
pub mod cursor;
pub mod ebml;
pub mod error;
pub mod mkv;
pub mod mp4;
pub mod track;

pub use container::{detect_container, extract_tracks, sniff, Container};
pub use error::{Error, Result};
pub use track::{ParseResult, TrackKind, TrackRecord};
