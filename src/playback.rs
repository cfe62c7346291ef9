//! Simulated playback read loop.
//!
//! Stands in for the media pipeline: opens a source at byte 0 and reads it
//! to the end in fixed-size chunks, discarding the bytes.

use std::io::Write;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::config::SourceConfig;
use crate::source::DataSource;
use crate::Result;

/// Outcome of a playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Length reported by the source when opened, if known.
    pub reported_len: Option<u64>,
    /// Bytes the playback path consumed.
    pub bytes_read: u64,
}

/// Read `source` from the start into `sink` until end of stream.
///
/// The source is closed afterwards, also on error.
pub fn play<S, W>(source: &mut S, sink: &mut W, config: &SourceConfig) -> Result<PlaybackStats>
where
    S: DataSource + ?Sized,
    W: Write + ?Sized,
{
    let outcome = read_all(source, sink, config);
    let closed = source.close();
    let stats = outcome?;
    closed?;
    Ok(stats)
}

fn read_all<S, W>(source: &mut S, sink: &mut W, config: &SourceConfig) -> Result<PlaybackStats>
where
    S: DataSource + ?Sized,
    W: Write + ?Sized,
{
    let reported_len = source.open(0)?;
    debug!(len = ?reported_len, chunk = config.read_chunk_size, "Playback started");

    let throttle = Duration::from_millis(config.throttle_ms);
    let mut buf = vec![0u8; config.read_chunk_size.max(1)];
    let mut bytes_read = 0u64;
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])?;
        bytes_read += n as u64;
        if !throttle.is_zero() {
            thread::sleep(throttle);
        }
    }

    debug!(bytes = bytes_read, "Playback finished");
    Ok(PlaybackStats {
        reported_len,
        bytes_read,
    })
}
