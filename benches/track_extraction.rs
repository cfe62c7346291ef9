//! Benchmarks for track extraction
//!
//! Measures the container walkers over synthetic files and the bridge's
//! cross-thread throughput.

#[path = "../crates/tracktap-media/tests/common/mod.rs"]
mod common;

use common::{matroska, mp4, mp4_atom, MkvTrack, Mp4Track};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::{Cursor, Read};
use std::thread;
use tracktap::bridge::{self, StreamBudget};
use tracktap_media::extract_tracks;

fn mkv_with_tracks(count: u8) -> Vec<u8> {
    let tracks: Vec<MkvTrack<'_>> = (1..=count)
        .map(|number| MkvTrack {
            number,
            track_type: if number == 1 { 1 } else { 2 },
            name: Some("Track"),
            language: Some("eng"),
        })
        .collect();
    matroska(&tracks, 4096)
}

fn mp4_with_tracks(count: u32, mdat_first: usize) -> Vec<u8> {
    let tracks: Vec<Mp4Track<'_>> = (1..=count)
        .map(|track_id| Mp4Track {
            track_id,
            handler: if track_id == 1 { b"vide" } else { b"soun" },
            language: "eng",
            name: Some(b"Track".as_slice()),
        })
        .collect();
    let with_tracks = mp4(&tracks, 0);
    if mdat_first == 0 {
        return with_tracks;
    }

    let ftyp_len = u32::from_be_bytes([with_tracks[0], with_tracks[1], with_tracks[2], with_tracks[3]]) as usize;
    let mut data = with_tracks[..ftyp_len].to_vec();
    data.extend(mp4_atom(b"mdat", &vec![0u8; mdat_first]));
    data.extend_from_slice(&with_tracks[ftyp_len..]);
    data
}

fn bench_walkers(c: &mut Criterion) {
    let mut group = c.benchmark_group("walkers");

    for count in [2u8, 16] {
        let data = mkv_with_tracks(count);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("matroska", count), &data, |b, data| {
            b.iter(|| extract_tracks(Cursor::new(black_box(data.as_slice()))));
        });
    }

    for count in [2u32, 16] {
        let data = mp4_with_tracks(count, 0);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("mp4", count), &data, |b, data| {
            b.iter(|| extract_tracks(Cursor::new(black_box(data.as_slice()))));
        });
    }

    // moov behind 1 MiB of media data, which the walker skips
    let data = mp4_with_tracks(2, 1024 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_with_input(BenchmarkId::new("mp4_mdat_first", 2), &data, |b, data| {
        b.iter(|| extract_tracks(Cursor::new(black_box(data.as_slice()))));
    });

    group.finish();
}

fn bench_bridge(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge");
    let payload = vec![0xA5u8; 4 * 1024 * 1024];
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for chunk in [4096usize, 65536] {
        group.bench_with_input(BenchmarkId::new("offer_read", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let (writer, mut reader) = bridge::with_budget(StreamBudget {
                    buffer_capacity: StreamBudget::BUFFER_CAPACITY,
                    max_bytes: u64::MAX,
                });
                let consumer = thread::spawn(move || {
                    let mut buf = vec![0u8; 16 * 1024];
                    let mut total = 0usize;
                    loop {
                        match reader.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => total += n,
                        }
                    }
                    total
                });
                for part in payload.chunks(chunk) {
                    writer.offer(part);
                }
                writer.close();
                black_box(consumer.join().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_walkers, bench_bridge);
criterion_main!(benches);
