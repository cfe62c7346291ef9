//! Synthetic container builders shared by the integration tests.

#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use tracktap_media::ebml::ids;
use tracktap_media::mp4::encode_language;

/// Encode an EBML element with the shortest ID and a 1- or 8-byte size.
pub fn ebml_element(id: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(payload.len() + 12);
    let id_bytes = id.to_be_bytes();
    let skip = id_bytes.iter().position(|&b| b != 0).unwrap_or(3);
    buf.put_slice(&id_bytes[skip..]);
    if payload.len() < 0x7F {
        buf.put_u8(0x80 | payload.len() as u8);
    } else {
        buf.put_u8(0x01);
        buf.put_slice(&(payload.len() as u64).to_be_bytes()[1..]);
    }
    buf.put_slice(payload);
    buf.to_vec()
}

pub struct MkvTrack<'a> {
    pub number: u8,
    pub track_type: u8,
    pub name: Option<&'a str>,
    pub language: Option<&'a str>,
}

pub fn mkv_track_entry(track: &MkvTrack<'_>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend(ebml_element(ids::TRACK_NUMBER, &[track.number]));
    body.extend(ebml_element(ids::TRACK_UID, &[0xCA, 0xFE, track.number]));
    body.extend(ebml_element(ids::TRACK_TYPE, &[track.track_type]));
    // CodecID, skipped by the walker
    body.extend(ebml_element(0x86, b"V_MPEG4/ISO/AVC"));
    if let Some(name) = track.name {
        body.extend(ebml_element(ids::NAME, name.as_bytes()));
    }
    if let Some(language) = track.language {
        body.extend(ebml_element(ids::LANGUAGE, language.as_bytes()));
    }
    ebml_element(ids::TRACK_ENTRY, &body)
}

/// A Matroska file: EBML header, then a Segment holding Info, Tracks and a
/// Cluster of `cluster_len` bytes.
pub fn matroska(tracks: &[MkvTrack<'_>], cluster_len: usize) -> Vec<u8> {
    let header = [
        ebml_element(0x4286, &[1]),
        ebml_element(0x4282, b"matroska"),
    ]
    .concat();
    let mut data = ebml_element(ids::EBML, &header);

    let entries: Vec<u8> = tracks.iter().flat_map(mkv_track_entry).collect();
    let segment = [
        ebml_element(0x1549_A966, &ebml_element(0x2AD7B1, &[0x0F, 0x42, 0x40])),
        ebml_element(ids::TRACKS, &entries),
        ebml_element(0x1F43_B675, &vec![0u8; cluster_len]),
    ]
    .concat();
    data.extend(ebml_element(ids::SEGMENT, &segment));
    data
}

pub fn mp4_atom(atom_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(8 + body.len());
    buf.put_u32(8 + body.len() as u32);
    buf.put_slice(atom_type);
    buf.put_slice(body);
    buf.to_vec()
}

pub struct Mp4Track<'a> {
    pub track_id: u32,
    pub handler: &'a [u8; 4],
    pub language: &'a str,
    pub name: Option<&'a [u8]>,
}

pub fn mp4_trak(track: &Mp4Track<'_>) -> Vec<u8> {
    let mut tkhd = BytesMut::new();
    tkhd.put_u32(0x0000_0003);
    tkhd.put_u32(0);
    tkhd.put_u32(0);
    tkhd.put_u32(track.track_id);
    tkhd.put_slice(&[0u8; 68]);

    let mut mdhd = BytesMut::new();
    mdhd.put_u32(0);
    mdhd.put_u32(0);
    mdhd.put_u32(0);
    mdhd.put_u32(90_000);
    mdhd.put_u32(0);
    mdhd.put_u16(encode_language(track.language).unwrap_or(0));
    mdhd.put_u16(0);

    let mut hdlr = BytesMut::new();
    hdlr.put_u32(0);
    hdlr.put_u32(0);
    hdlr.put_slice(track.handler);
    hdlr.put_slice(&[0u8; 12]);
    hdlr.put_u8(0);

    let mdia = [
        mp4_atom(b"mdhd", &mdhd),
        mp4_atom(b"hdlr", &hdlr),
        mp4_atom(b"minf", &[0u8; 48]),
    ]
    .concat();

    let mut children = [mp4_atom(b"tkhd", &tkhd), mp4_atom(b"mdia", &mdia)].concat();
    if let Some(name) = track.name {
        children.extend(mp4_atom(b"udta", &mp4_atom(b"name", name)));
    }
    mp4_atom(b"trak", &children)
}

/// An MP4 file: ftyp, moov with the given tracks, then an mdat of
/// `mdat_len` bytes.
pub fn mp4(tracks: &[Mp4Track<'_>], mdat_len: usize) -> Vec<u8> {
    let mut data = mp4_atom(b"ftyp", b"isom\0\0\x02\0isomiso2avc1mp41");
    let mut moov = mp4_atom(b"mvhd", &[0u8; 100]);
    for track in tracks {
        moov.extend(mp4_trak(track));
    }
    data.extend(mp4_atom(b"moov", &moov));
    data.extend(mp4_atom(b"mdat", &vec![0u8; mdat_len]));
    data
}
