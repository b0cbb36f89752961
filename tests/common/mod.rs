//! Builders for synthetic box buffers used across the integration tests.
#![allow(dead_code)]

/// size + type + payload.
pub fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&((payload.len() as u32 + 8).to_be_bytes()));
    out.extend_from_slice(typ);
    out.extend_from_slice(payload);
    out
}

/// size + type + version + 24-bit flags + payload.
pub fn full_boxed(typ: &[u8; 4], version: u8, flags: u32, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![version, (flags >> 16) as u8, (flags >> 8) as u8, flags as u8];
    body.extend_from_slice(payload);
    boxed(typ, &body)
}

pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for p in parts {
        out.extend_from_slice(p);
    }
    out
}

pub fn ftyp() -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(b"isom"); // major_brand
    payload.extend_from_slice(&512u32.to_be_bytes()); // minor_version
    payload.extend_from_slice(b"isom"); // compatible
    payload.extend_from_slice(b"avc1");
    boxed(b"ftyp", &payload)
}

pub fn mvhd() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes()); // creation_time
    p.extend_from_slice(&0u32.to_be_bytes()); // modification_time
    p.extend_from_slice(&1000u32.to_be_bytes()); // timescale
    p.extend_from_slice(&5000u32.to_be_bytes()); // duration
    p.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    p.extend_from_slice(&0x0100u16.to_be_bytes()); // volume 1.0
    p.extend_from_slice(&[0u8; 10]); // reserved
    p.extend_from_slice(&identity_matrix());
    p.extend_from_slice(&[0u8; 24]); // pre_defined
    p.extend_from_slice(&3u32.to_be_bytes()); // next_track_id
    full_boxed(b"mvhd", 0, 0, &p)
}

pub fn identity_matrix() -> [u8; 36] {
    let mut m = [0u8; 36];
    m[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    m[16..20].copy_from_slice(&0x0001_0000u32.to_be_bytes());
    m[32..36].copy_from_slice(&0x4000_0000u32.to_be_bytes());
    m
}

pub fn tkhd(track_id: u32) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes()); // creation_time
    p.extend_from_slice(&0u32.to_be_bytes()); // modification_time
    p.extend_from_slice(&track_id.to_be_bytes());
    p.extend_from_slice(&[0u8; 4]); // reserved
    p.extend_from_slice(&5000u32.to_be_bytes()); // duration
    p.extend_from_slice(&[0u8; 8]); // reserved
    p.extend_from_slice(&0i16.to_be_bytes()); // layer
    p.extend_from_slice(&0i16.to_be_bytes()); // alternate_group
    p.extend_from_slice(&0u16.to_be_bytes()); // volume
    p.extend_from_slice(&[0u8; 2]); // reserved
    p.extend_from_slice(&identity_matrix());
    p.extend_from_slice(&(640u32 << 16).to_be_bytes()); // width 16.16
    p.extend_from_slice(&(360u32 << 16).to_be_bytes()); // height 16.16
    full_boxed(b"tkhd", 0, 7, &p)
}

pub fn mdhd() -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes()); // creation_time
    p.extend_from_slice(&0u32.to_be_bytes()); // modification_time
    p.extend_from_slice(&90000u32.to_be_bytes()); // timescale
    p.extend_from_slice(&450000u32.to_be_bytes()); // duration
    // "und" packed as three 5-bit letters
    let lang: u16 = ((21 << 10) | (14 << 5) | 4) as u16;
    p.extend_from_slice(&lang.to_be_bytes());
    p.extend_from_slice(&[0u8; 2]); // pre_defined
    full_boxed(b"mdhd", 0, 0, &p)
}

pub fn hdlr(handler: &[u8; 4], name: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 4]); // pre_defined
    p.extend_from_slice(handler);
    p.extend_from_slice(&[0u8; 12]); // reserved
    p.extend_from_slice(name.as_bytes());
    p.push(0);
    full_boxed(b"hdlr", 0, 0, &p)
}

pub fn dref_url_self_contained() -> Vec<u8> {
    // flag bit 0: media in the same file, no location field
    let url = full_boxed(b"url ", 0, 1, &[]);
    let mut p = Vec::new();
    p.extend_from_slice(&1u32.to_be_bytes()); // entry_count
    p.extend_from_slice(&url);
    full_boxed(b"dref", 0, 0, &p)
}

pub fn dinf() -> Vec<u8> {
    boxed(b"dinf", &dref_url_self_contained())
}

/// Counted fixed-stride table box: entry_count + raw rows.
pub fn table_box(typ: &[u8; 4], entry_count: u32, rows: &[u8]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&entry_count.to_be_bytes());
    p.extend_from_slice(rows);
    full_boxed(typ, 0, 0, &p)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut rows = Vec::new();
    for o in offsets {
        rows.extend_from_slice(&o.to_be_bytes());
    }
    table_box(b"stco", offsets.len() as u32, &rows)
}

pub fn stsz(sizes: &[u32]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&0u32.to_be_bytes()); // sample_size 0: per-sample table
    p.extend_from_slice(&(sizes.len() as u32).to_be_bytes());
    for s in sizes {
        p.extend_from_slice(&s.to_be_bytes());
    }
    full_boxed(b"stsz", 0, 0, &p)
}

pub fn avcc() -> Vec<u8> {
    let payload = [
        1,    // configuration_version
        0x64, // profile: High
        0x00, // compatibility
        0x28, // level 4.0
        0xFF, // reserved + NAL length size (4)
        0xE1, // reserved + 1 SPS
        0x00, 0x02, // SPS length
        0x67, 0x42, // SPS bytes
        0x01, // 1 PPS
        0x00, 0x02, // PPS length
        0x68, 0xCE, // PPS bytes
    ];
    boxed(b"avcC", &payload)
}

/// avc1 sample entry: 78-byte fixed part, then nested config boxes.
pub fn avc1(children: &[&[u8]]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]); // reserved
    p.extend_from_slice(&1u16.to_be_bytes()); // data_reference_index
    p.extend_from_slice(&0u16.to_be_bytes()); // version
    p.extend_from_slice(&0u16.to_be_bytes()); // revision
    p.extend_from_slice(&0u32.to_be_bytes()); // vendor
    p.extend_from_slice(&0u32.to_be_bytes()); // temporal_quality
    p.extend_from_slice(&0u32.to_be_bytes()); // spatial_quality
    p.extend_from_slice(&640u16.to_be_bytes()); // width
    p.extend_from_slice(&360u16.to_be_bytes()); // height
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // horiz_resolution 72dpi
    p.extend_from_slice(&0x0048_0000u32.to_be_bytes()); // vert_resolution
    p.extend_from_slice(&0u32.to_be_bytes()); // data_size
    p.extend_from_slice(&1u16.to_be_bytes()); // frame_count
    let mut name = [0u8; 32];
    name[0] = 5; // length-prefixed compressor name
    name[1..6].copy_from_slice(b"H.264");
    p.extend_from_slice(&name);
    p.extend_from_slice(&24u16.to_be_bytes()); // depth
    p.extend_from_slice(&0xFFFFu16.to_be_bytes()); // color_table_id
    for c in children {
        p.extend_from_slice(c);
    }
    boxed(b"avc1", &p)
}

/// mp4a sample entry: 28-byte fixed part, then nested config boxes.
pub fn mp4a(children: &[&[u8]]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&[0u8; 6]); // reserved
    p.extend_from_slice(&1u16.to_be_bytes()); // data_reference_index
    p.extend_from_slice(&0u16.to_be_bytes()); // version
    p.extend_from_slice(&0u16.to_be_bytes()); // revision
    p.extend_from_slice(&0u32.to_be_bytes()); // vendor
    p.extend_from_slice(&2u16.to_be_bytes()); // channel_count
    p.extend_from_slice(&16u16.to_be_bytes()); // sample_size
    p.extend_from_slice(&0i16.to_be_bytes()); // compression_id
    p.extend_from_slice(&0u16.to_be_bytes()); // packet_size
    p.extend_from_slice(&(44100u32 << 16).to_be_bytes()); // sample_rate 16.16
    for c in children {
        p.extend_from_slice(c);
    }
    boxed(b"mp4a", &p)
}

pub fn stsd(entries: &[&[u8]]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for e in entries {
        p.extend_from_slice(e);
    }
    full_boxed(b"stsd", 0, 0, &p)
}

/// A minimal ES descriptor chain: ES -> DecoderConfig -> DecoderSpecific,
/// plus an SLConfig.
pub fn es_descriptor_bytes() -> Vec<u8> {
    let dec_specific = [0x05, 0x02, 0x12, 0x10]; // AAC-LC AudioSpecificConfig
    let mut dec_config = vec![
        0x04, 0x11, // DecoderConfigDescr, 17 bytes
        0x40, // object_type_id: MPEG-4 audio
        0x15, // stream_type 5 (audio) << 2 | reserved bit
        0x00, 0x00, 0x00, // buffer_size_db
        0x00, 0x01, 0x77, 0x00, // max_bitrate
        0x00, 0x01, 0x2C, 0x00, // avg_bitrate
    ];
    dec_config.extend_from_slice(&dec_specific);
    let sl_config = [0x06, 0x01, 0x02]; // SLConfigDescr, predefined MP4

    let mut es_payload = vec![
        0x00, 0x01, // es_id
        0x00, // no optional fields, priority 0
    ];
    es_payload.extend_from_slice(&dec_config);
    es_payload.extend_from_slice(&sl_config);

    let mut es = vec![0x03, es_payload.len() as u8];
    es.extend_from_slice(&es_payload);
    es
}

pub fn esds() -> Vec<u8> {
    full_boxed(b"esds", 0, 0, &es_descriptor_bytes())
}

pub fn stbl(children: &[&[u8]]) -> Vec<u8> {
    boxed(b"stbl", &concat(children))
}

pub fn minf(children: &[&[u8]]) -> Vec<u8> {
    boxed(b"minf", &concat(children))
}

pub fn mdia(children: &[&[u8]]) -> Vec<u8> {
    boxed(b"mdia", &concat(children))
}

pub fn trak(children: &[&[u8]]) -> Vec<u8> {
    boxed(b"trak", &concat(children))
}

pub fn moov(children: &[&[u8]]) -> Vec<u8> {
    boxed(b"moov", &concat(children))
}

/// A complete single-video-track movie with an avc1/avcC sample entry and
/// the four mandatory sample tables.
pub fn video_trak(track_id: u32) -> Vec<u8> {
    let entry = avc1(&[&avcc()]);
    let sample_tables = stbl(&[
        &stsd(&[&entry]),
        &table_box(b"stts", 1, &concat(&[&1u32.to_be_bytes(), &3000u32.to_be_bytes()])),
        &stsz(&[100, 200]),
        &table_box(
            b"stsc",
            1,
            &concat(&[&1u32.to_be_bytes(), &2u32.to_be_bytes(), &1u32.to_be_bytes()]),
        ),
        &stco(&[4096]),
    ]);
    trak(&[
        &tkhd(track_id),
        &mdia(&[&mdhd(), &hdlr(b"vide", "VideoHandler"), &minf(&[&dinf(), &sample_tables])]),
    ])
}

pub fn audio_trak(track_id: u32) -> Vec<u8> {
    let entry = mp4a(&[&esds()]);
    let sample_tables = stbl(&[
        &stsd(&[&entry]),
        &table_box(b"stts", 1, &concat(&[&1u32.to_be_bytes(), &1024u32.to_be_bytes()])),
        &stsz(&[321]),
        &table_box(
            b"stsc",
            1,
            &concat(&[&1u32.to_be_bytes(), &1u32.to_be_bytes(), &1u32.to_be_bytes()]),
        ),
        &stco(&[8192]),
    ]);
    trak(&[
        &tkhd(track_id),
        &mdia(&[&mdhd(), &hdlr(b"soun", "SoundHandler"), &minf(&[&dinf(), &sample_tables])]),
    ])
}
