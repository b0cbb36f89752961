mod common;

use common::*;
use mp4tree::{BoxData, FourCC, HandlerKind, Mp4Parser, ParserResponse};

fn parse_movie(buf: &[u8]) -> mp4tree::ParseOutput {
    let mut parser = Mp4Parser::new();
    assert_eq!(parser.init(buf, None), ParserResponse::Event { id: "init-done" });
    assert_eq!(parser.parse(), ParserResponse::Event { id: "parse-done" });
    parser.take_output().unwrap()
}

#[test]
fn single_video_track_movie() {
    let buf = concat(&[&ftyp(), &moov(&[&mvhd(), &video_trak(1)])]);
    let out = parse_movie(&buf);

    assert!(out.diagnostics.is_empty(), "unexpected: {:?}", out.diagnostics);
    assert_eq!(out.brand.as_ref().unwrap().major_brand, FourCC(*b"isom"));
    assert_eq!(out.brand.as_ref().unwrap().compatible_brands.len(), 2);
    assert_eq!(out.roots.len(), 2); // ftyp + moov

    // stsd was decoded under the video handler: the entry is a typed
    // video sample entry, not an opaque blob.
    let avc1_entries = out.index.get(FourCC(*b"avc1"));
    assert_eq!(avc1_entries.len(), 1);
    let avc1_node = out.tree.get(avc1_entries[0].id);
    let BoxData::VideoSampleEntry(entry) = &avc1_node.data else {
        panic!("avc1 not decoded as a video entry: {:?}", avc1_node.data)
    };
    assert_eq!(entry.width, 640);
    assert_eq!(entry.height, 360);
    assert_eq!(entry.compressor_name, "H.264");
    assert_eq!(entry.data_reference_index, 1);

    // The codec configuration nested inside the entry is in the tree and
    // the index, with the video context snapshot.
    assert_eq!(avc1_node.children.len(), 1);
    let avcc_entries = out.index.get(FourCC(*b"avcC"));
    assert_eq!(avcc_entries.len(), 1);
    assert_eq!(avcc_entries[0].ctx.handler, HandlerKind::Video);
    assert_eq!(avcc_entries[0].ctx.track_id, 1);

    let avcc_node = out.tree.get(avcc_entries[0].id);
    let BoxData::AvcConfig(cfg) = &avcc_node.data else { panic!() };
    assert_eq!(cfg.profile, 0x64);
    assert_eq!(cfg.profile_label, Some("High"));
    assert_eq!(cfg.nal_length_size, 4);
    assert_eq!(cfg.sps, vec!["6742".to_string()]);
    assert_eq!(cfg.pps, vec!["68ce".to_string()]);

    // Sample tables are reachable by type with their track context.
    for typ in [b"stts", b"stsz", b"stsc", b"stco"] {
        let entries = out.index.get(FourCC(*typ));
        assert_eq!(entries.len(), 1, "missing '{}'", FourCC(*typ));
        assert_eq!(entries[0].ctx.track_id, 1);
        assert_eq!(entries[0].ctx.handler, HandlerKind::Video);
    }
}

#[test]
fn two_tracks_keep_separate_contexts() {
    let buf = concat(&[&ftyp(), &moov(&[&mvhd(), &video_trak(1), &audio_trak(2)])]);
    let out = parse_movie(&buf);

    assert_eq!(out.index.get(FourCC(*b"trak")).len(), 2);

    // Each track's chunk-offset table carries its own context; the second
    // track must not inherit the first track's handler.
    assert_eq!(out.index.find_by_handler(FourCC(*b"stco"), HandlerKind::Video).len(), 1);
    assert_eq!(out.index.find_by_handler(FourCC(*b"stco"), HandlerKind::Audio).len(), 1);
    assert_eq!(out.index.find_by_track(FourCC(*b"stsz"), 2).len(), 1);
    assert_eq!(out.index.find_by_track(FourCC(*b"stsz"), 3).len(), 0);

    // The audio entry was decoded under the sound handler, with its
    // elementary stream descriptor chain.
    let mp4a_entries = out.index.get(FourCC(*b"mp4a"));
    assert_eq!(mp4a_entries.len(), 1);
    let mp4a_node = out.tree.get(mp4a_entries[0].id);
    let BoxData::AudioSampleEntry(entry) = &mp4a_node.data else {
        panic!("mp4a not decoded as an audio entry: {:?}", mp4a_node.data)
    };
    assert_eq!(entry.channel_count, 2);
    assert_eq!(entry.sample_rate >> 16, 44100);

    let esds_entries = out.index.get(FourCC(*b"esds"));
    assert_eq!(esds_entries.len(), 1);
    assert_eq!(esds_entries[0].ctx.handler, HandlerKind::Audio);
    let esds_node = out.tree.get(esds_entries[0].id);
    let BoxData::Esds { es_descriptor } = &esds_node.data else { panic!() };
    assert_eq!(es_descriptor.tag, 0x03);
}

#[test]
fn children_are_listed_in_on_disk_order() {
    let buf = concat(&[&ftyp(), &moov(&[&mvhd(), &video_trak(1), &audio_trak(2)])]);
    let out = parse_movie(&buf);

    let moov_id = out.index.get(FourCC(*b"moov"))[0].id;
    let kinds: Vec<String> = out
        .tree
        .get(moov_id)
        .children
        .iter()
        .map(|&c| out.tree.get(c).header.typ.as_str_lossy())
        .collect();
    assert_eq!(kinds, vec!["mvhd", "trak", "trak"]);

    let stbl_ids = out.index.find_by_track(FourCC(*b"stbl"), 1);
    assert_eq!(stbl_ids.len(), 1);
    let kinds: Vec<String> = out
        .tree
        .get(stbl_ids[0])
        .children
        .iter()
        .map(|&c| out.tree.get(c).header.typ.as_str_lossy())
        .collect();
    assert_eq!(kinds, vec!["stsd", "stts", "stsz", "stsc", "stco"]);
}

#[test]
fn offsets_describe_the_isolated_header_buffer() {
    let buf = concat(&[&ftyp(), &moov(&[&mvhd()])]);
    let out = parse_movie(&buf);

    let ftyp_node = out.tree.get(out.roots[0]);
    assert_eq!(ftyp_node.header.offset, 0);
    let moov_node = out.tree.get(out.roots[1]);
    assert_eq!(moov_node.header.offset, ftyp_node.header.size);

    let mvhd_node = out.tree.get(out.index.get(FourCC(*b"mvhd"))[0].id);
    assert_eq!(mvhd_node.header.offset, moov_node.header.offset + 8);
}

#[test]
fn output_serializes_to_json() {
    let buf = concat(&[&ftyp(), &moov(&[&mvhd(), &video_trak(1)])]);
    let out = parse_movie(&buf);

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["brand"]["major_brand"], "isom");
    assert!(json["tree"]["nodes"].is_array());
}
