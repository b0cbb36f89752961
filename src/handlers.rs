//! Per-type box decoding routines.
//!
//! Each routine receives a cursor windowed over the box payload (header
//! already consumed) and returns the decoded node. Boxes that manage their
//! own inner structure (sample descriptions, data references, metadata)
//! walk their children here and return a fully built subtree; plain
//! containers are descended into by the traversal engine instead.
//!
//! Decode gaps are contained: a recognized box whose payload ends mid-way
//! is still produced with the fields read so far, default-initialized for
//! the rest, plus a truncation warning. A decoder returns `Err` only when
//! even its very first read fails, i.e. when nothing was decoded at all;
//! the size-driven advance in the engine keeps the stream position
//! correct either way.

use crate::boxes::{
    AudioSampleEntryData, AvcConfigData, BoxData, BoxHeader, BuiltNode, CslgData, DataEntryData,
    FourCC, FtypData, FullBoxHeader, HandlerKind, HdlrData, MdhdData, MvhdData, ParseContext,
    StszData, Stz2Data, TableData, TfhdData, TfraData, TkhdData, TrexData, TrunData,
    VideoSampleEntryData,
};
use crate::cursor::{ByteCursor, CursorError, Result};
use crate::descriptors::parse_descriptor;
use crate::known_boxes::KnownBox;
use crate::parser::Diagnostic;

pub struct HandlerOutcome {
    pub node: BuiltNode,
    pub is_container: bool,
    pub warnings: Vec<Diagnostic>,
}

impl HandlerOutcome {
    fn leaf(header: &BoxHeader, full: Option<FullBoxHeader>, data: BoxData) -> Self {
        Self {
            node: BuiltNode::leaf(header.clone(), full, data),
            is_container: false,
            warnings: Vec::new(),
        }
    }

    fn container(header: &BoxHeader, full: Option<FullBoxHeader>) -> Self {
        Self {
            node: BuiltNode::leaf(header.clone(), full, BoxData::Container),
            is_container: true,
            warnings: Vec::new(),
        }
    }
}

fn truncation(header: &BoxHeader, e: &CursorError) -> Diagnostic {
    Diagnostic::new(header.offset, format!("box '{}' truncated: {e}", header.typ))
}

/// Wrap partially decoded data: the fields read before `gap` are kept,
/// the gap itself becomes a warning.
fn finish(
    header: &BoxHeader,
    full: Option<FullBoxHeader>,
    data: BoxData,
    gap: Option<CursorError>,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::leaf(header, full, data);
    if let Some(e) = gap {
        out.warnings.push(truncation(header, &e));
    }
    out
}

/// Decode one box of kind `kind` from its payload window.
pub fn decode_box(
    kind: KnownBox,
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    match kind {
        KnownBox::Ftyp => decode_ftyp(cur, header),

        KnownBox::Moov
        | KnownBox::Trak
        | KnownBox::Mdia
        | KnownBox::Minf
        | KnownBox::Dinf
        | KnownBox::Stbl
        | KnownBox::Edts
        | KnownBox::Udta
        | KnownBox::Mvex
        | KnownBox::Moof
        | KnownBox::Traf
        | KnownBox::Mfra => Ok(HandlerOutcome::container(header, None)),

        KnownBox::Mvhd => decode_mvhd(cur, header),
        KnownBox::Tkhd => decode_tkhd(cur, header),
        KnownBox::Tref => {
            let raw = cur.read_bytes(cur.remaining()).map(<[u8]>::to_vec).unwrap_or_default();
            Ok(HandlerOutcome::leaf(header, None, BoxData::Tref { raw }))
        }
        KnownBox::Mdhd => decode_mdhd(cur, header),
        KnownBox::Hdlr => decode_hdlr(cur, header),
        KnownBox::Dref => decode_dref(cur, header, ctx),
        KnownBox::Url | KnownBox::Urn => decode_data_entry(kind, cur, header),
        KnownBox::Stsd => decode_stsd(cur, header, ctx),
        KnownBox::Avc1 | KnownBox::Mp4v => decode_video_sample_entry(cur, header, ctx),
        KnownBox::Mp4a => decode_audio_sample_entry(cur, header, ctx),
        KnownBox::AvcC => decode_avcc(cur, header),
        KnownBox::Pasp => {
            let h_spacing = cur.read_u32()?;
            let mut v_spacing = 0;
            let gap = (|| -> Result<()> {
                v_spacing = cur.read_u32()?;
                Ok(())
            })()
            .err();
            Ok(finish(header, None, BoxData::PixelAspect { h_spacing, v_spacing }, gap))
        }
        KnownBox::Btrt => {
            let buffer_size_db = cur.read_u32()?;
            let (mut max_bitrate, mut avg_bitrate) = (0, 0);
            let gap = (|| -> Result<()> {
                max_bitrate = cur.read_u32()?;
                avg_bitrate = cur.read_u32()?;
                Ok(())
            })()
            .err();
            Ok(finish(
                header,
                None,
                BoxData::Bitrate { buffer_size_db, max_bitrate, avg_bitrate },
                gap,
            ))
        }
        KnownBox::Esds => {
            let full = read_full(cur)?;
            match parse_descriptor(cur) {
                Ok(es_descriptor) => {
                    Ok(HandlerOutcome::leaf(header, Some(full), BoxData::Esds { es_descriptor }))
                }
                Err(e) => Ok(finish(header, Some(full), BoxData::Opaque, Some(e))),
            }
        }

        KnownBox::Stts => counted_table(cur, header, 8, &["sample_count", "sample_delta"]),
        KnownBox::Ctts => counted_table(cur, header, 8, &["sample_count", "sample_offset"]),
        KnownBox::Stss => counted_table(cur, header, 4, &["sample_number"]),
        KnownBox::Stsh => {
            counted_table(cur, header, 8, &["shadowed_sample_number", "sync_sample_number"])
        }
        KnownBox::Stsc => counted_table(
            cur,
            header,
            12,
            &["first_chunk", "samples_per_chunk", "sample_description_index"],
        ),
        KnownBox::Stco => counted_table(cur, header, 4, &["chunk_offset"]),
        KnownBox::Co64 => counted_table(cur, header, 8, &["chunk_offset"]),
        KnownBox::Stdp => decode_stdp(cur, header),
        KnownBox::Sdtp => decode_sdtp(cur, header),
        KnownBox::Stsz => decode_stsz(cur, header),
        KnownBox::Stz2 => decode_stz2(cur, header),
        KnownBox::Padb => {
            uncounted_table(cur, header, &["pad"])
        }
        KnownBox::Subs => {
            uncounted_table(cur, header, &["sample_delta", "subsample_count", "subsample_entries"])
        }
        KnownBox::Elst => decode_elst(cur, header),
        KnownBox::Cslg => decode_cslg(cur, header),

        KnownBox::Mehd => {
            let full = read_full(cur)?;
            let mut fragment_duration = 0;
            let gap = (|| -> Result<()> {
                fragment_duration = read_versioned(cur, full.version)?;
                Ok(())
            })()
            .err();
            Ok(finish(header, Some(full), BoxData::Mehd { fragment_duration }, gap))
        }
        KnownBox::Trex => decode_trex(cur, header),
        KnownBox::Mfhd => {
            let full = read_full(cur)?;
            let mut sequence_number = 0;
            let gap = (|| -> Result<()> {
                sequence_number = cur.read_u32()?;
                Ok(())
            })()
            .err();
            Ok(finish(header, Some(full), BoxData::Mfhd { sequence_number }, gap))
        }
        KnownBox::Tfhd => decode_tfhd(cur, header),
        KnownBox::Trun => decode_trun(cur, header),
        KnownBox::Tfdt => {
            let full = read_full(cur)?;
            let mut base_media_decode_time = 0;
            let gap = (|| -> Result<()> {
                base_media_decode_time = read_versioned(cur, full.version)?;
                Ok(())
            })()
            .err();
            Ok(finish(header, Some(full), BoxData::Tfdt { base_media_decode_time }, gap))
        }
        KnownBox::Tfra => decode_tfra(cur, header),
        KnownBox::Mfro => {
            let full = read_full(cur)?;
            let mut mfra_size = 0;
            let gap = (|| -> Result<()> {
                mfra_size = cur.read_u32()?;
                Ok(())
            })()
            .err();
            Ok(finish(header, Some(full), BoxData::Mfro { mfra_size }, gap))
        }
        KnownBox::Trep => {
            let full = read_full(cur)?;
            let mut track_id = 0;
            let gap = (|| -> Result<()> {
                track_id = cur.read_u32()?;
                Ok(())
            })()
            .err();
            Ok(finish(header, Some(full), BoxData::Trep { track_id }, gap))
        }

        KnownBox::Meta => decode_meta(cur, header, ctx),
        KnownBox::Ilst => decode_ilst(cur, header, ctx),
        KnownBox::Gshh => decode_gshh(cur, header, ctx),
        KnownBox::Data => decode_data(cur, header),
        KnownBox::Cprt => decode_cprt(cur, header),

        KnownBox::Mdat | KnownBox::Free | KnownBox::Unknown(_) => {
            Ok(HandlerOutcome::leaf(header, None, BoxData::Opaque))
        }
    }
}

fn read_full(cur: &mut ByteCursor<'_>) -> Result<FullBoxHeader> {
    let version = cur.read_u8()?;
    let flags = cur.read_u24()?;
    Ok(FullBoxHeader { version, flags })
}

/// 64-bit field in version 1, 32-bit widened otherwise.
fn read_versioned(cur: &mut ByteCursor<'_>, version: u8) -> Result<u64> {
    if version == 1 {
        cur.read_u64()
    } else {
        Ok(cur.read_u32()? as u64)
    }
}

fn read_matrix(cur: &mut ByteCursor<'_>) -> Result<[u32; 9]> {
    let mut m = [0u32; 9];
    for v in &mut m {
        *v = cur.read_u32()?;
    }
    Ok(m)
}

/// ISO-639-2/T code packed as three 5-bit letters biased by 0x60.
fn unpack_language(code: u16) -> String {
    if code == 0 {
        return "und".to_string();
    }
    let chars = [(code >> 10) & 0x1F, (code >> 5) & 0x1F, code & 0x1F];
    chars.iter().map(|&c| ((c as u8) + 0x60) as char).collect()
}

fn payload_base(header: &BoxHeader) -> u64 {
    header.offset + header.header_size
}

fn decode_ftyp(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let mut data = FtypData { major_brand: FourCC(cur.read_fourcc()?), ..FtypData::default() };
    let gap = (|| -> Result<()> {
        data.minor_version = cur.read_u32()?;
        while cur.remaining() >= 4 {
            data.compatible_brands.push(FourCC(cur.read_fourcc()?));
        }
        Ok(())
    })()
    .err();
    Ok(finish(header, None, BoxData::Ftyp(data), gap))
}

fn decode_mvhd(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = MvhdData::default();
    let gap = (|| -> Result<()> {
        data.creation_time = read_versioned(cur, full.version)?;
        data.modification_time = read_versioned(cur, full.version)?;
        data.timescale = cur.read_u32()?;
        data.duration = read_versioned(cur, full.version)?;
        data.rate = cur.read_u32()?;
        data.volume = cur.read_u16()?;
        cur.skip(10)?; // reserved
        data.matrix = read_matrix(cur)?;
        cur.skip(24)?; // pre_defined
        data.next_track_id = cur.read_u32()?;
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Mvhd(data), gap))
}

fn decode_tkhd(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = TkhdData::default();
    let gap = (|| -> Result<()> {
        data.creation_time = read_versioned(cur, full.version)?;
        data.modification_time = read_versioned(cur, full.version)?;
        data.track_id = cur.read_u32()?;
        cur.skip(4)?; // reserved
        data.duration = read_versioned(cur, full.version)?;
        cur.skip(8)?; // reserved
        data.layer = cur.read_i16()?;
        data.alternate_group = cur.read_i16()?;
        data.volume = cur.read_u16()?;
        cur.skip(2)?; // reserved
        data.matrix = read_matrix(cur)?;
        data.width = cur.read_u32()?;
        data.height = cur.read_u32()?;
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Tkhd(data), gap))
}

fn decode_mdhd(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = MdhdData::default();
    let gap = (|| -> Result<()> {
        data.creation_time = read_versioned(cur, full.version)?;
        data.modification_time = read_versioned(cur, full.version)?;
        data.timescale = cur.read_u32()?;
        data.duration = read_versioned(cur, full.version)?;
        data.language = unpack_language(cur.read_u16()? & 0x7FFF);
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Mdhd(data), gap))
}

fn decode_hdlr(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = HdlrData::default();
    let gap = (|| -> Result<()> {
        cur.skip(4)?; // pre_defined
        data.handler_type = FourCC(cur.read_fourcc()?);
        data.kind = HandlerKind::from_fourcc(data.handler_type);
        cur.skip(12)?; // reserved
        data.name = cur.read_cstring(cur.remaining())?;
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Hdlr(data), gap))
}

fn decode_dref(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut entry_count = 0;
    let gap = (|| -> Result<()> {
        entry_count = cur.read_u32()?;
        Ok(())
    })()
    .err();
    let base = payload_base(header) + 8;
    let (children, warnings) = walk_children(cur, base, ctx);
    let mut out = HandlerOutcome {
        node: BuiltNode {
            header: header.clone(),
            full: Some(full),
            data: BoxData::Dref { entry_count },
            children,
        },
        is_container: false,
        warnings,
    };
    if let Some(e) = gap {
        out.warnings.push(truncation(header, &e));
    }
    Ok(out)
}

fn decode_data_entry(
    kind: KnownBox,
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = DataEntryData { self_contained: full.flags & 0x1 != 0, ..Default::default() };
    let gap = (|| -> Result<()> {
        if kind == KnownBox::Urn {
            data.name = Some(cur.read_cstring(cur.remaining())?);
        }
        if !data.self_contained && cur.remaining() > 0 {
            data.location = Some(cur.read_cstring(cur.remaining())?);
        }
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::DataEntry(data), gap))
}

/// Sample descriptions: the entry payload layout depends on the media
/// handler of the enclosing track, not on the entry's own fourcc.
fn decode_stsd(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let entry_count = cur.read_u32().unwrap_or(0);
    let base = payload_base(header) + 8;

    let mut children = Vec::new();
    let mut warnings = Vec::new();
    let mut seen = 0u32;
    while seen < entry_count && cur.remaining() >= 8 {
        let at = cur.pos();
        let size = cur.read_u32()? as u64;
        let typ = FourCC(cur.read_fourcc()?);
        let entry_header = BoxHeader { typ, size, offset: base + at as u64, header_size: 8 };
        if size < 16 || size - 8 > cur.remaining() as u64 {
            // Implausible framing (possibly a QuickTime-style unframed
            // entry); keep it opaque rather than guessing a layout.
            warnings.push(Diagnostic::new(
                entry_header.offset,
                format!("sample description entry '{typ}' has implausible size {size}"),
            ));
            children.push(BuiltNode::leaf(entry_header, None, BoxData::Opaque));
            break;
        }
        let body_len = ((size - 8) as usize).min(cur.remaining());
        let body = cur.read_bytes(body_len)?;
        let mut entry_cur = ByteCursor::new(body);
        let decoded = match ctx.handler {
            HandlerKind::Video => decode_video_sample_entry(&mut entry_cur, &entry_header, ctx),
            HandlerKind::Audio => decode_audio_sample_entry(&mut entry_cur, &entry_header, ctx),
            HandlerKind::Hint => {
                let raw = body.to_vec();
                Ok(HandlerOutcome::leaf(&entry_header, None, BoxData::HintSampleEntry { raw }))
            }
            HandlerKind::Other => Ok(HandlerOutcome::leaf(&entry_header, None, BoxData::Opaque)),
        };
        match decoded {
            Ok(outcome) => {
                children.push(outcome.node);
                warnings.extend(outcome.warnings);
            }
            Err(e) => {
                warnings.push(Diagnostic::new(
                    entry_header.offset,
                    format!("sample description entry '{typ}' truncated: {e}"),
                ));
                children.push(BuiltNode::leaf(entry_header, None, BoxData::Opaque));
            }
        }
        seen += 1;
    }

    Ok(HandlerOutcome {
        node: BuiltNode {
            header: header.clone(),
            full: Some(full),
            data: BoxData::Stsd { entry_count },
            children,
        },
        is_container: false,
        warnings,
    })
}

fn decode_video_sample_entry(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    cur.skip(6)?; // reserved
    let mut data = VideoSampleEntryData::default();
    let gap = (|| -> Result<()> {
        data.data_reference_index = cur.read_u16()?;
        data.version = cur.read_u16()?;
        data.revision = cur.read_u16()?;
        data.vendor = cur.read_u32()?;
        data.temporal_quality = cur.read_u32()?;
        data.spatial_quality = cur.read_u32()?;
        data.width = cur.read_u16()?;
        data.height = cur.read_u16()?;
        data.horiz_resolution = cur.read_u32()?;
        data.vert_resolution = cur.read_u32()?;
        data.data_size = cur.read_u32()?;
        data.frame_count = cur.read_u16()?;
        let name_len = (cur.read_u8()? as usize).min(31);
        let name_field = cur.read_bytes(31)?;
        data.compressor_name = crate::cursor::printable_ascii(&name_field[..name_len]);
        data.depth = cur.read_u16()?;
        data.color_table_id = cur.read_u16()?;
        Ok(())
    })()
    .err();

    // A truncated fixed part leaves no trustworthy window for nested
    // config boxes.
    let (children, mut warnings) = if gap.is_none() {
        walk_children(cur, payload_base(header) + 78, ctx)
    } else {
        (Vec::new(), Vec::new())
    };
    if let Some(e) = gap {
        warnings.push(truncation(header, &e));
    }

    Ok(HandlerOutcome {
        node: BuiltNode {
            header: header.clone(),
            full: None,
            data: BoxData::VideoSampleEntry(data),
            children,
        },
        is_container: false,
        warnings,
    })
}

fn decode_audio_sample_entry(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    cur.skip(6)?; // reserved
    let mut data = AudioSampleEntryData::default();
    let gap = (|| -> Result<()> {
        data.data_reference_index = cur.read_u16()?;
        data.version = cur.read_u16()?;
        data.revision = cur.read_u16()?;
        data.vendor = cur.read_u32()?;
        data.channel_count = cur.read_u16()?;
        data.sample_size = cur.read_u16()?;
        data.compression_id = cur.read_i16()?;
        data.packet_size = cur.read_u16()?;
        data.sample_rate = cur.read_u32()?;
        Ok(())
    })()
    .err();

    let (children, mut warnings) = if gap.is_none() {
        walk_children(cur, payload_base(header) + 28, ctx)
    } else {
        (Vec::new(), Vec::new())
    };
    if let Some(e) = gap {
        warnings.push(truncation(header, &e));
    }

    Ok(HandlerOutcome {
        node: BuiltNode {
            header: header.clone(),
            full: None,
            data: BoxData::AudioSampleEntry(data),
            children,
        },
        is_container: false,
        warnings,
    })
}

fn avc_profile_label(profile: u8) -> Option<&'static str> {
    Some(match profile {
        0x42 => "Baseline",
        0x4D => "Main",
        0x58 => "Extended",
        0x64 => "High",
        0x6E => "High 10",
        0x7A => "High 4:2:2",
        0xF4 => "High 4:4:4",
        _ => return None,
    })
}

fn decode_avcc(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let mut data =
        AvcConfigData { configuration_version: cur.read_u8()?, ..AvcConfigData::default() };
    let gap = (|| -> Result<()> {
        data.profile = cur.read_u8()?;
        data.profile_label = avc_profile_label(data.profile);
        data.compatibility = cur.read_u8()?;
        data.level = cur.read_u8()?;
        data.nal_length_size = (cur.read_u8()? & 0x03) + 1;

        let sps_count = cur.read_u8()? & 0x1F;
        for _ in 0..sps_count {
            let len = cur.read_u16()? as usize;
            data.sps.push(hex::encode(cur.read_bytes(len)?));
        }
        let pps_count = cur.read_u8()?;
        for _ in 0..pps_count {
            let len = cur.read_u16()? as usize;
            data.pps.push(hex::encode(cur.read_bytes(len)?));
        }
        Ok(())
    })()
    .err();
    Ok(finish(header, None, BoxData::AvcConfig(data), gap))
}

/// Capture a fixed-stride table as its raw undivided byte range. Never
/// reads past the payload; a short capture surfaces through
/// [`TableData::is_consistent`] and a warning.
fn capture_table(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    entry_count: u32,
    entry_stride: u32,
    columns: &'static [&'static str],
    warnings: &mut Vec<Diagnostic>,
) -> TableData {
    let want = entry_count as u64 * entry_stride as u64;
    let take = (want.min(cur.remaining() as u64)) as usize;
    let raw = cur.read_bytes(take).map(<[u8]>::to_vec).unwrap_or_default();
    let table = TableData { entry_count, entry_stride, columns, raw };
    if !table.is_consistent() {
        warnings.push(Diagnostic::new(
            header.offset,
            format!(
                "'{}' declares {} entries of {} byte(s) but carries {} byte(s)",
                header.typ, entry_count, entry_stride, take
            ),
        ));
    }
    table
}

/// FullBox + u32 entry_count + fixed-stride rows: the common table shape.
fn counted_table(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    entry_stride: u32,
    columns: &'static [&'static str],
) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut warnings = Vec::new();
    let table = match cur.read_u32() {
        Ok(entry_count) => capture_table(cur, header, entry_count, entry_stride, columns, &mut warnings),
        Err(e) => {
            warnings.push(truncation(header, &e));
            TableData { columns, ..TableData::default() }
        }
    };
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Table(table)),
        is_container: false,
        warnings,
    })
}

/// FullBox + variable-stride rows kept as one raw range (subs, padb).
fn uncounted_table(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    columns: &'static [&'static str],
) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut warnings = Vec::new();
    let table = match cur.read_u32() {
        Ok(entry_count) => {
            let raw = cur.read_bytes(cur.remaining()).map(<[u8]>::to_vec).unwrap_or_default();
            TableData { entry_count, entry_stride: 0, columns, raw }
        }
        Err(e) => {
            warnings.push(truncation(header, &e));
            TableData { columns, ..TableData::default() }
        }
    };
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Table(table)),
        is_container: false,
        warnings,
    })
}

fn decode_stdp(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    // No entry_count field; one u16 per sample fills the payload.
    let full = read_full(cur)?;
    let entry_count = (cur.remaining() / 2) as u32;
    let mut warnings = Vec::new();
    let table = capture_table(cur, header, entry_count, 2, &["priority"], &mut warnings);
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Table(table)),
        is_container: false,
        warnings,
    })
}

fn decode_sdtp(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    // One packed dependency byte per sample; count comes from the payload
    // length, the sample count lives in stsz.
    let full = read_full(cur)?;
    let entry_count = cur.remaining() as u32;
    let mut warnings = Vec::new();
    let table = capture_table(cur, header, entry_count, 1, &["dependencies"], &mut warnings);
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Table(table)),
        is_container: false,
        warnings,
    })
}

fn decode_stsz(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut warnings = Vec::new();
    let mut data = StszData::default();
    let gap = (|| -> Result<()> {
        data.sample_size = cur.read_u32()?;
        let sample_count = cur.read_u32()?;
        data.table = if data.sample_size == 0 {
            capture_table(cur, header, sample_count, 4, &["entry_size"], &mut warnings)
        } else {
            // Constant-size samples carry no rows.
            TableData { entry_count: sample_count, columns: &["entry_size"], ..TableData::default() }
        };
        Ok(())
    })()
    .err();
    if let Some(e) = gap {
        warnings.push(truncation(header, &e));
    }
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Stsz(data)),
        is_container: false,
        warnings,
    })
}

fn decode_stz2(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut warnings = Vec::new();
    let mut data = Stz2Data::default();
    let gap = (|| -> Result<()> {
        cur.skip(3)?; // reserved
        data.field_size = cur.read_u8()?;
        let sample_count = cur.read_u32()?;
        data.table = if data.field_size == 4 {
            // Two entries per byte; the packed range skips the stride
            // invariant.
            let want = (sample_count as u64).div_ceil(2).min(cur.remaining() as u64) as usize;
            let raw = cur.read_bytes(want)?.to_vec();
            if raw.len() as u64 != (sample_count as u64).div_ceil(2) {
                warnings.push(Diagnostic::new(
                    header.offset,
                    format!(
                        "'stz2' declares {sample_count} packed entries but carries {} byte(s)",
                        raw.len()
                    ),
                ));
            }
            TableData { entry_count: sample_count, entry_stride: 0, columns: &["entry_size"], raw }
        } else {
            let stride = (data.field_size / 8).max(1) as u32;
            capture_table(cur, header, sample_count, stride, &["entry_size"], &mut warnings)
        };
        Ok(())
    })()
    .err();
    if let Some(e) = gap {
        warnings.push(truncation(header, &e));
    }
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Stz2(data)),
        is_container: false,
        warnings,
    })
}

fn decode_elst(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let stride = if full.version == 1 { 20 } else { 12 };
    let columns: &'static [&'static str] =
        &["segment_duration", "media_time", "media_rate_integer", "media_rate_fraction"];
    let mut warnings = Vec::new();
    let table = match cur.read_u32() {
        Ok(entry_count) => capture_table(cur, header, entry_count, stride, columns, &mut warnings),
        Err(e) => {
            warnings.push(truncation(header, &e));
            TableData { columns, ..TableData::default() }
        }
    };
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Table(table)),
        is_container: false,
        warnings,
    })
}

fn decode_cslg(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = CslgData::default();
    let gap = (|| -> Result<()> {
        let mut next = || -> Result<i64> {
            if full.version == 0 {
                Ok(cur.read_i32()? as i64)
            } else {
                cur.read_i64()
            }
        };
        data.composition_to_dts_shift = next()?;
        data.least_decode_to_display_delta = next()?;
        data.greatest_decode_to_display_delta = next()?;
        data.composition_start_time = next()?;
        data.composition_end_time = next()?;
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Cslg(data), gap))
}

fn decode_trex(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = TrexData::default();
    let gap = (|| -> Result<()> {
        data.track_id = cur.read_u32()?;
        data.default_sample_description_index = cur.read_u32()?;
        data.default_sample_duration = cur.read_u32()?;
        data.default_sample_size = cur.read_u32()?;
        data.default_sample_flags = cur.read_u32()?;
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Trex(data), gap))
}

fn decode_tfhd(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let flags = full.flags;
    let mut data = TfhdData {
        duration_is_empty: flags & 0x1_0000 != 0,
        default_base_is_moof: flags & 0x2_0000 != 0,
        ..TfhdData::default()
    };
    let gap = (|| -> Result<()> {
        data.track_id = cur.read_u32()?;
        if flags & 0x01 != 0 {
            data.base_data_offset = Some(cur.read_u64()?);
        }
        if flags & 0x02 != 0 {
            data.sample_description_index = Some(cur.read_u32()?);
        }
        if flags & 0x08 != 0 {
            data.default_sample_duration = Some(cur.read_u32()?);
        }
        if flags & 0x10 != 0 {
            data.default_sample_size = Some(cur.read_u32()?);
        }
        if flags & 0x20 != 0 {
            data.default_sample_flags = Some(cur.read_u32()?);
        }
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Tfhd(data), gap))
}

fn decode_trun(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let flags = full.flags;
    let mut data = TrunData::default();
    if flags & 0x100 != 0 {
        data.sample_columns.push("sample_duration");
    }
    if flags & 0x200 != 0 {
        data.sample_columns.push("sample_size");
    }
    if flags & 0x400 != 0 {
        data.sample_columns.push("sample_flags");
    }
    if flags & 0x800 != 0 {
        // Signed only when version >= 1; the raw bytes are the same width.
        data.sample_columns.push("sample_composition_time_offset");
    }
    data.sample_stride = 4 * data.sample_columns.len() as u32;

    let mut warnings = Vec::new();
    let gap = (|| -> Result<()> {
        data.sample_count = cur.read_u32()?;
        if flags & 0x01 != 0 {
            data.data_offset = Some(cur.read_i32()?);
        }
        if flags & 0x04 != 0 {
            data.first_sample_flags = Some(cur.read_u32()?);
        }
        let want = data.sample_count as u64 * data.sample_stride as u64;
        let take = want.min(cur.remaining() as u64) as usize;
        data.samples_raw = cur.read_bytes(take)?.to_vec();
        if take as u64 != want {
            warnings.push(Diagnostic::new(
                header.offset,
                format!("'trun' declares {want} byte(s) of sample rows but carries {take}"),
            ));
        }
        Ok(())
    })()
    .err();
    if let Some(e) = gap {
        warnings.push(truncation(header, &e));
    }
    Ok(HandlerOutcome {
        node: BuiltNode::leaf(header.clone(), Some(full), BoxData::Trun(data)),
        is_container: false,
        warnings,
    })
}

fn decode_tfra(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut data = TfraData::default();
    let gap = (|| -> Result<()> {
        data.track_id = cur.read_u32()?;
        let packed = cur.read_u32()?;
        data.length_size_of_traf_num = (((packed >> 4) & 0x3) + 1) as u8;
        data.length_size_of_trun_num = (((packed >> 2) & 0x3) + 1) as u8;
        data.length_size_of_sample_num = ((packed & 0x3) + 1) as u8;
        data.entry_count = cur.read_u32()?;
        data.raw = cur.read_bytes(cur.remaining())?.to_vec();
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Tfra(data), gap))
}

fn decode_meta(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let base = payload_base(header) + 4;
    let (children, warnings) = walk_children(cur, base, ctx);
    Ok(HandlerOutcome {
        node: BuiltNode {
            header: header.clone(),
            full: Some(full),
            data: BoxData::Container,
            children,
        },
        is_container: false,
        warnings,
    })
}

/// Item list: every child is an item of arbitrary fourcc wrapping `data`
/// boxes, so items become opaque nodes with decoded data children.
fn decode_ilst(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    let base = payload_base(header);
    let mut children = Vec::new();
    let mut warnings = Vec::new();
    while cur.remaining() >= 8 {
        let at = cur.pos();
        let size = cur.read_u32()? as u64;
        let typ = FourCC(cur.read_fourcc()?);
        if size <= 8 {
            // Header already consumed, so the scan advances by exactly one
            // header width.
            warnings.push(Diagnostic::new(
                base + at as u64,
                format!("item '{typ}' has malformed size {size}"),
            ));
            continue;
        }
        let body_len = ((size - 8) as usize).min(cur.remaining());
        let body = cur.read_bytes(body_len)?;
        let item_header = BoxHeader { typ, size, offset: base + at as u64, header_size: 8 };
        let mut item_cur = ByteCursor::new(body);
        let (item_children, item_warnings) =
            walk_children(&mut item_cur, item_header.offset + 8, ctx);
        warnings.extend(item_warnings);
        children.push(BuiltNode {
            header: item_header,
            full: None,
            data: BoxData::Opaque,
            children: item_children,
        });
    }
    Ok(HandlerOutcome {
        node: BuiltNode { header: header.clone(), full: None, data: BoxData::Container, children },
        is_container: false,
        warnings,
    })
}

fn decode_gshh(
    cur: &mut ByteCursor<'_>,
    header: &BoxHeader,
    ctx: ParseContext,
) -> Result<HandlerOutcome> {
    let base = payload_base(header);
    let (children, warnings) = walk_children(cur, base, ctx);
    Ok(HandlerOutcome {
        node: BuiltNode { header: header.clone(), full: None, data: BoxData::Container, children },
        is_container: false,
        warnings,
    })
}

fn decode_data(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    cur.skip(8)?; // type indicator + locale
    let content = cur.read_ascii(cur.remaining())?;
    Ok(HandlerOutcome::leaf(header, None, BoxData::Data { content }))
}

fn decode_cprt(cur: &mut ByteCursor<'_>, header: &BoxHeader) -> Result<HandlerOutcome> {
    let full = read_full(cur)?;
    let mut language = String::new();
    let mut notice = String::new();
    let gap = (|| -> Result<()> {
        language = unpack_language(cur.read_u16()? & 0x7FFF);
        notice = cur.read_cstring(cur.remaining())?;
        Ok(())
    })()
    .err();
    Ok(finish(header, Some(full), BoxData::Cprt { language, notice }, gap))
}

/// Walk the size+type children of a handler-managed window. Children of
/// known kinds are decoded (recursively through [`decode_box`]); unknown
/// kinds are skipped by their declared size with no node. A size no larger
/// than its own header is malformed: the child gets no node and the scan
/// resumes right after the header it just consumed. A child whose decode
/// fails outright degrades to an opaque node with a warning.
fn walk_children(
    cur: &mut ByteCursor<'_>,
    abs_base: u64,
    ctx: ParseContext,
) -> (Vec<BuiltNode>, Vec<Diagnostic>) {
    let mut children = Vec::new();
    let mut warnings = Vec::new();

    while cur.remaining() >= 8 {
        let at = cur.pos();
        let Ok(size32) = cur.read_u32() else { break };
        let Ok(cc) = cur.read_fourcc() else { break };
        let typ = FourCC(cc);
        let (size, header_size) = match size32 {
            0 => (cur.remaining() as u64 + 8, 8u64),
            1 => match cur.read_u64() {
                Ok(s) => (s, 16u64),
                Err(_) => break,
            },
            s => (s as u64, 8u64),
        };
        let offset = abs_base + at as u64;
        if size <= header_size {
            warnings.push(Diagnostic::new(
                offset,
                format!("box '{typ}' has malformed size {size}"),
            ));
            continue;
        }
        let body_len = ((size - header_size) as usize).min(cur.remaining());
        let Ok(body) = cur.read_bytes(body_len) else { break };

        let kind = KnownBox::from(typ);
        if matches!(kind, KnownBox::Unknown(_)) {
            continue;
        }
        let header = BoxHeader { typ, size, offset, header_size };
        let mut sub = ByteCursor::new(body);
        match decode_box(kind, &mut sub, &header, ctx) {
            Ok(outcome) => {
                children.push(outcome.node);
                warnings.extend(outcome.warnings);
            }
            Err(e) => {
                warnings.push(truncation(&header, &e));
                children.push(BuiltNode::leaf(header, None, BoxData::Opaque));
            }
        }
    }

    (children, warnings)
}
