//! MPEG-4 systems descriptor decoding (the TLV stream inside `esds`).
//!
//! Grammar per descriptor: tag (1 byte), zero or more continuation bytes
//! (0x80, 0x81 or 0xFE), then a 1-byte payload length. Nested descriptors
//! live inside the parent's payload window, so a short or overlong child
//! cannot corrupt the parse position of its siblings.

use crate::cursor::{ByteCursor, Result};
use serde::Serialize;

pub const ES_DESCR_TAG: u8 = 0x03;
pub const DECODER_CONFIG_DESCR_TAG: u8 = 0x04;
pub const DEC_SPECIFIC_INFO_TAG: u8 = 0x05;
pub const SL_CONFIG_DESCR_TAG: u8 = 0x06;

#[derive(Debug, Clone, Serialize)]
pub struct Descriptor {
    pub tag: u8,
    pub tag_name: &'static str,
    /// Declared payload length in bytes (header excluded).
    pub size: u32,
    pub body: DescriptorBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DescriptorBody {
    Es(EsDescriptor),
    DecoderConfig(DecoderConfigDescriptor),
    /// Codec-private bytes carried verbatim, hex-rendered.
    DecoderSpecific { data: String },
    SlConfig { predefined: u8 },
    /// Recognized structurally but not semantically; payload kept raw.
    Unknown { data: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EsDescriptor {
    pub es_id: u16,
    pub stream_priority: u8,
    pub depends_on_es_id: Option<u16>,
    pub url: Option<String>,
    pub ocr_es_id: Option<u16>,
    pub decoder_config: Option<Box<Descriptor>>,
    pub sl_config: Option<Box<Descriptor>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecoderConfigDescriptor {
    pub object_type_id: u8,
    pub object_type_label: Option<&'static str>,
    /// 6-bit stream type from the high bits of the byte after the type id.
    pub stream_type: u8,
    pub up_stream: bool,
    pub buffer_size_db: u32,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
    pub decoder_specific: Option<Box<Descriptor>>,
}

/// Decode one descriptor (and its nested children) at the cursor.
///
/// Consumes exactly the descriptor's header plus its declared payload,
/// regardless of how much of the payload the body decoder understood.
pub fn parse_descriptor(cur: &mut ByteCursor<'_>) -> Result<Descriptor> {
    let tag = cur.read_u8()?;
    let mut len_byte = cur.read_u8()?;
    // Extension bytes pad the length field; the last byte is the length.
    while matches!(len_byte, 0x80 | 0x81 | 0xFE) {
        len_byte = cur.read_u8()?;
    }
    let size = len_byte as u32;
    let payload = cur.read_bytes(size as usize)?;

    let mut body_cur = ByteCursor::new(payload);
    let body = match tag {
        ES_DESCR_TAG => DescriptorBody::Es(parse_es(&mut body_cur)?),
        DECODER_CONFIG_DESCR_TAG => {
            DescriptorBody::DecoderConfig(parse_decoder_config(&mut body_cur)?)
        }
        DEC_SPECIFIC_INFO_TAG => DescriptorBody::DecoderSpecific { data: hex::encode(payload) },
        SL_CONFIG_DESCR_TAG => DescriptorBody::SlConfig { predefined: body_cur.read_u8()? },
        _ => DescriptorBody::Unknown { data: hex::encode(payload) },
    };

    Ok(Descriptor { tag, tag_name: tag_name(tag), size, body })
}

fn parse_es(cur: &mut ByteCursor<'_>) -> Result<EsDescriptor> {
    let es_id = cur.read_u16()?;
    let flags = cur.read_u8()?;
    let depends_on_es_id = if flags & 0x80 != 0 { Some(cur.read_u16()?) } else { None };
    let url = if flags & 0x40 != 0 {
        let len = cur.read_u8()? as usize;
        Some(cur.read_ascii(len)?)
    } else {
        None
    };
    let ocr_es_id = if flags & 0x20 != 0 { Some(cur.read_u16()?) } else { None };

    let mut decoder_config = None;
    let mut sl_config = None;
    while cur.remaining() >= 2 {
        let child = parse_descriptor(cur)?;
        match child.tag {
            DECODER_CONFIG_DESCR_TAG if decoder_config.is_none() => {
                decoder_config = Some(Box::new(child));
            }
            SL_CONFIG_DESCR_TAG if sl_config.is_none() => {
                sl_config = Some(Box::new(child));
            }
            _ => {} // extension descriptors, dropped after structural parse
        }
    }

    Ok(EsDescriptor {
        es_id,
        stream_priority: flags & 0x1F,
        depends_on_es_id,
        url,
        ocr_es_id,
        decoder_config,
        sl_config,
    })
}

fn parse_decoder_config(cur: &mut ByteCursor<'_>) -> Result<DecoderConfigDescriptor> {
    let object_type_id = cur.read_u8()?;
    let packed = cur.read_u8()?;
    let buffer_size_db = cur.read_u24()?;
    let max_bitrate = cur.read_u32()?;
    let avg_bitrate = cur.read_u32()?;

    let decoder_specific = if cur.remaining() >= 2 {
        Some(Box::new(parse_descriptor(cur)?))
    } else {
        None
    };

    Ok(DecoderConfigDescriptor {
        object_type_id,
        object_type_label: object_type_label(object_type_id),
        stream_type: packed >> 2,
        up_stream: packed & 0x02 != 0,
        buffer_size_db,
        max_bitrate,
        avg_bitrate,
        decoder_specific,
    })
}

pub fn tag_name(tag: u8) -> &'static str {
    match tag {
        0x00 => "Forbidden",
        0x01 => "ObjectDescr",
        0x02 => "InitialObjectDescr",
        0x03 => "ES_Descr",
        0x04 => "DecoderConfigDescr",
        0x05 => "DecSpecificInfo",
        0x06 => "SLConfigDescr",
        0x07 => "ContentIdentDescr",
        0x08 => "SupplContentIdentDescr",
        0x09 => "IPI_DescrPointer",
        0x0A => "IPMP_DescrPointer",
        0x0B => "IPMP_Descr",
        0x0C => "QoS_Descr",
        0x0D => "RegistrationDescr",
        0x0E => "ES_ID_Inc",
        0x0F => "ES_ID_Ref",
        0x10 => "MP4_IOD",
        0x11 => "MP4_OD",
        0x12 => "IPL_DescrPointerRef",
        0x13 => "ExtensionProfileLevelDescr",
        0x14 => "ProfileLevelIndicationIndexDescr",
        0x40 => "ContentClassificationDescr",
        0x41 => "KeyWordDescr",
        0x42 => "RatingDescr",
        0x43 => "LanguageDescr",
        0x44 => "ShortTextualDescr",
        0x45 => "ExpandedTextualDescr",
        0x46 => "ContentCreatorNameDescr",
        0x47 => "ContentCreationDateDescr",
        0x48 => "OCICreatorNameDescr",
        0x49 => "OCICreationDateDescr",
        0x4A => "SmpteCameraPositionDescr",
        0x15..=0x3F => "Reserved",
        0x4B..=0x5F => "Reserved (OCI extension)",
        0x60..=0xBF => "Reserved (ISO)",
        0xC0..=0xFE => "User private",
        0xFF => "Forbidden",
    }
}

/// Human-readable label for a DecoderConfigDescriptor object type id.
pub fn object_type_label(id: u8) -> Option<&'static str> {
    Some(match id {
        0x01 => "Systems v1",
        0x02 => "Systems v2",
        0x20 => "MPEG-4 video",
        0x21 => "MPEG-4 AVC SPS",
        0x22 => "MPEG-4 AVC PPS",
        0x40 => "MPEG-4 audio",
        0x60 => "MPEG-2 simple video",
        0x61 => "MPEG-2 main video",
        0x62 => "MPEG-2 SNR video",
        0x63 => "MPEG-2 spatial video",
        0x64 => "MPEG-2 high video",
        0x65 => "MPEG-2 4:2:2 video",
        0x66 => "MPEG-4 ADTS main",
        0x67 => "MPEG-4 ADTS low complexity",
        0x68 => "MPEG-4 ADTS scalable sampling rate",
        0x69 => "MPEG-2 ADTS",
        0x6A => "MPEG-1 video",
        0x6B => "MPEG-1 ADTS",
        0x6C => "JPEG video",
        0x6D => "PNG",
        0x6E => "JPEG 2000",
        0xA3 => "VC-1",
        0xA4 => "Dirac",
        0xA5 => "AC-3",
        0xA6 => "Enhanced AC-3",
        0xA9 => "DTS",
        0xAA => "DTS-HD high resolution",
        0xAB => "DTS-HD master audio",
        0xDD => "Vorbis",
        0xE1 => "QCELP 13K voice",
        _ => return None,
    })
}
