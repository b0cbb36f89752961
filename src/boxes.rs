use crate::cursor::printable_ascii;
use crate::descriptors::Descriptor;
use serde::Serialize;
use std::fmt;

#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub fn from_str(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() == 4 {
            Some(FourCC([b[0], b[1], b[2], b[3]]))
        } else {
            None
        }
    }

    pub fn as_str_lossy(&self) -> String {
        printable_ascii(&self.0)
    }
}

impl fmt::Debug for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str_lossy())
    }
}

impl Serialize for FourCC {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.as_str_lossy())
    }
}

/// The size+type prefix common to every box.
///
/// `size` is the total encoded length including the header, exactly as
/// declared on disk (64-bit when the 32-bit size field was 1). `offset`
/// is relative to the buffer the box was parsed from.
#[derive(Debug, Clone, Serialize)]
pub struct BoxHeader {
    pub typ: FourCC,
    pub size: u64,
    pub offset: u64,
    /// 8 for a standard header, 16 when the 64-bit size extension is used.
    pub header_size: u64,
}

/// Version + 24-bit flags prefix carried by FullBox kinds.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FullBoxHeader {
    pub version: u8,
    pub flags: u32,
}

/// Media kind declared by a track's handler box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    Video,
    Audio,
    Hint,
    #[default]
    Other,
}

impl HandlerKind {
    pub fn from_fourcc(cc: FourCC) -> Self {
        match &cc.0 {
            b"vide" => HandlerKind::Video,
            b"soun" => HandlerKind::Audio,
            b"hint" => HandlerKind::Hint,
            _ => HandlerKind::Other,
        }
    }
}

/// Per-branch interpretation state threaded down one container's
/// descendants. Several box kinds are generically typed but must be
/// decoded according to the media handler owning the enclosing track,
/// notably the sample-description payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ParseContext {
    pub track_id: u32,
    pub handler: HandlerKind,
}

/// Handle into a [`BoxTree`]. A back-reference, never an ownership edge;
/// invalid once the owning tree is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoxId(pub usize);

#[derive(Debug, Clone, Serialize)]
pub struct BoxNode {
    pub header: BoxHeader,
    pub full: Option<FullBoxHeader>,
    pub data: BoxData,
    /// Child ids in on-disk order (sample-table correlation depends on it).
    pub children: Vec<BoxId>,
}

/// Arena holding every parsed box. Containers reference children by id so
/// the type index can point back into the tree without ownership cycles.
#[derive(Debug, Default, Serialize)]
pub struct BoxTree {
    nodes: Vec<BoxNode>,
}

impl BoxTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: BoxNode) -> BoxId {
        let id = BoxId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: BoxId) -> &BoxNode {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: BoxId) -> &mut BoxNode {
        &mut self.nodes[id.0]
    }

    pub fn add_child(&mut self, parent: BoxId, child: BoxId) {
        self.nodes[parent.0].children.push(child);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a handler-built subtree under `parent` (or as a root when
    /// `parent` is `None`), returning the ids of every inserted node in
    /// preorder (subtree root first).
    pub fn insert_built(&mut self, parent: Option<BoxId>, built: BuiltNode) -> Vec<BoxId> {
        let mut out = Vec::new();
        let id = self.insert_built_inner(built, &mut out);
        if let Some(p) = parent {
            self.add_child(p, id);
        }
        out
    }

    fn insert_built_inner(&mut self, built: BuiltNode, out: &mut Vec<BoxId>) -> BoxId {
        let BuiltNode { header, full, data, children } = built;
        let id = self.alloc(BoxNode { header, full, data, children: Vec::new() });
        out.push(id);
        for child in children {
            let cid = self.insert_built_inner(child, out);
            self.add_child(id, cid);
        }
        id
    }
}

/// A decoded subtree before arena insertion. Handlers that walk nested
/// boxes themselves (stsd sample entries, dref, meta) return this shape.
#[derive(Debug, Clone)]
pub struct BuiltNode {
    pub header: BoxHeader,
    pub full: Option<FullBoxHeader>,
    pub data: BoxData,
    pub children: Vec<BuiltNode>,
}

impl BuiltNode {
    pub fn leaf(header: BoxHeader, full: Option<FullBoxHeader>, data: BoxData) -> Self {
        Self { header, full, data, children: Vec::new() }
    }
}

/// Typed payload of a parsed box.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoxData {
    Ftyp(FtypData),
    /// Pure container; the payload is the child list.
    Container,
    Mvhd(MvhdData),
    Tkhd(TkhdData),
    /// Track reference payload, kept raw (32-bit track ids).
    Tref { raw: Vec<u8> },
    Mdhd(MdhdData),
    Hdlr(HdlrData),
    Dref { entry_count: u32 },
    DataEntry(DataEntryData),
    Stsd { entry_count: u32 },
    VideoSampleEntry(VideoSampleEntryData),
    AudioSampleEntry(AudioSampleEntryData),
    HintSampleEntry { raw: Vec<u8> },
    AvcConfig(AvcConfigData),
    PixelAspect { h_spacing: u32, v_spacing: u32 },
    Bitrate { buffer_size_db: u32, max_bitrate: u32, avg_bitrate: u32 },
    Esds { es_descriptor: Descriptor },
    Table(TableData),
    Stsz(StszData),
    Stz2(Stz2Data),
    Cslg(CslgData),
    Mehd { fragment_duration: u64 },
    Trex(TrexData),
    Mfhd { sequence_number: u32 },
    Tfhd(TfhdData),
    Trun(TrunData),
    Tfdt { base_media_decode_time: u64 },
    Tfra(TfraData),
    Mfro { mfra_size: u32 },
    Trep { track_id: u32 },
    Cprt { language: String, notice: String },
    Data { content: String },
    /// Leaf kept without decoded fields (mdat, free, unknown sub-entries,
    /// and the fallback when a handler hits a decode gap).
    Opaque,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FtypData {
    pub major_brand: FourCC,
    pub minor_version: u32,
    pub compatible_brands: Vec<FourCC>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MvhdData {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// 16.16 fixed-point playback rate, raw.
    pub rate: u32,
    pub volume: u16,
    pub matrix: [u32; 9],
    pub next_track_id: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TkhdData {
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: u16,
    pub matrix: [u32; 9],
    /// 16.16 fixed-point, raw.
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MdhdData {
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// ISO-639-2/T code unpacked from the 15-bit field ("und" when zero).
    pub language: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HdlrData {
    pub handler_type: FourCC,
    pub kind: HandlerKind,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataEntryData {
    pub location: Option<String>,
    pub name: Option<String>,
    /// Flag bit 0: media lives in the same file, entry carries no fields.
    pub self_contained: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VideoSampleEntryData {
    pub data_reference_index: u16,
    pub version: u16,
    pub revision: u16,
    pub vendor: u32,
    pub temporal_quality: u32,
    pub spatial_quality: u32,
    pub width: u16,
    pub height: u16,
    /// 16.16 fixed-point dpi, integer part.
    pub horiz_resolution: u32,
    pub vert_resolution: u32,
    pub data_size: u32,
    pub frame_count: u16,
    pub compressor_name: String,
    pub depth: u16,
    pub color_table_id: u16,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AudioSampleEntryData {
    pub data_reference_index: u16,
    pub version: u16,
    pub revision: u16,
    pub vendor: u32,
    pub channel_count: u16,
    pub sample_size: u16,
    pub compression_id: i16,
    pub packet_size: u16,
    /// 16.16 fixed-point Hz, raw.
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AvcConfigData {
    pub configuration_version: u8,
    pub profile: u8,
    pub profile_label: Option<&'static str>,
    pub compatibility: u8,
    pub level: u8,
    /// NAL unit length field width minus one, from the low 2 bits.
    pub nal_length_size: u8,
    /// Sequence parameter sets, hex-rendered.
    pub sps: Vec<String>,
    /// Picture parameter sets, hex-rendered.
    pub pps: Vec<String>,
}

/// A sample-table payload captured as its raw undivided byte range.
///
/// Rows are sliced lazily via [`TableData::entry`] instead of being
/// exploded into records at parse time.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableData {
    pub entry_count: u32,
    /// Bytes per row; 0 marks variable-stride tables (subs, padb), which
    /// skip the length invariant.
    pub entry_stride: u32,
    /// Semantic labels for the stride's sub-fields.
    pub columns: &'static [&'static str],
    pub raw: Vec<u8>,
}

impl TableData {
    pub fn expected_len(&self) -> Option<u64> {
        (self.entry_stride != 0).then(|| self.entry_count as u64 * self.entry_stride as u64)
    }

    /// `raw.len() == entry_count * entry_stride`; deviation indicates a
    /// malformed or unsupported-version box.
    pub fn is_consistent(&self) -> bool {
        match self.expected_len() {
            Some(want) => self.raw.len() as u64 == want,
            None => true,
        }
    }

    /// Undecoded bytes of row `i`, for fixed-stride tables.
    pub fn entry(&self, i: u32) -> Option<&[u8]> {
        if self.entry_stride == 0 || i >= self.entry_count {
            return None;
        }
        let start = i as usize * self.entry_stride as usize;
        let end = start + self.entry_stride as usize;
        self.raw.get(start..end)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StszData {
    /// Constant size for all samples; 0 means per-sample sizes in the table.
    pub sample_size: u32,
    pub table: TableData,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stz2Data {
    /// 4, 8 or 16 bits per entry.
    pub field_size: u8,
    pub table: TableData,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CslgData {
    pub composition_to_dts_shift: i64,
    pub least_decode_to_display_delta: i64,
    pub greatest_decode_to_display_delta: i64,
    pub composition_start_time: i64,
    pub composition_end_time: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrexData {
    pub track_id: u32,
    pub default_sample_description_index: u32,
    pub default_sample_duration: u32,
    pub default_sample_size: u32,
    pub default_sample_flags: u32,
}

/// Track fragment header; every field after track_id is gated by a flag bit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TfhdData {
    pub track_id: u32,
    pub base_data_offset: Option<u64>,
    pub sample_description_index: Option<u32>,
    pub default_sample_duration: Option<u32>,
    pub default_sample_size: Option<u32>,
    pub default_sample_flags: Option<u32>,
    pub duration_is_empty: bool,
    pub default_base_is_moof: bool,
}

/// Track fragment run; per-sample columns depend on the flag bits, so the
/// sample rows are kept raw with the effective stride and column labels.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrunData {
    pub sample_count: u32,
    pub data_offset: Option<i32>,
    pub first_sample_flags: Option<u32>,
    pub sample_stride: u32,
    pub sample_columns: Vec<&'static str>,
    pub samples_raw: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TfraData {
    pub track_id: u32,
    pub length_size_of_traf_num: u8,
    pub length_size_of_trun_num: u8,
    pub length_size_of_sample_num: u8,
    pub entry_count: u32,
    pub raw: Vec<u8>,
}
