use crate::boxes::FourCC;

/// Closed set of box kinds the handler table knows how to decode.
///
/// Anything else maps to `KnownBox::Unknown(fourcc)` and is skipped by its
/// declared size without creating a tree node: unknown atoms are invisible
/// to the tree, not approximated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level
    Ftyp,
    Mdat,
    Free,

    // moov children
    Moov,
    Mvhd,
    Trak,
    Mvex,
    Udta,

    // trak children
    Tkhd,
    Tref,
    Edts,
    Elst,
    Mdia,

    // mdia children
    Mdhd,
    Hdlr,
    Minf,

    // minf / dinf children
    Dinf,
    Dref,
    Url,
    Urn,
    Stbl,

    // stbl children
    Stsd,
    Stts,
    Ctts,
    Cslg,
    Stss,
    Stsh,
    Sdtp,
    Stdp,
    Stsz,
    Stz2,
    Stsc,
    Stco,
    Co64,
    Padb,
    Subs,

    // sample entries and codec configuration
    Avc1,
    Mp4a,
    Mp4v,
    AvcC,
    Pasp,
    Btrt,
    Esds,

    // fragmented movies
    Mehd,
    Trex,
    Moof,
    Mfhd,
    Traf,
    Tfhd,
    Trun,
    Tfdt,
    Mfra,
    Tfra,
    Mfro,
    Trep,

    // metadata
    Meta,
    Ilst,
    Gshh,
    Data,
    Cprt,

    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,

            b"moov" => KnownBox::Moov,
            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"mvex" => KnownBox::Mvex,
            b"udta" => KnownBox::Udta,

            b"tkhd" => KnownBox::Tkhd,
            b"tref" => KnownBox::Tref,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"mdia" => KnownBox::Mdia,

            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,

            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"url " => KnownBox::Url,
            b"urn " => KnownBox::Urn,
            b"stbl" => KnownBox::Stbl,

            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"ctts" => KnownBox::Ctts,
            b"cslg" => KnownBox::Cslg,
            b"stss" => KnownBox::Stss,
            b"stsh" => KnownBox::Stsh,
            b"sdtp" => KnownBox::Sdtp,
            b"stdp" => KnownBox::Stdp,
            b"stsz" => KnownBox::Stsz,
            b"stz2" => KnownBox::Stz2,
            b"stsc" => KnownBox::Stsc,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"padb" => KnownBox::Padb,
            b"subs" => KnownBox::Subs,

            b"avc1" => KnownBox::Avc1,
            b"mp4a" => KnownBox::Mp4a,
            b"mp4v" => KnownBox::Mp4v,
            b"avcC" => KnownBox::AvcC,
            b"pasp" => KnownBox::Pasp,
            b"btrt" => KnownBox::Btrt,
            b"esds" => KnownBox::Esds,

            b"mehd" => KnownBox::Mehd,
            b"trex" => KnownBox::Trex,
            b"moof" => KnownBox::Moof,
            b"mfhd" => KnownBox::Mfhd,
            b"traf" => KnownBox::Traf,
            b"tfhd" => KnownBox::Tfhd,
            b"trun" => KnownBox::Trun,
            b"tfdt" => KnownBox::Tfdt,
            b"mfra" => KnownBox::Mfra,
            b"tfra" => KnownBox::Tfra,
            b"mfro" => KnownBox::Mfro,
            b"trep" => KnownBox::Trep,

            b"meta" => KnownBox::Meta,
            b"ilst" => KnownBox::Ilst,
            b"gshh" => KnownBox::Gshh,
            b"data" => KnownBox::Data,
            b"cprt" => KnownBox::Cprt,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Containers descended into by the general traversal stack.
    ///
    /// stsd, dref and the meta family also hold children but perform their
    /// own nested walks in the handler, so they are terminal here.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
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
                | KnownBox::Mfra
        )
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Tref => "Track Reference Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Url => "Data Entry URL Box",
            KnownBox::Urn => "Data Entry URN Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Ctts => "Composition Time to Sample Box",
            KnownBox::Cslg => "Composition to Decode Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Stsh => "Shadow Sync Sample Box",
            KnownBox::Sdtp => "Independent and Disposable Samples Box",
            KnownBox::Stdp => "Degradation Priority Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stz2 => "Compact Sample Size Box",
            KnownBox::Stsc => "Sample to Chunk Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::Padb => "Padding Bits Box",
            KnownBox::Subs => "Sub-Sample Information Box",
            KnownBox::Avc1 => "AVC Sample Entry",
            KnownBox::Mp4a => "MP4 Audio Sample Entry",
            KnownBox::Mp4v => "MP4 Visual Sample Entry",
            KnownBox::AvcC => "AVC Configuration Box",
            KnownBox::Pasp => "Pixel Aspect Ratio Box",
            KnownBox::Btrt => "Bit Rate Box",
            KnownBox::Esds => "Elementary Stream Descriptor Box",
            KnownBox::Mehd => "Movie Extends Header Box",
            KnownBox::Trex => "Track Extends Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mfhd => "Movie Fragment Header Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Tfhd => "Track Fragment Header Box",
            KnownBox::Trun => "Track Fragment Run Box",
            KnownBox::Tfdt => "Track Fragment Base Media Decode Time Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Tfra => "Track Fragment Random Access Box",
            KnownBox::Mfro => "Movie Fragment Random Access Offset Box",
            KnownBox::Trep => "Track Extension Properties Box",
            KnownBox::Meta => "Metadata Box",
            KnownBox::Ilst => "Item List Box",
            KnownBox::Gshh => "Google Hosted Header Box",
            KnownBox::Data => "Data Box",
            KnownBox::Cprt => "Copyright Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
