//! Streaming ISOBMFF/MP4 box-tree decoder.
//!
//! Given raw byte buffers, [`Mp4Parser`] locates the brand and movie
//! header, then materializes the box tree: every recognized box becomes a
//! typed node, containers carry their children in on-disk order, and a
//! type-keyed index allows direct lookup of any box kind together with
//! the track and media-handler context it was found under.
//!
//! Sample tables are captured as raw byte ranges with stride and column
//! metadata rather than being exploded into per-row records; media data
//! (`mdat`) is never copied.

pub mod api;
pub mod boxes;
pub mod cursor;
pub mod descriptors;
pub mod handlers;
pub mod index;
pub mod known_boxes;
pub mod parser;

pub use api::{Mp4Parser, ParserResponse};
pub use boxes::{
    BoxData, BoxHeader, BoxId, BoxNode, BoxTree, FourCC, FullBoxHeader, HandlerKind, ParseContext,
    TableData,
};
pub use index::TypeIndex;
pub use known_boxes::KnownBox;
pub use parser::{locate_header, parse_header, Diagnostic, ParseError, ParseLimits, ParseOutput};
