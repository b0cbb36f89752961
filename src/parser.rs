//! Header location and the box-tree traversal engine.
//!
//! Parsing runs in two phases. Header location scans a prefix buffer (and
//! optionally a suffix buffer, for movies whose index trails the media
//! data) for the brand and movie-header boxes by byte pattern, and copies
//! them into one isolated buffer. Traversal then walks that buffer with an
//! explicit work stack, one box per iteration; depth never touches the
//! call stack, so a pathologically nested file cannot overflow it.

use crate::boxes::{
    BoxData, BoxHeader, BoxId, BoxTree, BuiltNode, FourCC, FtypData, ParseContext,
};
use crate::cursor::ByteCursor;
use crate::handlers::decode_box;
use crate::index::TypeIndex;
use crate::known_boxes::KnownBox;
use serde::Serialize;

const STD_HEADER: u64 = 8;
const EXT_HEADER: u64 = 16;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("no movie header ('moov') found in the supplied buffers")]
    HeaderNotFound,
    #[error("no boxes decoded from the header buffer")]
    NoBoxes,
    #[error("parse exceeded the configured limit of {limit} boxes")]
    IterationLimit { limit: u64 },
}

/// A recoverable oddity observed while parsing. Diagnostics are part of
/// the output, not a side channel; the host decides whether to surface
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Byte offset into the isolated header buffer.
    pub offset: u64,
    pub message: String,
}

impl Diagnostic {
    pub fn new(offset: u64, message: impl Into<String>) -> Self {
        Self { offset, message: message.into() }
    }
}

/// External ceiling on traversal work, checked once per visited box.
/// Cancellation stays with the caller; the engine itself never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseLimits {
    pub max_boxes: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ParseOutput {
    pub tree: BoxTree,
    /// Top-level ids in buffer order (brand box first when present).
    pub roots: Vec<BoxId>,
    pub brand: Option<FtypData>,
    pub index: TypeIndex,
    pub diagnostics: Vec<Diagnostic>,
}

/// Locate the brand and movie-header boxes and copy them into one
/// contiguous buffer. `head` is scanned first; `tail` covers files whose
/// moov trails the media data and was fetched as a suffix.
pub fn locate_header(head: &[u8], tail: Option<&[u8]>) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::new();
    if let Some(ftyp) = find_box(head, b"ftyp") {
        out.extend_from_slice(ftyp);
    }
    let moov = find_box(head, b"moov").or_else(|| tail.and_then(|t| find_box(t, b"moov")));
    match moov {
        Some(bytes) => {
            out.extend_from_slice(bytes);
            Ok(out)
        }
        None => Err(ParseError::HeaderNotFound),
    }
}

/// Byte-pattern scan for a box of type `fourcc`: the pattern sits four
/// bytes past the box start (after the 32-bit size field). Candidates
/// whose size field is implausible are skipped and the scan continues.
fn find_box<'a>(buf: &'a [u8], fourcc: &[u8; 4]) -> Option<&'a [u8]> {
    let cur = ByteCursor::new(buf);
    let mut from = 0;
    while let Some(p) = cur.find(fourcc, from) {
        from = p + 1;
        let Some(start) = p.checked_sub(4) else { continue };
        let size32 = u32::from_be_bytes(buf[start..start + 4].try_into().ok()?);
        let (size, header_size) = match size32 {
            0 => ((buf.len() - start) as u64, STD_HEADER),
            1 => {
                if buf.len() < start + EXT_HEADER as usize {
                    continue;
                }
                let s = u64::from_be_bytes(buf[start + 8..start + 16].try_into().ok()?);
                (s, EXT_HEADER)
            }
            s => (s as u64, STD_HEADER),
        };
        if size < header_size {
            continue;
        }
        let end = ((start as u64 + size).min(buf.len() as u64)) as usize;
        return Some(&buf[start..end]);
    }
    None
}

/// One pending scan window: decode boxes from `pos` up to `end` under
/// `parent` with the given interpretation context.
struct ParseTask {
    parent: Option<BoxId>,
    pos: usize,
    end: usize,
    ctx: ParseContext,
}

/// Walk the isolated header buffer and build the tree, the type index and
/// the diagnostics list. Fails only when nothing at all was decoded or the
/// caller's box ceiling was hit.
pub fn parse_header(buf: &[u8], limits: &ParseLimits) -> Result<ParseOutput, ParseError> {
    let mut tree = BoxTree::new();
    let mut index = TypeIndex::new();
    let mut diagnostics = Vec::new();
    let mut roots = Vec::new();
    let mut brand = None;

    let mut stack = vec![ParseTask {
        parent: None,
        pos: 0,
        end: buf.len(),
        ctx: ParseContext::default(),
    }];
    let mut visited = 0u64;

    while let Some(task) = stack.pop() {
        let ParseTask { parent, pos, end, mut ctx } = task;
        if end.saturating_sub(pos) < STD_HEADER as usize {
            continue;
        }
        if let Some(max) = limits.max_boxes {
            visited += 1;
            if visited > max {
                return Err(ParseError::IterationLimit { limit: max });
            }
        }

        let mut cur = ByteCursor::window(buf, pos, end);
        // The length check above guarantees a standard header fits.
        let Ok(size32) = cur.read_u32() else { continue };
        let Ok(cc) = cur.read_fourcc() else { continue };
        let typ = FourCC(cc);
        let (size, header_size) = match size32 {
            0 => ((end - pos) as u64, STD_HEADER),
            1 => match cur.read_u64() {
                Ok(s) => (s, EXT_HEADER),
                Err(_) => {
                    diagnostics.push(Diagnostic::new(
                        pos as u64,
                        format!("box '{typ}' declares a 64-bit size but the window ends first"),
                    ));
                    continue;
                }
            },
            s => (s as u64, STD_HEADER),
        };

        if size <= header_size {
            // The declared extent must exceed the header itself; a box
            // holding nothing but its header is malformed too. Step over
            // one standard header so the scan makes progress instead of
            // looping on the same bytes.
            diagnostics.push(Diagnostic::new(
                pos as u64,
                format!("box '{typ}' has malformed size {size}"),
            ));
            stack.push(ParseTask { parent, pos: pos + STD_HEADER as usize, end, ctx });
            continue;
        }

        // Advance by the full declared size, clamped to the window; the
        // header keeps the exact declared value.
        let next = ((pos as u64).saturating_add(size)).min(end as u64) as usize;
        let payload_start = (pos + header_size as usize).min(next);
        let header = BoxHeader { typ, size, offset: pos as u64, header_size };

        let kind = KnownBox::from(typ);
        if let KnownBox::Unknown(_) = kind {
            // Skipped by size; invisible to the tree and the index.
            stack.push(ParseTask { parent, pos: next, end, ctx });
            continue;
        }

        let mut payload = ByteCursor::window(buf, payload_start, next);
        match decode_box(kind, &mut payload, &header, ctx) {
            Ok(outcome) => {
                diagnostics.extend(outcome.warnings);

                match &outcome.node.data {
                    BoxData::Ftyp(data) => brand = Some(data.clone()),
                    BoxData::Tkhd(data) => ctx.track_id = data.track_id,
                    BoxData::Hdlr(data) => ctx.handler = data.kind,
                    _ => {}
                }

                let is_container = outcome.is_container;
                let ids = tree.insert_built(parent, outcome.node);
                if parent.is_none() {
                    roots.push(ids[0]);
                }
                for &id in &ids {
                    index.insert(tree.get(id).header.typ, id, ctx);
                }

                // Later siblings first, then the container's interior, so
                // the interior is scanned next (preorder).
                stack.push(ParseTask { parent, pos: next, end, ctx });
                if is_container {
                    let child_ctx = if kind == KnownBox::Trak {
                        ParseContext::default()
                    } else {
                        ctx
                    };
                    stack.push(ParseTask {
                        parent: Some(ids[0]),
                        pos: payload_start,
                        end: next,
                        ctx: child_ctx,
                    });
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::new(
                    pos as u64,
                    format!("box '{typ}' truncated before any field: {e}"),
                ));
                let ids =
                    tree.insert_built(parent, BuiltNode::leaf(header, None, BoxData::Opaque));
                if parent.is_none() {
                    roots.push(ids[0]);
                }
                index.insert(typ, ids[0], ctx);
                stack.push(ParseTask { parent, pos: next, end, ctx });
            }
        }
    }

    if tree.is_empty() {
        return Err(ParseError::NoBoxes);
    }
    Ok(ParseOutput { tree, roots, brand, index, diagnostics })
}
