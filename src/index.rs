use crate::boxes::{BoxId, FourCC, HandlerKind, ParseContext};
use serde::Serialize;
use std::collections::HashMap;

/// One registration: a tree back-reference plus the interpretation
/// context that was active when the box was visited.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IndexEntry {
    pub id: BoxId,
    pub ctx: ParseContext,
}

/// Type-keyed multimap over every decoded box, in visit order per type.
///
/// Owned by the parse output; entries are ids into the output's tree,
/// never ownership edges.
#[derive(Debug, Default, Serialize)]
pub struct TypeIndex {
    map: HashMap<FourCC, Vec<IndexEntry>>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, typ: FourCC, id: BoxId, ctx: ParseContext) {
        self.map.entry(typ).or_default().push(IndexEntry { id, ctx });
    }

    pub fn get(&self, typ: FourCC) -> &[IndexEntry] {
        self.map.get(&typ).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Boxes of `typ` belonging to tracks of the given media kind.
    pub fn find_by_handler(&self, typ: FourCC, handler: HandlerKind) -> Vec<BoxId> {
        self.get(typ).iter().filter(|e| e.ctx.handler == handler).map(|e| e.id).collect()
    }

    /// Boxes of `typ` belonging to the given track.
    pub fn find_by_track(&self, typ: FourCC, track_id: u32) -> Vec<BoxId> {
        self.get(typ).iter().filter(|e| e.ctx.track_id == track_id).map(|e| e.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FourCC, &[IndexEntry])> {
        self.map.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Total number of registrations across all types.
    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
