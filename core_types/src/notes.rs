//! Anchor and note records

use crate::NoteId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Anchor snapshot reported by the main document
///
/// A new report replaces the previous set entirely.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorData {
    /// Note id carried by the anchor mark
    pub id: NoteId,
    /// Document-order position proxy
    pub line: u32,
    /// Tie-breaker for anchors on the same line
    pub block_index: u32,
}

impl AnchorData {
    /// Creates a new anchor snapshot
    pub fn new(id: impl Into<NoteId>, line: u32, block_index: u32) -> Self {
        Self {
            id: id.into(),
            line,
            block_index,
        }
    }

    /// Compares two anchors by document order
    pub fn document_order(&self, other: &Self) -> Ordering {
        (self.line, self.block_index).cmp(&(other.line, other.block_index))
    }
}

/// Canonical record of a margin note
///
/// Only the reconciler produces these. `note_index` is 1-based and derived
/// from document order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteData {
    pub id: NoteId,
    pub note_index: u32,
    pub line: u32,
    pub block_index: u32,
}

impl NoteData {
    /// Returns the `(id, index)` pair used by reindex commands
    pub fn index_entry(&self) -> NoteIndexEntry {
        NoteIndexEntry {
            note_id: self.id.clone(),
            note_index: self.note_index,
        }
    }
}

/// A single `(note id, note index)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteIndexEntry {
    pub note_id: NoteId,
    pub note_index: u32,
}
