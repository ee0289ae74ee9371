//! # Note Reconciler
//!
//! Turns the anchor snapshot reported by the main document into the note
//! list the margin document must hold, plus the commands that get it there.
//!
//! ## Philosophy
//!
//! - **Recompute, never patch**: Note indices are derived from document order
//!   on every call; nothing is inherited from the previous note list
//! - **Deletes before inserts**: A vacated index is never double-occupied
//! - **One repair path**: A trailing `UpdateNoteIndices` is always emitted for
//!   a non-empty result, whatever caused the drift
//! - **Total**: Reconciliation cannot fail
//!
//! ## Duplicate anchors
//!
//! If the snapshot carries the same id more than once, the last occurrence
//! wins and the earlier ones are dropped before sorting. Anchors that share
//! both `line` and `block_index` keep their snapshot order.

use core_types::{AnchorData, NoteData, NoteId};
use ipc::NoteCommand;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Which notes changed between the previous list and the new one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDiff {
    /// In the new list but not the previous one, in document order
    pub added: Vec<NoteId>,
    /// In the previous list but not the new one, in previous-list order
    pub removed: Vec<NoteId>,
    /// In both, with a different note index
    pub reordered: Vec<NoteId>,
}

impl NoteDiff {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.reordered.is_empty()
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// New canonical note list, sorted by document order
    pub notes: Vec<NoteData>,
    /// Deletes, then inserts, then at most one trailing reindex
    pub commands: Vec<NoteCommand>,
    pub diff: NoteDiff,
}

impl ReconcileOutcome {
    /// Commands to send to the margin document
    ///
    /// Empty when nothing changed, so repeated reconciliation of the same
    /// snapshot dispatches nothing.
    pub fn dispatchable_commands(&self) -> &[NoteCommand] {
        if self.diff.has_changes() {
            &self.commands
        } else {
            &[]
        }
    }
}

/// Reconciles an anchor snapshot against the current note list
pub fn reconcile(anchors: &[AnchorData], current_notes: &[NoteData]) -> ReconcileOutcome {
    let mut ordered = last_occurrence_wins(anchors);
    ordered.sort_by(|a, b| a.document_order(b));

    let notes: Vec<NoteData> = ordered
        .iter()
        .enumerate()
        .map(|(position, anchor)| NoteData {
            id: anchor.id.clone(),
            note_index: position as u32 + 1,
            line: anchor.line,
            block_index: anchor.block_index,
        })
        .collect();

    let diff = diff_notes(&notes, current_notes);

    let mut commands = Vec::with_capacity(diff.removed.len() + diff.added.len() + 1);
    commands.extend(
        diff.removed
            .iter()
            .map(|id| NoteCommand::DeleteNoteBlock { note_id: id.clone() }),
    );

    let added: HashSet<&NoteId> = diff.added.iter().collect();
    commands.extend(
        notes
            .iter()
            .filter(|note| added.contains(&note.id))
            .map(|note| NoteCommand::InsertNoteBlock {
                note_id: note.id.clone(),
                note_index: note.note_index,
            }),
    );

    if !notes.is_empty() {
        commands.push(NoteCommand::UpdateNoteIndices {
            entries: notes.iter().map(NoteData::index_entry).collect(),
        });
    }

    if diff.has_changes() {
        debug!(
            notes = notes.len(),
            added = diff.added.len(),
            removed = diff.removed.len(),
            reordered = diff.reordered.len(),
            "reconcile.changed"
        );
    }

    ReconcileOutcome {
        notes,
        commands,
        diff,
    }
}

fn last_occurrence_wins(anchors: &[AnchorData]) -> Vec<&AnchorData> {
    let mut last_position: HashMap<&NoteId, usize> = HashMap::with_capacity(anchors.len());
    for (position, anchor) in anchors.iter().enumerate() {
        last_position.insert(&anchor.id, position);
    }

    if last_position.len() != anchors.len() {
        warn!(
            anchors = anchors.len(),
            unique = last_position.len(),
            "reconcile.duplicate_anchor_ids"
        );
    }

    anchors
        .iter()
        .enumerate()
        .filter(|(position, anchor)| last_position.get(&anchor.id) == Some(position))
        .map(|(_, anchor)| anchor)
        .collect()
}

fn diff_notes(notes: &[NoteData], current_notes: &[NoteData]) -> NoteDiff {
    let current_index: HashMap<&NoteId, u32> = current_notes
        .iter()
        .map(|note| (&note.id, note.note_index))
        .collect();
    let new_ids: HashSet<&NoteId> = notes.iter().map(|note| &note.id).collect();

    let mut diff = NoteDiff::default();
    for note in notes {
        match current_index.get(&note.id) {
            None => diff.added.push(note.id.clone()),
            Some(index) if *index != note.note_index => diff.reordered.push(note.id.clone()),
            Some(_) => {}
        }
    }

    let mut seen = HashSet::new();
    for note in current_notes {
        if !new_ids.contains(&note.id) && seen.insert(&note.id) {
            diff.removed.push(note.id.clone());
        }
    }

    diff
}
