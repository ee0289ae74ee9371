//! Legacy message-name compatibility.
//!
//! Older document bridges speak flat lowercase-hyphen names. The table below
//! maps each of them to exactly one typed name and back, so bridges can be
//! migrated one at a time. It is not part of the steady-state contract.

use crate::channel::MessageKind;
use crate::message::ProtocolError;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

/// Legacy name to typed kind, one row per kind
pub const LEGACY_NAMES: &[(&str, MessageKind)] = &[
    ("anchors-update", MessageKind::AnchorsChanged),
    ("editor-focus", MessageKind::MainFocus),
    ("editor-blur", MessageKind::MainBlur),
    ("margin-focus", MessageKind::NoteFocus),
    ("margin-blur", MessageKind::NoteBlur),
    ("note-emptied", MessageKind::DeleteNote),
    ("request-content", MessageKind::GetContent),
    ("content", MessageKind::ContentResponse),
    ("remove-anchor", MessageKind::DeleteAnchor),
    ("add-anchor", MessageKind::InsertAnchor),
    ("format", MessageKind::ExecFormat),
    ("insert-note", MessageKind::InsertNoteBlock),
    ("delete-note", MessageKind::DeleteNoteBlock),
    ("reindex-notes", MessageKind::UpdateNoteIndices),
];

static LEGACY_TO_TYPED: Lazy<HashMap<&'static str, MessageKind>> =
    Lazy::new(|| LEGACY_NAMES.iter().copied().collect());

static TYPED_TO_LEGACY: Lazy<HashMap<MessageKind, &'static str>> = Lazy::new(|| {
    LEGACY_NAMES
        .iter()
        .map(|(legacy, kind)| (*kind, *legacy))
        .collect()
});

/// Maps a legacy name to its typed kind
pub fn legacy_to_typed(name: &str) -> Result<MessageKind, ProtocolError> {
    LEGACY_TO_TYPED
        .get(name)
        .copied()
        .ok_or_else(|| ProtocolError::UnknownLegacyName(name.to_string()))
}

/// Maps a typed kind to its legacy name
pub fn typed_to_legacy(kind: MessageKind) -> Option<&'static str> {
    TYPED_TO_LEGACY.get(&kind).copied()
}

/// Rewrites the `type` tag of a legacy message to its typed name
///
/// A message whose tag is already a typed name passes through unchanged.
pub fn upgrade_legacy(mut message: Value) -> Result<Value, ProtocolError> {
    let tag = message
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if MessageKind::from_str(tag).is_ok() {
        return Ok(message);
    }

    let kind = legacy_to_typed(tag)?;
    message["type"] = Value::from(kind.as_str());
    Ok(message)
}

/// Rewrites the `type` tag of a typed message to its legacy name
pub fn downgrade_to_legacy(mut message: Value) -> Result<Value, ProtocolError> {
    let tag = message
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    let kind =
        MessageKind::from_str(tag).map_err(|_| ProtocolError::UnknownKind(tag.to_string()))?;
    let legacy = typed_to_legacy(kind).ok_or_else(|| ProtocolError::UnknownKind(tag.to_string()))?;
    message["type"] = Value::from(legacy);
    Ok(message)
}
