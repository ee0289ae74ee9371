//! Legacy name contract tests
//!
//! Older document bridges still speak these names. The table is frozen: a
//! row may be removed once no bridge sends it, never renamed.

/// Every legacy name and the typed name it stands for
#[allow(dead_code)]
const LEGACY_CONTRACT: &[(&str, &str)] = &[
    ("anchors-update", "ANCHORS_CHANGED"),
    ("editor-focus", "MAIN_FOCUS"),
    ("editor-blur", "MAIN_BLUR"),
    ("margin-focus", "NOTE_FOCUS"),
    ("margin-blur", "NOTE_BLUR"),
    ("note-emptied", "DELETE_NOTE"),
    ("request-content", "GET_CONTENT"),
    ("content", "CONTENT_RESPONSE"),
    ("remove-anchor", "DELETE_ANCHOR"),
    ("add-anchor", "INSERT_ANCHOR"),
    ("format", "EXEC_FORMAT"),
    ("insert-note", "INSERT_NOTE_BLOCK"),
    ("delete-note", "DELETE_NOTE_BLOCK"),
    ("reindex-notes", "UPDATE_NOTE_INDICES"),
];
