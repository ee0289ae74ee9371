//! Margin document channel contract tests
//!
//! These tests define the stable contract between the host and the margin
//! document.

// ===== Message Names =====
#[allow(dead_code)]
const NOTE_FOCUS: &str = "NOTE_FOCUS";
#[allow(dead_code)]
const NOTE_BLUR: &str = "NOTE_BLUR";
#[allow(dead_code)]
const DELETE_NOTE: &str = "DELETE_NOTE";
#[allow(dead_code)]
const INSERT_NOTE_BLOCK: &str = "INSERT_NOTE_BLOCK";
#[allow(dead_code)]
const DELETE_NOTE_BLOCK: &str = "DELETE_NOTE_BLOCK";
#[allow(dead_code)]
const UPDATE_NOTE_INDICES: &str = "UPDATE_NOTE_INDICES";
