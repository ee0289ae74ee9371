//! Main document channel contract tests
//!
//! These tests define the stable contract between the host and the main
//! document.

// ===== Message Names =====
#[allow(dead_code)]
const ANCHORS_CHANGED: &str = "ANCHORS_CHANGED";
#[allow(dead_code)]
const MAIN_FOCUS: &str = "MAIN_FOCUS";
#[allow(dead_code)]
const MAIN_BLUR: &str = "MAIN_BLUR";
#[allow(dead_code)]
const CONTENT_RESPONSE: &str = "CONTENT_RESPONSE";
#[allow(dead_code)]
const GET_CONTENT: &str = "GET_CONTENT";
#[allow(dead_code)]
const DELETE_ANCHOR: &str = "DELETE_ANCHOR";
#[allow(dead_code)]
const INSERT_ANCHOR: &str = "INSERT_ANCHOR";
#[allow(dead_code)]
const EXEC_FORMAT: &str = "EXEC_FORMAT";
