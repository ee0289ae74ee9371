//! Envelope contract tests
//!
//! Every message on either channel carries the same base fields.

#[allow(dead_code)]
const FIELD_VERSION: &str = "version";
#[allow(dead_code)]
const FIELD_TIMESTAMP: &str = "timestamp";
#[allow(dead_code)]
const FIELD_CORRELATION_ID: &str = "correlationId";
