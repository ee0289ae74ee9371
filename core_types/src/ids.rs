//! Unique identifiers for notes and requests

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a margin note
///
/// Generated by the main document when an anchor is inserted. The same id
/// names the anchor in the main document and the note block in the margin
/// document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Creates a note ID from an externally generated string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random note ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Note({})", self.0)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NoteId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Correlation identifier for a request/response pair
///
/// Opaque on the wire. Locally generated ids are UUID v4 strings, so
/// collisions between outstanding requests are not a practical concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generates a new random request ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps an id received from the other side of a transport
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Req({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_id_from_str() {
        let id = NoteId::from("n1");
        assert_eq!(id.as_str(), "n1");
        assert_eq!(id, NoteId::new("n1".to_string()));
    }

    #[test]
    fn test_note_id_generate_unique() {
        assert_ne!(NoteId::generate(), NoteId::generate());
    }

    #[test]
    fn test_request_id_generate_unique() {
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();
        assert_ne!(id1, id2);
        assert!(Uuid::parse_str(id1.as_str()).is_ok());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&NoteId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");

        let id: RequestId = serde_json::from_str("\"req-7\"").unwrap();
        assert_eq!(id, RequestId::from_string("req-7"));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(NoteId::new("n1").to_string(), "Note(n1)");
        assert_eq!(RequestId::from_string("r").to_string(), "Req(r)");
    }
}
