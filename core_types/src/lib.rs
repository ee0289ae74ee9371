//! # Core Types
//!
//! This crate defines the fundamental types shared by every Marginalia crate.
//!
//! ## Philosophy
//!
//! - **Opaque identifiers**: Note and request ids are newtypes, never bare strings
//! - **Derived, not assigned**: Note indices come from document order only
//! - **Unsigned positions**: Negative document positions cannot be represented
//!
//! ## Key Types
//!
//! - [`NoteId`]: Stable identifier shared by an anchor and its note block
//! - [`RequestId`]: Correlation identifier for request/response pairs
//! - [`AnchorData`]: Anchor snapshot reported by the main document
//! - [`NoteData`]: Canonical margin note record owned by the reconciler

pub mod ids;
pub mod notes;

pub use ids::{NoteId, RequestId};
pub use notes::{AnchorData, NoteData, NoteIndexEntry};
