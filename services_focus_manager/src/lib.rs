//! # Focus Manager Service
//!
//! This crate tracks which editing surface owns keyboard and toolbar input:
//! nothing, the main document, or one specific margin note.
//!
//! ## Philosophy
//!
//! - **Pure transitions**: [`reduce`] is a total function with no side effects
//! - **Never rejects**: Out-of-order or ambiguous focus events degrade to the
//!   nearest defined transition; unmatched pairs are identity
//! - **Single consumer value**: Command routing only ever reads
//!   [`FocusState::toolbar_target`]
//! - **Auditable**: [`FocusManager`] records every transition that changed state
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A focus stack (there is no "previous" surface to return to)
//! - A window manager (no geometry, no z-order)
//! - A global focus singleton

use core_types::NoteId;
use ipc::{Channel, FormatCommand};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which surface currently owns input
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FocusState {
    /// Nothing focused
    #[default]
    Idle,
    /// The main document owns input
    MainFocused,
    /// A specific margin note owns input
    #[serde(rename_all = "camelCase")]
    NoteFocused { note_id: NoteId },
}

/// Focus input reported by either document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FocusEvent {
    MainFocus,
    MainBlur,
    #[serde(rename_all = "camelCase")]
    NoteFocus { note_id: NoteId },
    NoteBlur,
    Reset,
}

/// Destination for toolbar commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolbarTarget {
    Main,
    Margin,
}

impl ToolbarTarget {
    /// Channel a routed command is sent on
    pub fn channel(&self) -> Channel {
        match self {
            ToolbarTarget::Main => Channel::Main,
            ToolbarTarget::Margin => Channel::Margin,
        }
    }
}

/// Computes the next focus state
///
/// Total and side-effect free. Any `(state, event)` pair not listed in the
/// transition table returns `state` unchanged.
pub fn reduce(state: &FocusState, event: &FocusEvent) -> FocusState {
    match (state, event) {
        (_, FocusEvent::Reset) => FocusState::Idle,

        (FocusState::Idle, FocusEvent::MainFocus) => FocusState::MainFocused,
        (FocusState::Idle, FocusEvent::NoteFocus { note_id }) => FocusState::NoteFocused {
            note_id: note_id.clone(),
        },

        (FocusState::MainFocused, FocusEvent::MainBlur) => FocusState::Idle,
        (FocusState::MainFocused, FocusEvent::NoteFocus { note_id }) => FocusState::NoteFocused {
            note_id: note_id.clone(),
        },

        (FocusState::NoteFocused { .. }, FocusEvent::NoteBlur) => FocusState::Idle,
        (FocusState::NoteFocused { .. }, FocusEvent::MainFocus) => FocusState::MainFocused,
        // Replaced even when the id is unchanged.
        (FocusState::NoteFocused { .. }, FocusEvent::NoteFocus { note_id }) => {
            FocusState::NoteFocused {
                note_id: note_id.clone(),
            }
        }

        (state, _) => state.clone(),
    }
}

impl FocusState {
    pub fn is_main_focused(&self) -> bool {
        matches!(self, FocusState::MainFocused)
    }

    pub fn is_note_focused(&self) -> bool {
        matches!(self, FocusState::NoteFocused { .. })
    }

    /// Returns the focused note, if a note owns input
    pub fn focused_note_id(&self) -> Option<&NoteId> {
        match self {
            FocusState::NoteFocused { note_id } => Some(note_id),
            _ => None,
        }
    }

    /// Where toolbar commands go right now
    ///
    /// `Main` iff the main document is focused, `Margin` iff a note is
    /// focused, `None` when idle.
    pub fn toolbar_target(&self) -> Option<ToolbarTarget> {
        match self {
            FocusState::Idle => None,
            FocusState::MainFocused => Some(ToolbarTarget::Main),
            FocusState::NoteFocused { .. } => Some(ToolbarTarget::Margin),
        }
    }

    pub fn has_any_focus(&self) -> bool {
        !matches!(self, FocusState::Idle)
    }
}

/// Audit record for a state-changing focus event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusTransition {
    /// Position of the event in the manager's event stream
    pub sequence: u64,
    pub event: FocusEvent,
    pub from: FocusState,
    pub to: FocusState,
}

/// Focus manager
///
/// Owns the live [`FocusState`] for one host and applies events in dispatch
/// order through [`reduce`].
pub struct FocusManager {
    /// Current state
    state: FocusState,
    /// Audit trail of state changes
    audit_trail: Vec<FocusTransition>,
    /// Sequence number of the next event
    next_sequence: u64,
}

impl FocusManager {
    /// Creates a new focus manager in the `Idle` state
    pub fn new() -> Self {
        Self {
            state: FocusState::Idle,
            audit_trail: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Applies an event and returns the resulting state
    pub fn apply(&mut self, event: FocusEvent) -> &FocusState {
        let sequence = self.next_sequence();
        let next = reduce(&self.state, &event);

        if next != self.state {
            debug!(
                sequence,
                event = ?event,
                from = ?self.state,
                to = ?next,
                "focus.transition"
            );
            let from = std::mem::replace(&mut self.state, next);
            self.audit_trail.push(FocusTransition {
                sequence,
                event,
                from,
                to: self.state.clone(),
            });
        }

        &self.state
    }

    /// Returns the current state
    pub fn current(&self) -> &FocusState {
        &self.state
    }

    /// Returns the destination for a toolbar command, if anything is focused
    pub fn route(&self, command: &FormatCommand) -> Option<ToolbarTarget> {
        let target = self.state.toolbar_target();
        if target.is_none() {
            debug!(command = ?command, "focus.route.no_target");
        }
        target
    }

    /// Returns to `Idle`
    pub fn reset(&mut self) -> &FocusState {
        self.apply(FocusEvent::Reset)
    }

    /// Returns the audit trail
    pub fn audit_trail(&self) -> &[FocusTransition] {
        &self.audit_trail
    }

    /// Clears the audit trail (for testing)
    #[cfg(test)]
    pub fn clear_audit_trail(&mut self) {
        self.audit_trail.clear();
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }
}

impl Default for FocusManager {
    fn default() -> Self {
        Self::new()
    }
}
