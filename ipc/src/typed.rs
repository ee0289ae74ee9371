//! Typed payloads for the main and margin channels.
//!
//! Every payload is tagged with its `MessageKind` under the `type` key so
//! that it can be flattened next to the envelope fields.

use crate::channel::{Channel, MessageKind};
use crate::message::ChannelPayload;
use core_types::{AnchorData, NoteId, NoteIndexEntry, RequestId};
use serde::{Deserialize, Serialize};

/// Formatting and history commands issued from the toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum FormatCommand {
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    ToggleStrike,
    SetHeading { level: u8 },
    ToggleBulletList,
    ToggleOrderedList,
    Undo,
    Redo,
}

impl FormatCommand {
    /// Parses the short names used by scripts and key bindings
    ///
    /// `heading` takes its level as a suffix: `heading2`.
    pub fn parse(name: &str) -> Option<Self> {
        let command = match name {
            "bold" => FormatCommand::ToggleBold,
            "italic" => FormatCommand::ToggleItalic,
            "underline" => FormatCommand::ToggleUnderline,
            "strike" => FormatCommand::ToggleStrike,
            "bullet-list" => FormatCommand::ToggleBulletList,
            "ordered-list" => FormatCommand::ToggleOrderedList,
            "undo" => FormatCommand::Undo,
            "redo" => FormatCommand::Redo,
            other => {
                let level: u8 = other.strip_prefix("heading")?.parse().ok()?;
                if !(1..=6).contains(&level) {
                    return None;
                }
                FormatCommand::SetHeading { level }
            }
        };
        Some(command)
    }
}

/// Main document to host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MainToHost {
    /// Full anchor snapshot, sent on every content change
    AnchorsChanged { anchors: Vec<AnchorData> },
    MainFocus,
    MainBlur,
    #[serde(rename_all = "camelCase")]
    ContentResponse {
        request_id: RequestId,
        content: String,
    },
}

impl ChannelPayload for MainToHost {
    const CHANNEL: Channel = Channel::Main;

    fn kind(&self) -> MessageKind {
        match self {
            MainToHost::AnchorsChanged { .. } => MessageKind::AnchorsChanged,
            MainToHost::MainFocus => MessageKind::MainFocus,
            MainToHost::MainBlur => MessageKind::MainBlur,
            MainToHost::ContentResponse { .. } => MessageKind::ContentResponse,
        }
    }
}

/// Host to main document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostToMain {
    #[serde(rename_all = "camelCase")]
    GetContent { request_id: RequestId },
    /// Remove the anchor whose note was emptied in the margin
    #[serde(rename_all = "camelCase")]
    DeleteAnchor { note_id: NoteId },
    /// Insert a new anchor at the cursor
    #[serde(rename_all = "camelCase")]
    InsertAnchor { note_id: NoteId },
    ExecFormat { command: FormatCommand },
}

impl ChannelPayload for HostToMain {
    const CHANNEL: Channel = Channel::Main;

    fn kind(&self) -> MessageKind {
        match self {
            HostToMain::GetContent { .. } => MessageKind::GetContent,
            HostToMain::DeleteAnchor { .. } => MessageKind::DeleteAnchor,
            HostToMain::InsertAnchor { .. } => MessageKind::InsertAnchor,
            HostToMain::ExecFormat { .. } => MessageKind::ExecFormat,
        }
    }
}

/// Margin document to host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarginToHost {
    /// A note block gained focus; the id is absent when the margin cannot
    /// tell which block holds the cursor
    #[serde(rename_all = "camelCase")]
    NoteFocus {
        #[serde(default)]
        note_id: Option<NoteId>,
    },
    NoteBlur,
    /// The user emptied a note; the host forwards this to the main document
    #[serde(rename_all = "camelCase")]
    DeleteNote { note_id: NoteId },
    #[serde(rename_all = "camelCase")]
    ContentResponse {
        request_id: RequestId,
        content: String,
    },
}

impl ChannelPayload for MarginToHost {
    const CHANNEL: Channel = Channel::Margin;

    fn kind(&self) -> MessageKind {
        match self {
            MarginToHost::NoteFocus { .. } => MessageKind::NoteFocus,
            MarginToHost::NoteBlur => MessageKind::NoteBlur,
            MarginToHost::DeleteNote { .. } => MessageKind::DeleteNote,
            MarginToHost::ContentResponse { .. } => MessageKind::ContentResponse,
        }
    }
}

/// Host to margin document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostToMargin {
    #[serde(rename_all = "camelCase")]
    InsertNoteBlock { note_id: NoteId, note_index: u32 },
    #[serde(rename_all = "camelCase")]
    DeleteNoteBlock { note_id: NoteId },
    UpdateNoteIndices { entries: Vec<NoteIndexEntry> },
    #[serde(rename_all = "camelCase")]
    GetContent { request_id: RequestId },
    ExecFormat { command: FormatCommand },
}

impl ChannelPayload for HostToMargin {
    const CHANNEL: Channel = Channel::Margin;

    fn kind(&self) -> MessageKind {
        match self {
            HostToMargin::InsertNoteBlock { .. } => MessageKind::InsertNoteBlock,
            HostToMargin::DeleteNoteBlock { .. } => MessageKind::DeleteNoteBlock,
            HostToMargin::UpdateNoteIndices { .. } => MessageKind::UpdateNoteIndices,
            HostToMargin::GetContent { .. } => MessageKind::GetContent,
            HostToMargin::ExecFormat { .. } => MessageKind::ExecFormat,
        }
    }
}

/// Note block commands produced by reconciliation
///
/// A subset of [`HostToMargin`]; the host converts before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NoteCommand {
    InsertNoteBlock { note_id: NoteId, note_index: u32 },
    DeleteNoteBlock { note_id: NoteId },
    UpdateNoteIndices { entries: Vec<NoteIndexEntry> },
}

impl NoteCommand {
    pub fn kind(&self) -> MessageKind {
        match self {
            NoteCommand::InsertNoteBlock { .. } => MessageKind::InsertNoteBlock,
            NoteCommand::DeleteNoteBlock { .. } => MessageKind::DeleteNoteBlock,
            NoteCommand::UpdateNoteIndices { .. } => MessageKind::UpdateNoteIndices,
        }
    }
}

impl From<NoteCommand> for HostToMargin {
    fn from(command: NoteCommand) -> Self {
        match command {
            NoteCommand::InsertNoteBlock {
                note_id,
                note_index,
            } => HostToMargin::InsertNoteBlock {
                note_id,
                note_index,
            },
            NoteCommand::DeleteNoteBlock { note_id } => HostToMargin::DeleteNoteBlock { note_id },
            NoteCommand::UpdateNoteIndices { entries } => {
                HostToMargin::UpdateNoteIndices { entries }
            }
        }
    }
}
