//! Channels and message kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

/// One of the two document channels the host talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// The main document (carries anchors)
    Main,
    /// The margin document (carries note blocks)
    Margin,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Main => write!(f, "main"),
            Channel::Margin => write!(f, "margin"),
        }
    }
}

/// Closed set of typed message names
///
/// The string form is the `type` tag written on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    AnchorsChanged,
    MainFocus,
    MainBlur,
    NoteFocus,
    NoteBlur,
    DeleteNote,
    GetContent,
    ContentResponse,
    DeleteAnchor,
    InsertAnchor,
    ExecFormat,
    InsertNoteBlock,
    DeleteNoteBlock,
    UpdateNoteIndices,
}

impl MessageKind {
    /// Returns the typed wire name
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Channels this kind may travel on
    pub fn channels(&self) -> &'static [Channel] {
        match self {
            MessageKind::AnchorsChanged
            | MessageKind::MainFocus
            | MessageKind::MainBlur
            | MessageKind::DeleteAnchor
            | MessageKind::InsertAnchor => &[Channel::Main],
            MessageKind::NoteFocus
            | MessageKind::NoteBlur
            | MessageKind::DeleteNote
            | MessageKind::InsertNoteBlock
            | MessageKind::DeleteNoteBlock
            | MessageKind::UpdateNoteIndices => &[Channel::Margin],
            MessageKind::GetContent | MessageKind::ContentResponse | MessageKind::ExecFormat => {
                &[Channel::Main, Channel::Margin]
            }
        }
    }

    /// Whether this kind may travel on the given channel
    pub fn allowed_on(&self, channel: Channel) -> bool {
        self.channels().contains(&channel)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
