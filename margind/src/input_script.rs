//! # Input Script Parser
//!
//! Provides a simple scripted input format for deterministic simulation runs.
//!
//! ## Format
//!
//! Scripts are line-based, with each line representing one host action:
//! - Inbound messages: `main <json>`, `margin <json>`
//! - Toolbar commands: `format bold`, `format heading2`
//! - Note insertion: `insert-note`
//! - Content requests: `request main`, `request margin`
//! - Content answers: `respond main <text>` (answers the oldest open request)
//! - Delays: `wait 100ms`
//! - Comments: `# This is a comment`
//!
//! Inbound JSON may use typed or legacy message names. When it carries no
//! `version` field only the payload is given and the host stamps a fresh
//! envelope.
//!
//! ## Example
//!
//! ```text
//! # Focus the main document and add a note
//! main {"type": "MAIN_FOCUS"}
//! insert-note
//! main {"type": "anchors-update", "anchors": [{"id": "n1", "line": 3, "blockIndex": 0}]}
//! format italic
//! ```

use ipc::{
    check_channel, upgrade_legacy, Channel, ChannelPayload, FormatCommand, MainToHost,
    MarginToHost, Message, ProtocolError,
};
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use thiserror::Error;

/// Input script error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputScriptError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown format command: {0}")]
    UnknownFormat(String),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Empty script")]
    EmptyScript,

    #[error("Invalid delay format: {0}")]
    InvalidDelay(String),
}

/// A single scripted host action
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedInput {
    /// Message arriving from the main document
    Main(Message<MainToHost>),
    /// Message arriving from the margin document
    Margin(Message<MarginToHost>),
    /// Toolbar command
    Format(FormatCommand),
    /// Insert a note at the main document cursor
    InsertNote,
    /// Request a document's content
    Request(Channel),
    /// Answer the oldest open content request on a channel
    Respond(Channel, String),
    /// Wait for a duration (in milliseconds)
    Wait(u64),
}

/// Input script
///
/// Parses and provides scripted host actions for deterministic runs.
#[derive(Debug, Clone)]
pub struct InputScript {
    inputs: VecDeque<ScriptedInput>,
}

impl InputScript {
    /// Creates a new empty input script
    pub fn new() -> Self {
        Self {
            inputs: VecDeque::new(),
        }
    }

    /// Parses a script from text
    pub fn from_text(text: &str) -> Result<Self, InputScriptError> {
        let mut inputs = VecDeque::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parsed = Self::parse_line(line).map_err(|e| InputScriptError::ParseError {
                line: line_num + 1,
                message: e.to_string(),
            })?;
            inputs.push_back(parsed);
        }

        if inputs.is_empty() {
            return Err(InputScriptError::EmptyScript);
        }

        Ok(Self { inputs })
    }

    /// Parses a single line of script
    fn parse_line(line: &str) -> Result<ScriptedInput, InputScriptError> {
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "main" => Ok(ScriptedInput::Main(Self::parse_inbound(rest)?)),
            "margin" => Ok(ScriptedInput::Margin(Self::parse_inbound(rest)?)),
            "format" => FormatCommand::parse(rest)
                .map(ScriptedInput::Format)
                .ok_or_else(|| InputScriptError::UnknownFormat(rest.to_string())),
            "insert-note" => Ok(ScriptedInput::InsertNote),
            "request" => Ok(ScriptedInput::Request(Self::parse_channel(rest)?)),
            "respond" => {
                let (channel, content) = match rest.split_once(char::is_whitespace) {
                    Some((channel, content)) => (channel, content.trim()),
                    None => (rest, ""),
                };
                Ok(ScriptedInput::Respond(
                    Self::parse_channel(channel)?,
                    content.to_string(),
                ))
            }
            "wait" => Ok(ScriptedInput::Wait(Self::parse_duration(rest)?)),
            other => Err(InputScriptError::UnknownCommand(other.to_string())),
        }
    }

    /// Decodes an inbound message, upgrading legacy names
    fn parse_inbound<T: DeserializeOwned + ChannelPayload>(
        json: &str,
    ) -> Result<Message<T>, InputScriptError> {
        Self::decode_inbound(json).map_err(|e| InputScriptError::InvalidMessage(e.to_string()))
    }

    fn decode_inbound<T: DeserializeOwned + ChannelPayload>(
        json: &str,
    ) -> Result<Message<T>, ProtocolError> {
        let value = upgrade_legacy(serde_json::from_str(json)?)?;
        check_channel(&value, T::CHANNEL)?;

        // Full messages keep their own envelope so the host can check it
        if value.get("version").is_some() {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(Message::new(serde_json::from_value(value)?))
        }
    }

    fn parse_channel(name: &str) -> Result<Channel, InputScriptError> {
        match name {
            "main" => Ok(Channel::Main),
            "margin" => Ok(Channel::Margin),
            other => Err(InputScriptError::InvalidChannel(other.to_string())),
        }
    }

    /// Parses a duration string (e.g., "100ms", "1s")
    fn parse_duration(s: &str) -> Result<u64, InputScriptError> {
        let s = s.trim().to_lowercase();

        if let Some(ms_str) = s.strip_suffix("ms") {
            ms_str
                .trim()
                .parse::<u64>()
                .map_err(|_| InputScriptError::InvalidDelay(s.to_string()))
        } else if let Some(s_str) = s.strip_suffix('s') {
            s_str
                .trim()
                .parse::<u64>()
                .ok()
                .and_then(|secs| secs.checked_mul(1000))
                .ok_or_else(|| InputScriptError::InvalidDelay(s.to_string()))
        } else {
            Err(InputScriptError::InvalidDelay(s.to_string()))
        }
    }

    /// Returns the next input, if any
    pub fn next_input(&mut self) -> Option<ScriptedInput> {
        self.inputs.pop_front()
    }

    /// Returns true if the script has more inputs
    pub fn has_more(&self) -> bool {
        !self.inputs.is_empty()
    }

    /// Returns the number of remaining inputs
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl Default for InputScript {
    fn default() -> Self {
        Self::new()
    }
}
