//! # Document Transport
//!
//! The host never talks to a document directly. Everything outbound goes
//! through a [`DocumentTransport`], which may be an in-process call or a
//! cross-process bridge.

use ipc::{
    downgrade_to_legacy, Channel, ChannelPayload, HostToMain, HostToMargin, Message, MessageKind,
    ProtocolError,
};
use std::collections::HashSet;
use thiserror::Error;

/// Transport error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("The {0} document transport is closed")]
    Closed(Channel),

    #[error("Transport failure: {0}")]
    Failed(String),
}

/// Outbound side of the two document channels
pub trait DocumentTransport {
    fn send_main(&mut self, message: Message<HostToMain>) -> Result<(), TransportError>;
    fn send_margin(&mut self, message: Message<HostToMargin>) -> Result<(), TransportError>;
}

/// A message the host sent, tagged with its channel
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Main(Message<HostToMain>),
    Margin(Message<HostToMargin>),
}

impl Outbound {
    pub fn channel(&self) -> Channel {
        match self {
            Outbound::Main(_) => Channel::Main,
            Outbound::Margin(_) => Channel::Margin,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Outbound::Main(message) => message.payload.kind(),
            Outbound::Margin(message) => message.payload.kind(),
        }
    }

    /// Encodes the message as JSON, optionally with its legacy name
    pub fn to_value(&self, legacy_names: bool) -> Result<serde_json::Value, ProtocolError> {
        let value = match self {
            Outbound::Main(message) => message.to_value()?,
            Outbound::Margin(message) => message.to_value()?,
        };
        if legacy_names {
            downgrade_to_legacy(value)
        } else {
            Ok(value)
        }
    }
}

/// Transport that keeps every message it is handed
///
/// Used by simulation mode and tests. A channel can be closed to exercise
/// failure paths.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Vec<Outbound>,
    closed: HashSet<Channel>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn sent(&self) -> &[Outbound] {
        &self.sent
    }

    /// Removes and returns everything sent so far
    pub fn take(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.sent)
    }

    /// Makes every later send on `channel` fail
    pub fn close(&mut self, channel: Channel) {
        self.closed.insert(channel);
    }

    fn check_open(&self, channel: Channel) -> Result<(), TransportError> {
        if self.closed.contains(&channel) {
            Err(TransportError::Closed(channel))
        } else {
            Ok(())
        }
    }
}

impl DocumentTransport for RecordingTransport {
    fn send_main(&mut self, message: Message<HostToMain>) -> Result<(), TransportError> {
        self.check_open(Channel::Main)?;
        self.sent.push(Outbound::Main(message));
        Ok(())
    }

    fn send_margin(&mut self, message: Message<HostToMargin>) -> Result<(), TransportError> {
        self.check_open(Channel::Margin)?;
        self.sent.push(Outbound::Margin(message));
        Ok(())
    }
}
