//! Message envelope and typed message wrapper

use crate::channel::{Channel, MessageKind};
use core_types::RequestId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Protocol errors at the codec boundary
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Protocol version not supported: received {received}, supported {supported}")]
    UnsupportedVersion {
        received: ProtocolVersion,
        supported: ProtocolVersion,
    },

    #[error("Unknown legacy message name: {0}")]
    UnknownLegacyName(String),

    #[error("Unknown message kind: {0}")]
    UnknownKind(String),

    #[error("Message has no type tag")]
    MissingType,

    #[error("{kind} is not allowed on the {channel} channel")]
    WrongChannel { kind: MessageKind, channel: Channel },
}

/// Protocol version stamped on every envelope
///
/// Only the current version is accepted. The field exists so a future
/// breaking change can be detected instead of misparsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolVersion(u32);

impl ProtocolVersion {
    /// The version this build speaks
    pub const CURRENT: ProtocolVersion = ProtocolVersion(1);

    /// Creates a protocol version
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// Returns the raw version number
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Checks whether this build can read messages of this version
    pub fn is_supported(&self) -> bool {
        *self == Self::CURRENT
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Base fields carried by every cross-boundary message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Protocol version
    pub version: ProtocolVersion,
    /// Creation instant in milliseconds since the Unix epoch
    ///
    /// Ordering and debugging only. Never used to resolve conflicts.
    pub timestamp: i64,
    /// Present only on request/response pairs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<RequestId>,
}

/// Stamps a fresh envelope with the current version and clock
pub fn create_envelope(correlation_id: Option<RequestId>) -> MessageEnvelope {
    MessageEnvelope {
        version: ProtocolVersion::CURRENT,
        timestamp: chrono::Utc::now().timestamp_millis(),
        correlation_id,
    }
}

impl MessageEnvelope {
    /// Creates an uncorrelated envelope
    pub fn new() -> Self {
        create_envelope(None)
    }

    /// Sets the correlation ID
    pub fn with_correlation(mut self, correlation_id: RequestId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Checks if this envelope belongs to a request/response pair
    pub fn is_correlated(&self) -> bool {
        self.correlation_id.is_some()
    }

    /// Rejects envelopes from an incompatible protocol version
    pub fn check_version(&self) -> Result<(), ProtocolError> {
        if self.version.is_supported() {
            Ok(())
        } else {
            Err(ProtocolError::UnsupportedVersion {
                received: self.version,
                supported: ProtocolVersion::CURRENT,
            })
        }
    }
}

impl Default for MessageEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

/// A payload that belongs to exactly one channel
pub trait ChannelPayload {
    /// Channel this payload travels on
    const CHANNEL: Channel;

    /// Typed name of this payload
    fn kind(&self) -> MessageKind;
}

/// A complete message: envelope fields and payload flattened into one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message<T> {
    #[serde(flatten)]
    pub envelope: MessageEnvelope,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Message<T> {
    /// Wraps a payload in a freshly stamped envelope
    pub fn new(payload: T) -> Self {
        Self {
            envelope: create_envelope(None),
            payload,
        }
    }

    /// Wraps a payload in an envelope correlated to a request
    pub fn correlated(payload: T, correlation_id: RequestId) -> Self {
        Self {
            envelope: create_envelope(Some(correlation_id)),
            payload,
        }
    }

    /// Wraps a payload in an existing envelope
    pub fn with_envelope(envelope: MessageEnvelope, payload: T) -> Self {
        Self { envelope, payload }
    }
}

impl<T: ChannelPayload> Message<T> {
    /// Typed name of the payload
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// Channel the payload travels on
    pub fn channel(&self) -> Channel {
        T::CHANNEL
    }
}

impl<T: Serialize> Message<T> {
    /// Encodes the message as a JSON object
    pub fn to_value(&self) -> Result<serde_json::Value, ProtocolError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Encodes the message as a single JSON line
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> Message<T> {
    /// Decodes a message from a JSON object, checking the protocol version
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_value(value)?;
        message.envelope.check_version()?;
        Ok(message)
    }

    /// Decodes a message from JSON text, checking the protocol version
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let message: Self = serde_json::from_str(text)?;
        message.envelope.check_version()?;
        Ok(message)
    }
}

/// Checks that a raw message's `type` tag names a kind allowed on `channel`
///
/// Run after legacy names were upgraded. Returns the kind so callers can log
/// it before decoding the payload.
pub fn check_channel(
    message: &serde_json::Value,
    channel: Channel,
) -> Result<MessageKind, ProtocolError> {
    let tag = message
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(ProtocolError::MissingType)?;
    let kind =
        MessageKind::from_str(tag).map_err(|_| ProtocolError::UnknownKind(tag.to_string()))?;

    if kind.allowed_on(channel) {
        Ok(kind)
    } else {
        Err(ProtocolError::WrongChannel { kind, channel })
    }
}
