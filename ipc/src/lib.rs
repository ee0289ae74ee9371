//! # Inter-Process Communication (IPC)
//!
//! This crate defines the message vocabulary spoken between the host and the
//! two documents it keeps in agreement.
//!
//! ## Philosophy
//!
//! - **Typed, not stringly-typed**: Every message has a closed `MessageKind`
//! - **Versionable**: Every envelope carries a protocol version
//! - **Traceable**: Request/response pairs share a correlation id
//! - **Migratable**: A static table maps the legacy flat names to typed names
//!
//! ## Architecture
//!
//! A [`Message`] is an envelope (version, timestamp, optional correlation id)
//! flattened together with a typed payload. Payloads exist per channel and
//! direction:
//!
//! - main document to host: [`MainToHost`]
//! - host to main document: [`HostToMain`]
//! - margin document to host: [`MarginToHost`]
//! - host to margin document: [`HostToMargin`]

pub mod channel;
pub mod legacy;
pub mod message;
pub mod typed;

pub use channel::{Channel, MessageKind};
pub use legacy::{downgrade_to_legacy, legacy_to_typed, typed_to_legacy, upgrade_legacy};
pub use message::{
    check_channel, create_envelope, ChannelPayload, Message, MessageEnvelope, ProtocolError,
    ProtocolVersion,
};
pub use typed::{FormatCommand, HostToMain, HostToMargin, MainToHost, MarginToHost, NoteCommand};
