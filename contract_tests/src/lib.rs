//! # Wire Contract Tests
//!
//! This crate provides "golden" tests for the document wire contract to
//! ensure it doesn't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Message names and field names are written out
//! - **Testability first**: Contract tests fail when the wire shape changes
//! - **Mechanism not policy**: Define what must be stable, not how to use it
//!
//! ## Structure
//!
//! Each channel has a module with contract tests that verify:
//! - Envelope fields
//! - Typed message names
//! - Legacy message names
//! - Payload field names

pub mod envelope;
pub mod legacy;
pub mod main_channel;
pub mod margin_channel;

/// Common test helpers for contract validation
pub mod test_helpers {
    use ipc::{ChannelPayload, Message, MessageKind, ProtocolVersion};
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use serde_json::Value;
    use std::fmt::Debug;

    /// Encodes a payload inside a fresh envelope
    pub fn encode_message<T: Serialize>(payload: T) -> Value {
        Message::new(payload)
            .to_value()
            .expect("Failed to encode message")
    }

    /// Verifies a message carries the expected type tag and version
    pub fn verify_envelope_contract(message: &Value, expected_type: &str) {
        assert_eq!(
            message["type"], expected_type,
            "Message name changed: expected '{}', got {}",
            expected_type, message["type"]
        );
        assert_eq!(
            message["version"],
            ProtocolVersion::CURRENT.get(),
            "Protocol version changed: expected {}, got {}",
            ProtocolVersion::CURRENT,
            message["version"]
        );
        assert!(
            message["timestamp"].is_i64(),
            "Timestamp must be integer epoch milliseconds, got {}",
            message["timestamp"]
        );
    }

    /// Verifies the payload fields, ignoring envelope fields
    pub fn verify_payload_fields(message: &Value, expected: Value) {
        let mut payload = message.clone();
        if let Some(object) = payload.as_object_mut() {
            object.remove("version");
            object.remove("timestamp");
            object.remove("correlationId");
        }
        assert_eq!(payload, expected, "Payload shape changed");
    }

    /// Verifies a payload's kind and that it decodes back unchanged
    pub fn verify_round_trip<T>(payload: T, expected_kind: MessageKind)
    where
        T: ChannelPayload + Serialize + DeserializeOwned + PartialEq + Debug + Clone,
    {
        assert_eq!(payload.kind(), expected_kind);
        assert!(expected_kind.channels().contains(&T::CHANNEL));

        let message = Message::new(payload.clone());
        let decoded: Message<T> =
            Message::decode(&message.encode().expect("Failed to encode message"))
                .expect("Failed to decode message");
        assert_eq!(decoded.payload, payload);
    }
}
