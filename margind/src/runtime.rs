//! # Sync Host
//!
//! Ties the reconciler, the focus manager and the request registry to the
//! two document transports.

use crate::config::HostConfig;
use crate::input_script::InputScriptError;
use crate::transport::{DocumentTransport, TransportError};
use core_types::{AnchorData, NoteData, NoteId};
use ipc::{
    Channel, FormatCommand, HostToMain, HostToMargin, MainToHost, MarginToHost, Message,
    MessageKind, NoteCommand, ProtocolError,
};
use note_reconciler::{reconcile, NoteDiff};
use services_focus_manager::{FocusEvent, FocusManager, FocusState, ToolbarTarget};
use services_request_registry::{PendingResponse, RequestRegistry};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Host error types
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Script error: {0}")]
    Script(#[from] InputScriptError),

    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// Host for one main document and its margin document
pub struct SyncHost<T: DocumentTransport> {
    /// Configuration
    config: HostConfig,
    /// Outbound transport to both documents
    transport: T,
    /// Note list as last delivered to the margin document
    notes: Vec<NoteData>,
    /// Focus state
    focus: FocusManager,
    /// Outstanding content requests
    requests: RequestRegistry<String>,
}

impl<T: DocumentTransport> SyncHost<T> {
    /// Creates a host with its own request registry
    pub fn new(config: HostConfig, transport: T) -> Self {
        Self::with_registry(config, transport, RequestRegistry::new())
    }

    /// Creates a host sharing an existing request registry
    pub fn with_registry(
        config: HostConfig,
        transport: T,
        requests: RequestRegistry<String>,
    ) -> Self {
        Self {
            config,
            transport,
            notes: Vec::new(),
            focus: FocusManager::new(),
            requests,
        }
    }

    /// Handles a message from the main document
    pub fn handle_main(&mut self, message: Message<MainToHost>) -> Result<(), HostError> {
        message.envelope.check_version()?;
        debug!(kind = %message.kind(), "host.inbound.main");

        match message.payload {
            MainToHost::AnchorsChanged { anchors } => {
                self.apply_anchors(&anchors)?;
            }
            MainToHost::MainFocus => {
                self.focus.apply(FocusEvent::MainFocus);
            }
            MainToHost::MainBlur => {
                self.focus.apply(FocusEvent::MainBlur);
            }
            MainToHost::ContentResponse {
                request_id,
                content,
            } => {
                self.requests.handle_response(&request_id, content);
            }
        }
        Ok(())
    }

    /// Handles a message from the margin document
    pub fn handle_margin(&mut self, message: Message<MarginToHost>) -> Result<(), HostError> {
        message.envelope.check_version()?;
        debug!(kind = %message.kind(), "host.inbound.margin");

        match message.payload {
            MarginToHost::NoteFocus {
                note_id: Some(note_id),
            } => {
                self.focus.apply(FocusEvent::NoteFocus { note_id });
            }
            MarginToHost::NoteFocus { note_id: None } => {
                debug!("host.note_focus_without_id");
            }
            MarginToHost::NoteBlur => {
                self.focus.apply(FocusEvent::NoteBlur);
            }
            MarginToHost::DeleteNote { note_id } => {
                info!(note_id = %note_id, "host.forward_delete_anchor");
                self.transport
                    .send_main(Message::new(HostToMain::DeleteAnchor { note_id }))?;
            }
            MarginToHost::ContentResponse {
                request_id,
                content,
            } => {
                self.requests.handle_response(&request_id, content);
            }
        }
        Ok(())
    }

    /// Reconciles a fresh anchor snapshot and updates the margin document
    ///
    /// Nothing is sent when the snapshot does not change the note list. If
    /// the transport fails partway, the committed note list reflects exactly
    /// the commands that were delivered, so the next snapshot sends only what
    /// is still missing.
    pub fn apply_anchors(&mut self, anchors: &[AnchorData]) -> Result<NoteDiff, HostError> {
        let outcome = reconcile(anchors, &self.notes);

        for command in outcome.dispatchable_commands() {
            let payload: HostToMargin = command.clone().into();
            if let Err(err) = self.transport.send_margin(Message::new(payload)) {
                warn!(kind = %command.kind(), error = %err, "host.margin_dispatch_failed");
                return Err(err.into());
            }
            self.record_delivered(command, &outcome.notes);
        }

        self.notes = outcome.notes;
        Ok(outcome.diff)
    }

    /// Applies one delivered command to the committed note list
    fn record_delivered(&mut self, command: &NoteCommand, target: &[NoteData]) {
        match command {
            NoteCommand::DeleteNoteBlock { note_id } => {
                self.notes.retain(|note| &note.id != note_id);
            }
            NoteCommand::InsertNoteBlock { note_id, .. } => {
                if let Some(note) = target.iter().find(|note| &note.id == note_id) {
                    self.notes.push(note.clone());
                }
            }
            NoteCommand::UpdateNoteIndices { .. } => {
                self.notes = target.to_vec();
            }
        }
    }

    /// Sends a toolbar command to whichever document owns input
    ///
    /// Returns where it was sent, or `None` when nothing is focused and the
    /// command was dropped.
    pub fn exec_format(
        &mut self,
        command: FormatCommand,
    ) -> Result<Option<ToolbarTarget>, HostError> {
        let target = self.focus.route(&command);
        match target {
            Some(ToolbarTarget::Main) => {
                self.transport
                    .send_main(Message::new(HostToMain::ExecFormat { command }))?;
            }
            Some(ToolbarTarget::Margin) => {
                self.transport
                    .send_margin(Message::new(HostToMargin::ExecFormat { command }))?;
            }
            None => debug!(command = ?command, "host.format_dropped"),
        }
        Ok(target)
    }

    /// Asks the main document to insert a new anchor at its cursor
    ///
    /// Only honoured while the main document is focused. The margin block
    /// appears once the resulting anchor snapshot is reconciled.
    pub fn insert_note(&mut self) -> Result<Option<NoteId>, HostError> {
        if !self.focus.current().is_main_focused() {
            debug!(focus = ?self.focus.current(), "host.insert_note_ignored");
            return Ok(None);
        }

        let note_id = NoteId::generate();
        self.transport.send_main(Message::new(HostToMain::InsertAnchor {
            note_id: note_id.clone(),
        }))?;
        Ok(Some(note_id))
    }

    /// Requests the current content of one document
    ///
    /// Resolves to `None` if no answer arrives within the configured timeout
    /// or if the request could not be sent.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn request_content(&mut self, channel: Channel) -> PendingResponse<String> {
        let transport = &mut self.transport;
        self.requests.send_request(
            MessageKind::GetContent,
            |_, request_id| match channel {
                Channel::Main => transport.send_main(Message::correlated(
                    HostToMain::GetContent {
                        request_id: request_id.clone(),
                    },
                    request_id.clone(),
                )),
                Channel::Margin => transport.send_margin(Message::correlated(
                    HostToMargin::GetContent {
                        request_id: request_id.clone(),
                    },
                    request_id.clone(),
                )),
            },
            self.config.request_timeout(),
        )
    }

    /// Drops outstanding requests and clears focus
    pub fn shutdown(&mut self) {
        self.requests.cleanup();
        self.focus.reset();
        info!(notes = self.notes.len(), "host.shutdown");
    }

    /// Current canonical note list
    pub fn notes(&self) -> &[NoteData] {
        &self.notes
    }

    /// Current focus state
    pub fn focus(&self) -> &FocusState {
        self.focus.current()
    }

    /// Focus manager, for audit inspection
    pub fn focus_manager(&self) -> &FocusManager {
        &self.focus
    }

    /// Request registry shared with this host
    pub fn requests(&self) -> &RequestRegistry<String> {
        &self.requests
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Outbound, RecordingTransport};
    use pretty_assertions::assert_eq;

    fn host() -> SyncHost<RecordingTransport> {
        SyncHost::new(HostConfig::default(), RecordingTransport::new())
    }

    fn anchors(list: &[(&str, u32)]) -> Message<MainToHost> {
        Message::new(MainToHost::AnchorsChanged {
            anchors: list
                .iter()
                .map(|(id, line)| AnchorData::new(*id, *line, 0))
                .collect(),
        })
    }

    fn kinds(transport: &mut RecordingTransport) -> Vec<MessageKind> {
        transport.take().iter().map(Outbound::kind).collect()
    }

    #[test]
    fn test_anchor_snapshot_dispatches_to_margin() {
        let mut host = host();
        host.handle_main(anchors(&[("n2", 5), ("n1", 2)])).unwrap();

        assert_eq!(
            kinds(host.transport_mut()),
            vec![
                MessageKind::InsertNoteBlock,
                MessageKind::InsertNoteBlock,
                MessageKind::UpdateNoteIndices,
            ]
        );
        assert_eq!(host.notes().len(), 2);
        assert_eq!(host.notes()[0].id, NoteId::new("n1"));
    }

    #[test]
    fn test_repeated_snapshot_dispatches_nothing() {
        let mut host = host();
        host.handle_main(anchors(&[("a", 1)])).unwrap();
        host.transport_mut().take();

        host.handle_main(anchors(&[("a", 1)])).unwrap();
        assert!(host.transport().sent().is_empty());
    }

    #[test]
    fn test_failed_dispatch_keeps_previous_notes() {
        let mut host = host();
        host.transport_mut().close(Channel::Margin);

        let result = host.handle_main(anchors(&[("a", 1)]));
        assert!(matches!(
            result,
            Err(HostError::Transport(TransportError::Closed(Channel::Margin)))
        ));
        assert!(host.notes().is_empty());
    }

    /// Recording transport that fails one margin send, counted from zero
    struct FlakyTransport {
        inner: RecordingTransport,
        margin_sends: usize,
        fail_at: usize,
    }

    impl FlakyTransport {
        fn failing_at(fail_at: usize) -> Self {
            Self {
                inner: RecordingTransport::new(),
                margin_sends: 0,
                fail_at,
            }
        }

        fn margin_payloads(&self) -> Vec<HostToMargin> {
            self.inner
                .sent()
                .iter()
                .filter_map(|outbound| match outbound {
                    Outbound::Margin(message) => Some(message.payload.clone()),
                    Outbound::Main(_) => None,
                })
                .collect()
        }
    }

    impl DocumentTransport for FlakyTransport {
        fn send_main(&mut self, message: Message<HostToMain>) -> Result<(), TransportError> {
            self.inner.send_main(message)
        }

        fn send_margin(&mut self, message: Message<HostToMargin>) -> Result<(), TransportError> {
            let attempt = self.margin_sends;
            self.margin_sends += 1;
            if attempt == self.fail_at {
                return Err(TransportError::Failed("link dropped".to_string()));
            }
            self.inner.send_margin(message)
        }
    }

    fn snapshot(list: &[(&str, u32)]) -> Vec<AnchorData> {
        list.iter()
            .map(|(id, line)| AnchorData::new(*id, *line, 0))
            .collect()
    }

    #[test]
    fn test_partial_dispatch_does_not_duplicate_inserts() {
        let mut host = SyncHost::new(HostConfig::default(), FlakyTransport::failing_at(1));
        let anchors = snapshot(&[("a", 1), ("b", 5)]);

        assert!(matches!(
            host.apply_anchors(&anchors),
            Err(HostError::Transport(TransportError::Failed(_)))
        ));
        assert_eq!(host.notes().len(), 1);
        assert_eq!(host.notes()[0].id, NoteId::new("a"));

        host.apply_anchors(&anchors).unwrap();

        let payloads = host.transport().margin_payloads();
        let inserts_of = |id: &str| {
            payloads
                .iter()
                .filter(|payload| {
                    matches!(payload, HostToMargin::InsertNoteBlock { note_id, .. } if note_id.as_str() == id)
                })
                .count()
        };
        assert_eq!(inserts_of("a"), 1);
        assert_eq!(inserts_of("b"), 1);
        assert_eq!(
            payloads.last(),
            Some(&HostToMargin::UpdateNoteIndices {
                entries: host.notes().iter().map(NoteData::index_entry).collect(),
            })
        );
        assert_eq!(host.notes().len(), 2);
        assert_eq!(host.notes()[1].note_index, 2);
    }

    #[test]
    fn test_partial_dispatch_after_delete_only_reindexes() {
        // Sends 0-2 build the initial list, send 4 is the reindex after the delete
        let mut host = SyncHost::new(HostConfig::default(), FlakyTransport::failing_at(4));
        host.apply_anchors(&snapshot(&[("a", 1), ("b", 5)])).unwrap();

        let remaining = snapshot(&[("b", 5)]);
        assert!(host.apply_anchors(&remaining).is_err());
        assert_eq!(host.notes().len(), 1);
        assert_eq!(host.notes()[0].note_index, 2);

        host.apply_anchors(&remaining).unwrap();

        let payloads = host.transport().margin_payloads();
        let deletes = payloads
            .iter()
            .filter(|payload| matches!(payload, HostToMargin::DeleteNoteBlock { .. }))
            .count();
        assert_eq!(deletes, 1);
        assert_eq!(
            payloads.last(),
            Some(&HostToMargin::UpdateNoteIndices {
                entries: vec![core_types::NoteIndexEntry {
                    note_id: NoteId::new("b"),
                    note_index: 1,
                }],
            })
        );
    }

    #[test]
    fn test_focus_events_drive_toolbar_routing() {
        let mut host = host();
        assert_eq!(host.exec_format(FormatCommand::ToggleBold).unwrap(), None);

        host.handle_main(Message::new(MainToHost::MainFocus)).unwrap();
        assert_eq!(
            host.exec_format(FormatCommand::ToggleBold).unwrap(),
            Some(ToolbarTarget::Main)
        );

        host.handle_margin(Message::new(MarginToHost::NoteFocus {
            note_id: Some(NoteId::new("n1")),
        }))
        .unwrap();
        assert_eq!(
            host.exec_format(FormatCommand::Undo).unwrap(),
            Some(ToolbarTarget::Margin)
        );

        let sent = host.transport_mut().take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].channel(), Channel::Main);
        assert_eq!(sent[1].channel(), Channel::Margin);
    }

    #[test]
    fn test_note_focus_without_id_is_ignored() {
        let mut host = host();
        host.handle_main(Message::new(MainToHost::MainFocus)).unwrap();
        host.handle_margin(Message::new(MarginToHost::NoteFocus { note_id: None }))
            .unwrap();
        assert_eq!(host.focus(), &FocusState::MainFocused);
    }

    #[test]
    fn test_note_blur_returns_to_idle() {
        let mut host = host();
        host.handle_margin(Message::new(MarginToHost::NoteFocus {
            note_id: Some(NoteId::new("n1")),
        }))
        .unwrap();
        host.handle_margin(Message::new(MarginToHost::NoteBlur))
            .unwrap();
        assert_eq!(host.focus(), &FocusState::Idle);
    }

    #[test]
    fn test_margin_delete_forwards_to_main() {
        let mut host = host();
        host.handle_margin(Message::new(MarginToHost::DeleteNote {
            note_id: NoteId::new("n1"),
        }))
        .unwrap();

        let sent = host.transport_mut().take();
        match &sent[..] {
            [Outbound::Main(message)] => assert_eq!(
                message.payload,
                HostToMain::DeleteAnchor {
                    note_id: NoteId::new("n1")
                }
            ),
            other => panic!("Expected one DELETE_ANCHOR, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_note_requires_main_focus() {
        let mut host = host();
        assert_eq!(host.insert_note().unwrap(), None);

        host.handle_main(Message::new(MainToHost::MainFocus)).unwrap();
        let note_id = host.insert_note().unwrap().unwrap();

        let sent = host.transport_mut().take();
        match &sent[..] {
            [Outbound::Main(message)] => {
                assert_eq!(message.payload, HostToMain::InsertAnchor { note_id })
            }
            other => panic!("Expected one INSERT_ANCHOR, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let mut host = host();
        let mut message = Message::new(MainToHost::MainFocus);
        message.envelope.version = ipc::ProtocolVersion::new(9);

        assert!(matches!(
            host.handle_main(message),
            Err(HostError::Protocol(ProtocolError::UnsupportedVersion { .. }))
        ));
        assert_eq!(host.focus(), &FocusState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_content_round_trip() {
        let mut host = host();
        let pending = host.request_content(Channel::Margin);
        let request_id = pending.request_id().clone();

        let sent = host.transport_mut().take();
        match &sent[..] {
            [Outbound::Margin(message)] => {
                assert_eq!(message.envelope.correlation_id, Some(request_id.clone()));
                assert_eq!(
                    message.payload,
                    HostToMargin::GetContent {
                        request_id: request_id.clone()
                    }
                );
            }
            other => panic!("Expected one GET_CONTENT, got {:?}", other),
        }

        host.handle_margin(Message::correlated(
            MarginToHost::ContentResponse {
                request_id: request_id.clone(),
                content: "<p>note</p>".to_string(),
            },
            request_id,
        ))
        .unwrap();

        assert_eq!(pending.await, Some("<p>note</p>".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_content_closed_transport_resolves_none() {
        let mut host = host();
        host.transport_mut().close(Channel::Main);

        let pending = host.request_content(Channel::Main);
        assert_eq!(host.requests().pending_count(), 0);
        assert_eq!(pending.await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_resolves_outstanding_requests() {
        let mut host = host();
        host.handle_main(Message::new(MainToHost::MainFocus)).unwrap();
        let pending = host.request_content(Channel::Main);

        host.shutdown();

        assert_eq!(pending.await, None);
        assert_eq!(host.focus(), &FocusState::Idle);
    }
}
