//! # Simulation Runner
//!
//! Drives a [`SyncHost`] from an [`InputScript`] against a
//! [`RecordingTransport`] and writes every outbound message as one JSON line.
//!
//! Output lines look like `margin {"version":1,...,"type":"INSERT_NOTE_BLOCK",...}`.
//! Once the script ends, every content request still outstanding is awaited
//! and reported as `response <channel> <content|null>`.

use crate::input_script::{InputScript, ScriptedInput};
use crate::runtime::{HostError, SyncHost};
use crate::transport::RecordingTransport;
use core_types::RequestId;
use ipc::{Channel, MainToHost, MarginToHost, Message};
use services_request_registry::PendingResponse;
use std::collections::VecDeque;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

/// What a finished simulation produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Script steps executed
    pub steps: usize,
    /// Outbound messages written
    pub messages_sent: usize,
    /// Final outcome of each content request, in request order
    pub responses: Vec<(Channel, Option<String>)>,
}

/// Runs scripted input through a host
pub struct SimulationRunner<W: Write> {
    host: SyncHost<RecordingTransport>,
    out: W,
    legacy_names: bool,
    /// Every request issued, awaited at the end
    requests: Vec<(Channel, PendingResponse<String>)>,
    /// Requests not yet answered by a `respond` step
    unanswered: VecDeque<(Channel, RequestId)>,
    summary: SimulationSummary,
}

impl<W: Write> SimulationRunner<W> {
    pub fn new(host: SyncHost<RecordingTransport>, out: W) -> Self {
        let legacy_names = host.config().legacy_names;
        Self {
            host,
            out,
            legacy_names,
            requests: Vec::new(),
            unanswered: VecDeque::new(),
            summary: SimulationSummary::default(),
        }
    }

    /// Runs the whole script, then waits for outstanding requests
    pub async fn run(mut self, mut script: InputScript) -> Result<SimulationSummary, HostError> {
        while let Some(input) = script.next_input() {
            self.step(input).await?;
            self.flush_outbound()?;
            self.summary.steps += 1;
        }

        for (channel, pending) in std::mem::take(&mut self.requests) {
            let response = pending.await;
            writeln!(
                self.out,
                "response {} {}",
                channel,
                serde_json::to_string(&response).map_err(ipc::ProtocolError::from)?
            )?;
            self.summary.responses.push((channel, response));
        }

        self.host.shutdown();
        Ok(self.summary)
    }

    async fn step(&mut self, input: ScriptedInput) -> Result<(), HostError> {
        debug!(input = ?input, "simulation.step");

        match input {
            ScriptedInput::Main(message) => self.host.handle_main(message)?,
            ScriptedInput::Margin(message) => self.host.handle_margin(message)?,
            ScriptedInput::Format(command) => {
                self.host.exec_format(command)?;
            }
            ScriptedInput::InsertNote => {
                self.host.insert_note()?;
            }
            ScriptedInput::Request(channel) => {
                let pending = self.host.request_content(channel);
                if self.host.requests().is_pending(pending.request_id()) {
                    self.unanswered
                        .push_back((channel, pending.request_id().clone()));
                }
                self.requests.push((channel, pending));
            }
            ScriptedInput::Respond(channel, content) => self.respond(channel, content)?,
            ScriptedInput::Wait(millis) => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
        }
        Ok(())
    }

    /// Feeds a content response for the oldest open request on `channel`
    fn respond(&mut self, channel: Channel, content: String) -> Result<(), HostError> {
        let position = self.unanswered.iter().position(|(c, _)| *c == channel);
        let Some((_, request_id)) = position.and_then(|i| self.unanswered.remove(i)) else {
            warn!(channel = %channel, "simulation.respond_without_request");
            return Ok(());
        };

        match channel {
            Channel::Main => self.host.handle_main(Message::correlated(
                MainToHost::ContentResponse {
                    request_id: request_id.clone(),
                    content,
                },
                request_id,
            )),
            Channel::Margin => self.host.handle_margin(Message::correlated(
                MarginToHost::ContentResponse {
                    request_id: request_id.clone(),
                    content,
                },
                request_id,
            )),
        }
    }

    fn flush_outbound(&mut self) -> Result<(), HostError> {
        for outbound in self.host.transport_mut().take() {
            let value = outbound.to_value(self.legacy_names)?;
            writeln!(self.out, "{} {}", outbound.channel(), value)?;
            self.summary.messages_sent += 1;
        }
        Ok(())
    }
}

/// Parses and runs a script with a fresh host
pub async fn run_script<W: Write>(
    config: crate::config::HostConfig,
    script_text: &str,
    out: W,
) -> Result<SimulationSummary, HostError> {
    let script = InputScript::from_text(script_text)?;
    let host = SyncHost::new(config, RecordingTransport::new());
    SimulationRunner::new(host, out).run(script).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostConfig;
    use pretty_assertions::assert_eq;

    async fn run(config: HostConfig, script: &str) -> (SimulationSummary, Vec<String>) {
        let mut out = Vec::new();
        let summary = run_script(config, script, &mut out).await.unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (summary, lines)
    }

    #[tokio::test(start_paused = true)]
    async fn test_anchor_script_writes_margin_commands() {
        let script = r#"
main {"type": "ANCHORS_CHANGED", "anchors": [{"id": "n1", "line": 2, "blockIndex": 0}]}
"#;
        let (summary, lines) = run(HostConfig::default(), script).await;

        assert_eq!(summary.steps, 1);
        assert_eq!(summary.messages_sent, 2);
        assert!(lines[0].starts_with("margin "));
        assert!(lines[0].contains(r#""type":"INSERT_NOTE_BLOCK""#));
        assert!(lines[1].contains(r#""type":"UPDATE_NOTE_INDICES""#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_legacy_output_names() {
        let config = HostConfig {
            legacy_names: true,
            ..HostConfig::default()
        };
        let script = r#"
main {"type": "editor-focus"}
format bold
"#;
        let (_, lines) = run(config, script).await;

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("main "));
        assert!(lines[0].contains(r#""type":"format""#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_respond_answers_oldest_request() {
        let script = "\
request margin
request margin
respond margin first
respond margin second
";
        let (summary, lines) = run(HostConfig::default(), script).await;

        assert_eq!(
            summary.responses,
            vec![
                (Channel::Margin, Some("first".to_string())),
                (Channel::Margin, Some("second".to_string())),
            ]
        );
        assert_eq!(lines[2], r#"response margin "first""#);
        assert_eq!(lines[3], r#"response margin "second""#);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_request_times_out() {
        let config = HostConfig {
            request_timeout_ms: 100,
            ..HostConfig::default()
        };
        let (summary, lines) = run(config, "request main\nwait 200ms\n").await;

        assert_eq!(summary.responses, vec![(Channel::Main, None)]);
        assert_eq!(lines.last().map(String::as_str), Some("response main null"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_respond_without_request_is_ignored() {
        let (summary, lines) = run(HostConfig::default(), "respond main late\n").await;
        assert_eq!(summary.steps, 1);
        assert!(lines.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_error_is_reported() {
        let result = run_script(HostConfig::default(), "", Vec::new()).await;
        assert!(matches!(result, Err(HostError::Script(_))));
    }
}
