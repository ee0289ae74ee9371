//! # Marginalia Sync Host
//!
//! This crate provides the host runtime that keeps a main document and its
//! margin document in step.
//!
//! ## Philosophy
//!
//! - **Host owns dispatch**: Documents never talk to each other directly
//! - **Anchors are the source of truth**: Notes follow the main document
//! - **Typed messages only**: Legacy names are translated at the edge
//! - **Deterministic mode is first-class**: Scripts drive tests and demos
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Reconciles anchor snapshots into margin commands
//! - Tracks which document owns input and routes toolbar commands
//! - Forwards note deletions from the margin to the main document
//! - Correlates content requests with their responses
//!
//! ## Non-Responsibilities
//!
//! The host does NOT:
//! - Render or edit rich text
//! - Persist documents
//! - Resolve concurrent edits

pub mod config;
pub mod input_script;
pub mod runtime;
pub mod simulation;
pub mod transport;

pub use config::{ConfigError, HostConfig};
pub use input_script::{InputScript, InputScriptError, ScriptedInput};
pub use runtime::{HostError, SyncHost};
pub use simulation::{run_script, SimulationRunner, SimulationSummary};
pub use transport::{DocumentTransport, Outbound, RecordingTransport, TransportError};
