//! wterm-client: Terminal session client for the web terminal bridge.
//!
//! Provides:
//! - The session state machine (`SessionController`) with local line editing,
//!   command rewriting, vi capture and editor save.
//! - Response classification heuristics behind `ResponseClassifier`.
//! - A STOMP-over-WebSocket transport.
//! - `TerminalClient`, which drives a controller over a transport.

pub mod capture;
pub mod classifier;
pub mod client;
pub mod controller;
pub mod display;
pub mod input;
pub mod rewrite;
pub mod save;
pub mod state;
pub mod transport;

pub use classifier::{PromptClassifier, ResponseClassifier};
pub use client::TerminalClient;
pub use controller::{Action, SessionController, SessionEvent};
pub use display::{BufferDisplay, DisplaySink};
pub use input::KeyInput;
pub use rewrite::{AliasTable, CommandRewriter};
pub use state::SessionState;
pub use transport::{StompChannel, StompConnector};
