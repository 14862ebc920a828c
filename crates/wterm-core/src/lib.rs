//! wterm-core: Shared protocol library for the web terminal.
//!
//! Provides the outgoing terminal frame types, a STOMP 1.2 text codec,
//! the error type, and abstract transport traits.

pub mod error;
pub mod frame;
pub mod stomp;
pub mod transport;

// Re-export commonly used items at crate root.
pub use error::{TermError, TermResult};
pub use frame::{FrameKind, OutgoingFrame, SessionIdentity, INTERRUPT_COMMAND};
pub use stomp::{StompCommand, StompDecoder, StompFrame};
pub use transport::{ChannelConnector, MessageChannel};
