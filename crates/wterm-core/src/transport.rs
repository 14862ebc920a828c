//! Abstract transport traits for wterm.
//!
//! The STOMP-over-WebSocket channel and the in-memory test channel both
//! satisfy these traits.

use crate::error::TermResult;

/// A connected, subscribed duplex message channel.
///
/// Inbound messages are plain text bodies delivered in arrival order.
#[allow(async_fn_in_trait)]
pub trait MessageChannel: Send {
    /// Publish a text body to a destination.
    async fn publish(&mut self, destination: &str, body: &str) -> TermResult<()>;

    /// Wait for the next inbound message body. `None` means the channel closed.
    ///
    /// Must be cancel-safe: dropping the future before it resolves loses no message.
    async fn next_message(&mut self) -> TermResult<Option<String>>;

    /// Close the channel.
    async fn close(&mut self) -> TermResult<()>;

    /// Whether the channel is still connected.
    fn is_connected(&self) -> bool;
}

/// Opens channels subscribed to a single topic. Used again on reconnect.
#[allow(async_fn_in_trait)]
pub trait ChannelConnector {
    type Channel: MessageChannel;

    /// Open a channel and subscribe it to `topic`.
    async fn open(&self, topic: &str) -> TermResult<Self::Channel>;
}
