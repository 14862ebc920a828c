//! STOMP-over-WebSocket channel to the terminal bridge.
//!
//! One WebSocket carries one STOMP session with a single subscription.
//! A background reader task decodes inbound frames and forwards `MESSAGE`
//! bodies, in arrival order, to an mpsc queue drained by `next_message`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use wterm_core::error::{TermError, TermResult};
use wterm_core::stomp::{StompCommand, StompDecoder, StompFrame};
use wterm_core::transport::{ChannelConnector, MessageChannel};

use super::{url_host, websocket_url};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = Arc<Mutex<SplitSink<WsStream, Message>>>;

/// Subscription id used for the session topic.
const SUBSCRIPTION_ID: &str = "sub-0";

/// Inbound queue depth between the reader task and the client.
const INBOUND_QUEUE: usize = 256;

/// Default time allowed for the WebSocket and STOMP handshakes.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens STOMP channels to one bridge endpoint.
#[derive(Debug, Clone)]
pub struct StompConnector {
    url: String,
    host: String,
    connect_timeout: Duration,
}

impl StompConnector {
    /// Build a connector for `url` (`ws`, `wss`, `http` or `https`).
    pub fn new(url: &str) -> TermResult<Self> {
        let url = websocket_url(url)?;
        let host = url_host(&url).to_string();
        Ok(Self {
            url,
            host,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn handshake(&self, topic: &str) -> TermResult<StompChannel> {
        let (ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TermError::Transport(format!("WebSocket connect error: {e}")))?;

        tracing::info!("WebSocket connected to {}", self.url);

        let (mut sink, mut stream) = ws_stream.split();
        let mut decoder = StompDecoder::new();

        send_frame(&mut sink, &StompFrame::connect(&self.host)).await?;
        let leftover = await_connected(&mut stream, &mut decoder).await?;

        send_frame(&mut sink, &StompFrame::subscribe(SUBSCRIPTION_ID, topic)).await?;
        tracing::debug!(topic, "subscribed");

        Ok(StompChannel::spawn(sink, stream, decoder, leftover))
    }
}

impl ChannelConnector for StompConnector {
    type Channel = StompChannel;

    async fn open(&self, topic: &str) -> TermResult<StompChannel> {
        tokio::time::timeout(self.connect_timeout, self.handshake(topic))
            .await
            .map_err(|_| TermError::Timeout)?
    }
}

async fn send_frame(
    sink: &mut SplitSink<WsStream, Message>,
    frame: &StompFrame,
) -> TermResult<()> {
    sink.send(Message::Text(frame.encode()))
        .await
        .map_err(|e| TermError::Transport(format!("WS send error: {e}")))
}

/// Read until `CONNECTED`. Frames decoded after it are returned for delivery.
async fn await_connected(
    stream: &mut SplitStream<WsStream>,
    decoder: &mut StompDecoder,
) -> TermResult<Vec<StompFrame>> {
    while let Some(msg) = stream.next().await {
        let msg = msg.map_err(|e| TermError::Transport(format!("WS read error: {e}")))?;
        let Some(data) = message_bytes(&msg) else {
            if matches!(msg, Message::Close(_)) {
                break;
            }
            continue;
        };

        let mut frames = decoder.feed(data)?.into_iter();
        while let Some(frame) = frames.next() {
            match frame.command {
                StompCommand::Connected => {
                    tracing::debug!(
                        version = frame.get("version").unwrap_or("?"),
                        "STOMP session established"
                    );
                    return Ok(frames.collect());
                }
                StompCommand::Error => return Err(stomp_error(&frame)),
                other => tracing::debug!(%other, "frame before CONNECTED ignored"),
            }
        }
    }
    Err(TermError::Transport(
        "connection closed before CONNECTED".into(),
    ))
}

fn message_bytes(msg: &Message) -> Option<&[u8]> {
    match msg {
        Message::Text(text) => Some(text.as_bytes()),
        Message::Binary(data) => Some(data.as_slice()),
        _ => None,
    }
}

fn stomp_error(frame: &StompFrame) -> TermError {
    let message = frame.get("message").unwrap_or("unknown error");
    if frame.body.trim().is_empty() {
        TermError::Transport(format!("STOMP error: {message}"))
    } else {
        TermError::Transport(format!("STOMP error: {message}: {}", frame.body.trim()))
    }
}

/// A connected, subscribed STOMP channel.
pub struct StompChannel {
    sink: WsSink,
    inbound_rx: mpsc::Receiver<TermResult<String>>,
    reader: tokio::task::JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

impl StompChannel {
    fn spawn(
        sink: SplitSink<WsStream, Message>,
        stream: SplitStream<WsStream>,
        decoder: StompDecoder,
        leftover: Vec<StompFrame>,
    ) -> Self {
        let sink = Arc::new(Mutex::new(sink));
        let connected = Arc::new(AtomicBool::new(true));
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

        let reader = {
            let sink = sink.clone();
            let connected = connected.clone();
            tokio::spawn(async move {
                Self::read_loop(stream, decoder, leftover, inbound_tx, sink).await;
                connected.store(false, Ordering::SeqCst);
                tracing::debug!("STOMP read loop ended");
            })
        };

        Self {
            sink,
            inbound_rx,
            reader,
            connected,
        }
    }

    async fn read_loop(
        mut stream: SplitStream<WsStream>,
        mut decoder: StompDecoder,
        leftover: Vec<StompFrame>,
        inbound_tx: mpsc::Sender<TermResult<String>>,
        sink: WsSink,
    ) {
        for frame in leftover {
            if !Self::route(frame, &inbound_tx).await {
                return;
            }
        }

        while let Some(msg) = stream.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket read error: {}", e);
                    let _ = inbound_tx
                        .send(Err(TermError::Transport(format!("WS read error: {e}"))))
                        .await;
                    return;
                }
            };

            let data = match &msg {
                Message::Ping(payload) => {
                    let mut sink = sink.lock().await;
                    let _ = sink.send(Message::Pong(payload.clone())).await;
                    continue;
                }
                Message::Close(_) => {
                    tracing::debug!("WebSocket close frame received");
                    return;
                }
                other => match message_bytes(other) {
                    Some(data) => data,
                    None => continue,
                },
            };

            let frames = match decoder.feed(data) {
                Ok(frames) => frames,
                Err(e) => {
                    tracing::warn!("undecodable STOMP data: {}", e);
                    decoder.reset();
                    continue;
                }
            };
            for frame in frames {
                if !Self::route(frame, &inbound_tx).await {
                    return;
                }
            }
        }
    }

    /// Forward one frame. Returns `false` when reading should stop.
    async fn route(frame: StompFrame, inbound_tx: &mpsc::Sender<TermResult<String>>) -> bool {
        match frame.command {
            StompCommand::Message => inbound_tx.send(Ok(frame.body)).await.is_ok(),
            StompCommand::Error => {
                let err = stomp_error(&frame);
                tracing::warn!("{}", err);
                let _ = inbound_tx.send(Err(err)).await;
                false
            }
            StompCommand::Receipt => true,
            other => {
                tracing::debug!(%other, "unexpected frame ignored");
                true
            }
        }
    }
}

impl MessageChannel for StompChannel {
    async fn publish(&mut self, destination: &str, body: &str) -> TermResult<()> {
        if !self.is_connected() {
            return Err(TermError::NotConnected);
        }
        let frame = StompFrame::send_json(destination, body);
        let mut sink = self.sink.lock().await;
        send_frame(&mut sink, &frame).await
    }

    async fn next_message(&mut self) -> TermResult<Option<String>> {
        match self.inbound_rx.recv().await {
            Some(Ok(body)) => Ok(Some(body)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> TermResult<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            let mut sink = self.sink.lock().await;
            let _ = send_frame(&mut sink, &StompFrame::disconnect()).await;
            let _ = sink.send(Message::Close(None)).await;
        }
        self.reader.abort();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl Drop for StompChannel {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stomp_error_includes_message_and_body() {
        let frame = StompFrame::new(StompCommand::Error)
            .header("message", "bad destination")
            .with_body("no such topic\n");
        let err = stomp_error(&frame);
        assert_eq!(
            err.to_string(),
            "transport error: STOMP error: bad destination: no such topic"
        );
    }

    #[test]
    fn connector_normalizes_url() {
        let connector = StompConnector::new("http://bridge:8080/ws/websocket").unwrap();
        assert_eq!(connector.url(), "ws://bridge:8080/ws/websocket");
        assert_eq!(connector.host, "bridge");
    }

    #[tokio::test]
    async fn message_frames_are_forwarded_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let first = StompFrame::new(StompCommand::Message).with_body("one");
        let second = StompFrame::new(StompCommand::Message).with_body("two");
        assert!(StompChannel::route(first, &tx).await);
        assert!(StompChannel::route(StompFrame::new(StompCommand::Receipt), &tx).await);
        assert!(StompChannel::route(second, &tx).await);
        assert_eq!(rx.recv().await.unwrap().unwrap(), "one");
        assert_eq!(rx.recv().await.unwrap().unwrap(), "two");
    }

    #[tokio::test]
    async fn error_frame_stops_reading() {
        let (tx, mut rx) = mpsc::channel(4);
        let frame = StompFrame::new(StompCommand::Error).header("message", "denied");
        assert!(!StompChannel::route(frame, &tx).await);
        assert!(matches!(rx.recv().await, Some(Err(TermError::Transport(_)))));
    }
}
