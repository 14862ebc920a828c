//! The async terminal client.
//!
//! `TerminalClient` owns one transport channel, one `SessionController` and
//! one display. It feeds keys and inbound messages to the controller and
//! carries out the returned actions in order.

use tokio::sync::mpsc;

use wterm_core::error::{TermError, TermResult};
use wterm_core::frame::DEFAULT_TOPIC_TEMPLATE;
use wterm_core::transport::{ChannelConnector, MessageChannel};

use crate::controller::{Action, SessionController, SessionEvent};
use crate::display::DisplaySink;
use crate::input::KeyInput;
use crate::state::SessionState;

/// Written before a reconnect so the new banner starts on a fresh line.
const RECONNECT_BREAK: &str = "\r\n";

/// One terminal session bound to a transport.
pub struct TerminalClient<C: ChannelConnector, D: DisplaySink> {
    connector: C,
    channel: Option<C::Channel>,
    controller: SessionController,
    display: D,
    events: mpsc::UnboundedSender<SessionEvent>,
    topic_template: String,
}

impl<C: ChannelConnector, D: DisplaySink> TerminalClient<C, D> {
    /// Build a disconnected client. Events are delivered on `events`.
    pub fn new(
        connector: C,
        controller: SessionController,
        display: D,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            connector,
            channel: None,
            controller,
            display,
            events,
            topic_template: DEFAULT_TOPIC_TEMPLATE.to_string(),
        }
    }

    /// Override the inbound topic template (`{id}` is the session id).
    pub fn with_topic_template(mut self, template: impl Into<String>) -> Self {
        self.topic_template = template.into();
        self
    }

    pub fn state(&self) -> SessionState {
        self.controller.state()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// A channel is attached. It may already be closed remotely with
    /// messages still queued; `next_inbound` drains those before `None`.
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    pub fn topic(&self) -> String {
        self.controller.identity().topic(&self.topic_template)
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Open the channel, subscribe and send the init frame.
    pub async fn connect(&mut self) -> TermResult<()> {
        if self.channel.is_some() {
            return Err(TermError::Transport("already connected".into()));
        }
        let topic = self.topic();
        tracing::info!(session = self.controller.identity().id, %topic, "connecting");

        let channel = self.connector.open(&topic).await?;
        self.channel = Some(channel);

        let actions = self.controller.on_connected();
        self.apply(actions).await
    }

    /// Close the channel and abandon any in-flight capture or save.
    pub async fn disconnect(&mut self) -> TermResult<()> {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close().await {
                tracing::warn!("error closing channel: {}", e);
            }
            tracing::info!(session = self.controller.identity().id, "disconnected");
        }
        let actions = self.controller.teardown();
        self.apply(actions).await
    }

    /// Drop the current channel and replay the connect sequence.
    pub async fn reconnect(&mut self) -> TermResult<()> {
        self.display.write(RECONNECT_BREAK)?;
        self.disconnect().await?;
        self.connect().await
    }

    // ── Input ────────────────────────────────────────────────────────

    pub async fn handle_key(&mut self, key: KeyInput) -> TermResult<()> {
        let actions = self.controller.on_key(key)?;
        self.apply(actions).await
    }

    /// Feed raw terminal data, one key at a time.
    pub async fn handle_data(&mut self, data: &str) -> TermResult<()> {
        for key in KeyInput::from_data(data) {
            self.handle_key(key).await?;
        }
        Ok(())
    }

    pub async fn interrupt(&mut self) -> TermResult<()> {
        let actions = self.controller.interrupt();
        self.apply(actions).await
    }

    /// Write edited text back to the captured file.
    pub async fn save_editor(&mut self, text: &str) -> TermResult<()> {
        let actions = self.controller.save_editor(text)?;
        self.apply(actions).await
    }

    /// Leave the edit without saving.
    pub async fn abandon_edit(&mut self) -> TermResult<()> {
        let actions = self.controller.abandon_edit()?;
        self.apply(actions).await
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.display.refit(cols, rows);
    }

    // ── Inbound ──────────────────────────────────────────────────────

    /// Wait for the next inbound message.
    ///
    /// Cancel-safe. Returns `Ok(None)` once the channel has closed; the
    /// caller should then `disconnect` or `reconnect`.
    pub async fn next_inbound(&mut self) -> TermResult<Option<String>> {
        let channel = self.channel.as_mut().ok_or(TermError::NotConnected)?;
        channel.next_message().await
    }

    /// Route one inbound message through the controller.
    pub async fn on_inbound(&mut self, message: &str) -> TermResult<()> {
        let actions = self.controller.on_inbound(message);
        self.apply(actions).await
    }

    /// Carry out controller actions in order.
    async fn apply(&mut self, actions: Vec<Action>) -> TermResult<()> {
        for action in actions {
            match action {
                Action::Write(text) => self.display.write(&text)?,
                Action::Focus => self.display.focus(),
                Action::Send(frame) => {
                    let channel = self.channel.as_mut().ok_or(TermError::NotConnected)?;
                    let body = frame.to_json()?;
                    tracing::debug!(destination = frame.kind().destination(), "sending frame");
                    channel.publish(frame.kind().destination(), &body).await?;
                }
                Action::Notify(event) => {
                    if self.events.send(event).is_err() {
                        tracing::debug!("event receiver dropped");
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use wterm_core::SessionIdentity;

    use super::*;
    use crate::display::BufferDisplay;
    use crate::rewrite::CommandRewriter;

    #[derive(Default)]
    struct Shared {
        topics: Vec<String>,
        published: Vec<(String, String)>,
        inbound: Option<mpsc::UnboundedSender<String>>,
    }

    #[derive(Clone, Default)]
    struct MemoryConnector {
        shared: Arc<Mutex<Shared>>,
    }

    impl MemoryConnector {
        fn push(&self, message: &str) {
            let shared = self.shared.lock().unwrap();
            shared
                .inbound
                .as_ref()
                .unwrap()
                .send(message.to_string())
                .unwrap();
        }

        fn published(&self) -> Vec<(String, String)> {
            self.shared.lock().unwrap().published.clone()
        }

        fn commands(&self) -> Vec<Option<String>> {
            self.published()
                .iter()
                .map(|(_, body)| {
                    let value: serde_json::Value = serde_json::from_str(body).unwrap();
                    value["command"].as_str().map(str::to_string)
                })
                .collect()
        }

        fn close_inbound(&self) {
            self.shared.lock().unwrap().inbound = None;
        }
    }

    struct MemoryChannel {
        shared: Arc<Mutex<Shared>>,
        inbound: mpsc::UnboundedReceiver<String>,
        connected: bool,
    }

    impl MessageChannel for MemoryChannel {
        async fn publish(&mut self, destination: &str, body: &str) -> TermResult<()> {
            self.shared
                .lock()
                .unwrap()
                .published
                .push((destination.to_string(), body.to_string()));
            Ok(())
        }

        async fn next_message(&mut self) -> TermResult<Option<String>> {
            Ok(self.inbound.recv().await)
        }

        async fn close(&mut self) -> TermResult<()> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    impl ChannelConnector for MemoryConnector {
        type Channel = MemoryChannel;

        async fn open(&self, topic: &str) -> TermResult<MemoryChannel> {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut shared = self.shared.lock().unwrap();
            shared.topics.push(topic.to_string());
            shared.inbound = Some(tx);
            Ok(MemoryChannel {
                shared: self.shared.clone(),
                inbound: rx,
                connected: true,
            })
        }
    }

    type Client = TerminalClient<MemoryConnector, BufferDisplay>;

    fn client() -> (
        Client,
        MemoryConnector,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let connector = MemoryConnector::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let controller =
            SessionController::new(SessionIdentity::new(7, "0"), CommandRewriter::default());
        let client = TerminalClient::new(connector.clone(), controller, BufferDisplay::new(), tx);
        (client, connector, rx)
    }

    async fn deliver(client: &mut Client, connector: &MemoryConnector, message: &str) {
        connector.push(message);
        let message = client.next_inbound().await.unwrap().unwrap();
        client.on_inbound(&message).await.unwrap();
    }

    async fn ready() -> (
        Client,
        MemoryConnector,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let (mut client, connector, mut events) = client();
        client.connect().await.unwrap();
        assert_eq!(events.recv().await, Some(SessionEvent::ConnectSuccess));
        deliver(&mut client, &connector, "[root@web ~]# ").await;
        client.display_mut().take();
        (client, connector, events)
    }

    #[tokio::test]
    async fn connect_subscribes_then_sends_init() {
        let (mut client, connector, mut events) = client();
        client.connect().await.unwrap();

        assert_eq!(connector.shared.lock().unwrap().topics, vec!["/topic/output/7"]);
        assert_eq!(
            connector.published(),
            vec![(
                "/app/terminal/init".to_string(),
                r#"{"id":7,"type":"0","command":null}"#.to_string()
            )]
        );
        assert_eq!(events.recv().await, Some(SessionEvent::ConnectSuccess));
        assert_eq!(client.display().output, "connection success\r\n");
        assert_eq!(client.state(), SessionState::Init);
    }

    #[tokio::test]
    async fn topic_template_is_configurable() {
        let (client, _connector, _events) = client();
        let client = client.with_topic_template("/topic/shared");
        assert_eq!(client.topic(), "/topic/shared");
    }

    #[tokio::test]
    async fn typed_command_is_sent_to_exec() {
        let (mut client, connector, _events) = ready().await;
        client.handle_data("ls\r").await.unwrap();

        assert_eq!(client.display().output, "ls");
        let last = connector.published().pop().unwrap();
        assert_eq!(last.0, "/app/terminal/exec");
        assert_eq!(last.1, r#"{"id":7,"type":"0","command":"ls\r"}"#);
        assert_eq!(client.state(), SessionState::AwaitResponse);

        deliver(&mut client, &connector, "ls\r\na.txt\r\n[root@web ~]# ").await;
        assert_eq!(client.display().output, "ls\r\na.txt\r\n\r\n");
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn busy_submit_sends_nothing() {
        let (mut client, connector, _events) = ready().await;
        client.handle_data("sleep 5\r").await.unwrap();
        let before = connector.published().len();

        let err = client.handle_data("ls\r").await.unwrap_err();
        assert!(matches!(err, TermError::Busy(_)));
        assert_eq!(connector.published().len(), before);
    }

    #[tokio::test]
    async fn edit_round_trip() {
        let (mut client, connector, mut events) = ready().await;
        client.handle_data("vim notes.txt\r").await.unwrap();
        assert_eq!(
            connector.commands().last().cloned().flatten().as_deref(),
            Some("cat notes.txt\r")
        );

        deliver(&mut client, &connector, "cat notes.txt\r\n").await;
        deliver(&mut client, &connector, "hello\r\n[root@web ~]# ").await;
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::OpenEditor {
                filename: "notes.txt".into(),
                text: "hello".into(),
            })
        );

        client.save_editor("hello\nworld\n").await.unwrap();
        assert_eq!(client.state(), SessionState::EditorSave);
        deliver(&mut client, &connector, "printf '%s\\n' 'hello\r\n> world' > notes.txt\r\n").await;

        assert_eq!(events.recv().await, Some(SessionEvent::CloseEditor));
        assert_eq!(
            connector.commands().last().cloned().flatten().as_deref(),
            Some("\r")
        );
        assert_eq!(client.display().focus_count, 1);
    }

    #[tokio::test]
    async fn reconnect_during_capture_cancels() {
        let (mut client, connector, mut events) = ready().await;
        client.handle_data("vi big.log\r").await.unwrap();
        deliver(&mut client, &connector, "cat big.log\r\nfirst part").await;
        assert_eq!(client.state(), SessionState::ViCapture);

        client.reconnect().await.unwrap();
        assert_eq!(
            events.recv().await,
            Some(SessionEvent::Cancelled {
                state: SessionState::ViCapture
            })
        );
        assert_eq!(events.recv().await, Some(SessionEvent::ConnectSuccess));
        assert!(client.display().output.starts_with("\r\n"));
        assert_eq!(connector.shared.lock().unwrap().topics.len(), 2);
        assert_eq!(client.state(), SessionState::Init);

        deliver(&mut client, &connector, "[root@web ~]# ").await;
        assert_eq!(client.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn closed_channel_ends_inbound() {
        let (mut client, connector, _events) = ready().await;
        connector.close_inbound();
        assert_eq!(client.next_inbound().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sending_while_disconnected_fails() {
        let (mut client, _connector, _events) = ready().await;
        client.disconnect().await.unwrap();
        assert!(!client.is_connected());
        assert!(matches!(
            client.next_inbound().await,
            Err(TermError::NotConnected)
        ));
        assert!(matches!(
            client.interrupt().await,
            Err(TermError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn resize_refits_display() {
        let (mut client, _connector, _events) = client();
        client.resize(120, 40);
        assert_eq!(client.display().size, Some((120, 40)));
    }
}
