//! The per-session protocol state machine.
//!
//! `SessionController` is synchronous and performs no I/O. Each operation
//! returns the ordered [`Action`]s the caller must carry out: text for the
//! display, frames for the transport, and events for the editor collaborator.

use tracing::{debug, info};
use wterm_core::frame::CARRIAGE_RETURN;
use wterm_core::{OutgoingFrame, SessionIdentity, TermError, TermResult, INTERRUPT_COMMAND};

use crate::capture::CaptureBuffer;
use crate::classifier::{CaptureStep, PromptClassifier, ResponseClassifier};
use crate::input::{KeyInput, LineInput};
use crate::rewrite::CommandRewriter;
use crate::save;
use crate::state::SessionState;

/// Banner written once the transport is up.
pub const CONNECTED_BANNER: &str = "connection success\r\n";

/// Events for the collaborator that owns the editor and connection UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectSuccess,
    /// A capture finished; open the editor on `text`.
    OpenEditor { filename: String, text: String },
    /// The capture target does not exist.
    OpenEditorFailure { filename: String },
    /// The save was confirmed; close the editor.
    CloseEditor,
    /// The save response did not confirm the write.
    SaveFailure { filename: String },
    /// A capture or save was abandoned while in `state`.
    Cancelled { state: SessionState },
}

/// Side effect requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write text to the display sink.
    Write(String),
    /// Return keyboard focus to the terminal.
    Focus,
    /// Publish a frame on the transport.
    Send(OutgoingFrame),
    /// Deliver an event to the collaborator.
    Notify(SessionEvent),
}

/// Owns all protocol state of one terminal session.
pub struct SessionController {
    identity: SessionIdentity,
    state: SessionState,
    /// Last observed shell prompt, untrimmed.
    prompt: String,
    /// Last submitted command, after rewriting and without the carriage return.
    last_command: String,
    /// File captured for editing, kept until it is saved or abandoned.
    edit_target: Option<String>,
    capture_pending: bool,
    /// The last `cd` response has not yet shown the new prompt.
    prompt_refresh_pending: bool,
    /// The current write was already reported as failed.
    save_failed: bool,
    input: LineInput,
    capture: CaptureBuffer,
    rewriter: CommandRewriter,
    classifier: Box<dyn ResponseClassifier>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("prompt", &self.prompt)
            .field("last_command", &self.last_command)
            .field("edit_target", &self.edit_target)
            .field("capture_pending", &self.capture_pending)
            .field("save_failed", &self.save_failed)
            .finish()
    }
}

impl SessionController {
    pub fn new(identity: SessionIdentity, rewriter: CommandRewriter) -> Self {
        Self {
            identity,
            state: SessionState::Init,
            prompt: String::new(),
            last_command: String::new(),
            edit_target: None,
            capture_pending: false,
            prompt_refresh_pending: false,
            save_failed: false,
            input: LineInput::new(),
            capture: CaptureBuffer::new(),
            rewriter,
            classifier: Box::new(PromptClassifier),
        }
    }

    /// Replace the echo/prompt heuristics.
    pub fn with_classifier(mut self, classifier: Box<dyn ResponseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn last_command(&self) -> &str {
        &self.last_command
    }

    pub fn edit_target(&self) -> Option<&str> {
        self.edit_target.as_deref()
    }

    pub fn input(&self) -> &str {
        self.input.as_str()
    }

    pub fn captured(&self) -> &str {
        self.capture.as_str()
    }

    // ── Transport lifecycle ──────────────────────────────────────────

    /// The channel is open and subscribed: announce it and send the init frame.
    pub fn on_connected(&mut self) -> Vec<Action> {
        info!(session = self.identity.id, "terminal channel connected");
        vec![
            Action::Notify(SessionEvent::ConnectSuccess),
            Action::Write(CONNECTED_BANNER.to_string()),
            Action::Send(OutgoingFrame::init(&self.identity)),
        ]
    }

    /// The channel is gone: abandon in-flight work and wait for a new prompt.
    pub fn teardown(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.capture_pending
            || matches!(self.state, SessionState::ViCapture | SessionState::EditorSave)
        {
            actions.push(Action::Notify(SessionEvent::Cancelled { state: self.state }));
        }
        self.capture.clear();
        self.capture_pending = false;
        self.prompt_refresh_pending = false;
        self.save_failed = false;
        self.edit_target = None;
        self.input.clear();
        self.advance(SessionState::Init);
        actions
    }

    // ── Keyboard ─────────────────────────────────────────────────────

    pub fn on_key(&mut self, key: KeyInput) -> TermResult<Vec<Action>> {
        match key {
            KeyInput::Char(c) => Ok(vec![Action::Write(self.input.push(c))]),
            KeyInput::Space => Ok(vec![Action::Write(self.input.push(' '))]),
            KeyInput::Backspace => Ok(self
                .input
                .erase()
                .map(|seq| vec![Action::Write(seq.to_string())])
                .unwrap_or_default()),
            KeyInput::Enter => self.submit(),
            KeyInput::Interrupt => Ok(self.interrupt()),
        }
    }

    /// Send the pending line as a command.
    ///
    /// Refused while a frame is in flight; the line is kept for a retry.
    pub fn submit(&mut self) -> TermResult<Vec<Action>> {
        if self.state.is_busy() {
            return Err(TermError::Busy(format!(
                "cannot submit while {}",
                self.state
            )));
        }
        if self.state == SessionState::Init {
            return Err(TermError::Busy("waiting for the initial prompt".into()));
        }

        let rewritten = self.rewriter.rewrite(self.input.as_str());
        self.input.clear();

        self.capture_pending = rewritten.edit_target.is_some();
        if let Some(target) = rewritten.edit_target {
            debug!(file = %target, "arming capture");
            self.edit_target = Some(target);
        }
        self.prompt_refresh_pending = is_directory_change(&rewritten.command);
        self.last_command = rewritten.command;
        self.advance(SessionState::AwaitResponse);

        Ok(vec![Action::Send(OutgoingFrame::exec(
            &self.identity,
            format!("{}{CARRIAGE_RETURN}", self.last_command),
        ))])
    }

    /// Send the literal interrupt command and resynchronise to `Ready`.
    pub fn interrupt(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.capture_pending
            || matches!(self.state, SessionState::ViCapture | SessionState::EditorSave)
        {
            actions.push(Action::Notify(SessionEvent::Cancelled { state: self.state }));
            self.edit_target = None;
        }
        self.capture.clear();
        self.capture_pending = false;
        self.prompt_refresh_pending = false;
        self.save_failed = false;

        actions.push(Action::Send(OutgoingFrame::exec(
            &self.identity,
            INTERRUPT_COMMAND,
        )));
        self.input.clear();

        if self.state.is_busy() {
            self.advance(SessionState::Ready);
        }
        actions
    }

    // ── Inbound ──────────────────────────────────────────────────────

    /// Route one inbound message according to the current state.
    pub fn on_inbound(&mut self, chunk: &str) -> Vec<Action> {
        match self.state {
            SessionState::Init => {
                self.prompt = chunk.to_string();
                debug!(prompt = %self.prompt.trim(), "initial prompt");
                self.advance(SessionState::Ready);
                vec![Action::Write(chunk.to_string())]
            }
            SessionState::Ready => vec![Action::Write(chunk.to_string())],
            SessionState::AwaitResponse => {
                self.advance(SessionState::Streaming);
                if self.capture_pending {
                    self.capture_pending = false;
                    self.advance(SessionState::ViCapture);
                    self.capture_chunk(chunk)
                } else {
                    self.first_response(chunk)
                }
            }
            SessionState::Streaming => {
                self.refresh_prompt_from(chunk);
                if self.classifier.shows_prompt(chunk, &self.prompt) {
                    self.advance(SessionState::Ready);
                }
                vec![Action::Write(chunk.to_string())]
            }
            SessionState::ViCapture => self.capture_chunk(chunk),
            SessionState::EditorSave => self.save_response(chunk),
        }
    }

    fn first_response(&mut self, chunk: &str) -> Vec<Action> {
        let first = self
            .classifier
            .first_response(chunk, &self.last_command, &self.prompt);

        if let Some(stripped) = &first.echo_stripped {
            self.refresh_prompt_from(stripped);
        }
        if self.classifier.shows_prompt(chunk, &self.prompt) {
            self.advance(SessionState::Ready);
        }

        if first.display.is_empty() {
            Vec::new()
        } else {
            vec![Action::Write(first.display)]
        }
    }

    /// After `cd`, the last line of the response becomes the tracked prompt.
    fn refresh_prompt_from(&mut self, text: &str) {
        if !self.prompt_refresh_pending {
            return;
        }
        let last_line = text.rsplit('\n').next().unwrap_or(text);
        if last_line.trim().is_empty() {
            return;
        }
        debug!(prompt = %last_line.trim(), "prompt redefined by directory change");
        self.prompt = last_line.to_string();
        self.prompt_refresh_pending = false;
    }

    fn capture_chunk(&mut self, chunk: &str) -> Vec<Action> {
        let filename = self.edit_target.clone().unwrap_or_default();

        match self
            .classifier
            .capture_step(chunk, &self.last_command, &self.prompt)
        {
            CaptureStep::NotFound { prompt_seen } => {
                debug!(file = %filename, "capture target not found");
                self.capture.clear();
                self.edit_target = None;
                self.advance(SessionState::Ready);

                let mut actions = vec![Action::Notify(SessionEvent::OpenEditorFailure {
                    filename,
                })];
                if prompt_seen {
                    actions.push(Action::Write(format!("\r\n{}", self.prompt)));
                }
                actions
            }
            CaptureStep::Append(piece) => {
                self.capture.append(&piece);
                Vec::new()
            }
            CaptureStep::Complete(piece) => {
                self.capture.append(&piece);
                let text = self.capture.finish();
                debug!(file = %filename, bytes = text.len(), "capture complete");
                self.advance(SessionState::Ready);
                vec![Action::Notify(SessionEvent::OpenEditor { filename, text })]
            }
        }
    }

    // ── Editor save ──────────────────────────────────────────────────

    /// Write edited text back to the captured file.
    ///
    /// Allowed from `Ready` and, to retry after a failure, from `EditorSave`.
    pub fn save_editor(&mut self, text: &str) -> TermResult<Vec<Action>> {
        match self.state {
            SessionState::Ready => {
                let filename = self.edit_target.clone().ok_or(TermError::NoEditTarget)?;
                self.advance(SessionState::Streaming);
                self.advance(SessionState::EditorSave);
                Ok(self.send_write(text, &filename))
            }
            SessionState::EditorSave => {
                let filename = self.edit_target.clone().ok_or(TermError::NoEditTarget)?;
                debug!(file = %filename, "retrying save");
                Ok(self.send_write(text, &filename))
            }
            other => Err(TermError::Busy(format!("cannot save while {other}"))),
        }
    }

    /// Leave the edit without saving and bring the prompt back.
    pub fn abandon_edit(&mut self) -> TermResult<Vec<Action>> {
        match self.state {
            SessionState::EditorSave => {
                self.save_failed = false;
                self.advance(SessionState::Ready);
            }
            SessionState::Ready => {}
            other => return Err(TermError::Busy(format!("cannot abandon edit while {other}"))),
        }
        self.edit_target = None;
        Ok(self.refresh_prompt())
    }

    fn send_write(&mut self, text: &str, filename: &str) -> Vec<Action> {
        self.save_failed = false;
        self.last_command = save::write_command(text, filename);
        vec![Action::Send(OutgoingFrame::exec(
            &self.identity,
            format!("{}{CARRIAGE_RETURN}", self.last_command),
        ))]
    }

    /// One verdict per write: after a failure, the rest of the reply is shown
    /// raw until the next save or abandon.
    fn save_response(&mut self, chunk: &str) -> Vec<Action> {
        if self.save_failed {
            return vec![Action::Write(chunk.to_string())];
        }
        if !self.classifier.save_confirmed(chunk, &self.last_command) {
            let filename = self.edit_target.clone().unwrap_or_default();
            debug!(file = %filename, "save not confirmed");
            self.save_failed = true;
            return vec![Action::Notify(SessionEvent::SaveFailure { filename })];
        }

        self.edit_target = None;
        self.advance(SessionState::Streaming);
        let mut actions = vec![Action::Notify(SessionEvent::CloseEditor)];
        actions.extend(self.send_carriage_return());
        actions
    }

    /// Bare carriage return from `Ready`; the reply is streamed raw.
    fn refresh_prompt(&mut self) -> Vec<Action> {
        self.advance(SessionState::Streaming);
        self.send_carriage_return()
    }

    fn send_carriage_return(&mut self) -> Vec<Action> {
        self.last_command.clear();
        vec![
            Action::Send(OutgoingFrame::exec(&self.identity, CARRIAGE_RETURN)),
            Action::Focus,
        ]
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
    }
}

/// `cd` as a whole first token.
fn is_directory_change(command: &str) -> bool {
    command == "cd"
        || command
            .strip_prefix("cd")
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}
