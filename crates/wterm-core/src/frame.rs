//! Outgoing terminal frames.
//!
//! Every frame the client publishes is a JSON record `{id, type, command}`.
//! The init frame carries `command: null`; exec frames carry the command text.

use serde::{Deserialize, Serialize};

/// STOMP destination for the session init frame.
pub const INIT_DESTINATION: &str = "/app/terminal/init";

/// STOMP destination for exec frames.
pub const EXEC_DESTINATION: &str = "/app/terminal/exec";

/// Default inbound topic; `{id}` is replaced with the session id.
pub const DEFAULT_TOPIC_TEMPLATE: &str = "/topic/output/{id}";

/// Literal command the terminal bridge translates into SIGINT.
pub const INTERRUPT_COMMAND: &str = "Ctrl + C";

/// Bare carriage return, used to make the remote shell print its prompt.
pub const CARRIAGE_RETURN: &str = "\r";

/// Which remote session a client talks to and how the bridge reaches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Host record id on the bridge.
    pub id: i64,
    /// Opaque connection type understood by the bridge ("0" password, "1" key path).
    pub connection_type: String,
}

impl SessionIdentity {
    pub fn new(id: i64, connection_type: impl Into<String>) -> Self {
        Self {
            id,
            connection_type: connection_type.into(),
        }
    }

    /// Resolve the inbound topic for this session from a template.
    ///
    /// A template without `{id}` is returned unchanged.
    pub fn topic(&self, template: &str) -> String {
        template.replace("{id}", &self.id.to_string())
    }
}

/// Kind of outgoing frame, which selects the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Init,
    Exec,
}

impl FrameKind {
    pub fn destination(self) -> &'static str {
        match self {
            Self::Init => INIT_DESTINATION,
            Self::Exec => EXEC_DESTINATION,
        }
    }
}

/// One outgoing protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingFrame {
    #[serde(rename = "id")]
    pub session_id: i64,
    #[serde(rename = "type")]
    pub connection_type: String,
    pub command: Option<String>,
}

impl OutgoingFrame {
    /// The frame sent once after every successful connect.
    pub fn init(identity: &SessionIdentity) -> Self {
        Self {
            session_id: identity.id,
            connection_type: identity.connection_type.clone(),
            command: None,
        }
    }

    pub fn exec(identity: &SessionIdentity, command: impl Into<String>) -> Self {
        Self {
            session_id: identity.id,
            connection_type: identity.connection_type.clone(),
            command: Some(command.into()),
        }
    }

    pub fn kind(&self) -> FrameKind {
        if self.command.is_some() {
            FrameKind::Exec
        } else {
            FrameKind::Init
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
