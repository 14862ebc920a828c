//! Session states and the transition table.

use std::fmt;

/// Protocol state of a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Connected, waiting for the first inbound message (the initial prompt).
    Init,
    /// Idle; the next Enter submits a command.
    Ready,
    /// A command was sent; its first response has not arrived yet.
    AwaitResponse,
    /// Response chunks are being forwarded to the display.
    Streaming,
    /// Response chunks are being captured as file content for the editor.
    ViCapture,
    /// A write command is in flight; waiting for its echo.
    EditorSave,
}

impl SessionState {
    pub const ALL: [SessionState; 6] = [
        Self::Init,
        Self::Ready,
        Self::AwaitResponse,
        Self::Streaming,
        Self::ViCapture,
        Self::EditorSave,
    ];

    /// Whether `next` may directly follow `self`.
    ///
    /// Any state may fall back to `Init` when the transport is torn down.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        if next == Init {
            return true;
        }
        matches!(
            (self, next),
            (Init, Ready)
                | (Ready, AwaitResponse)
                | (Ready, Streaming)
                | (AwaitResponse, Streaming)
                | (AwaitResponse, Ready)
                | (Streaming, Ready)
                | (Streaming, ViCapture)
                | (Streaming, EditorSave)
                | (ViCapture, Ready)
                | (EditorSave, Streaming)
                | (EditorSave, Ready)
        )
    }

    /// Whether a frame is in flight, so new submits must be refused.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Self::AwaitResponse | Self::Streaming | Self::ViCapture | Self::EditorSave
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ready => "ready",
            Self::AwaitResponse => "await-response",
            Self::Streaming => "streaming",
            Self::ViCapture => "vi-capture",
            Self::EditorSave => "editor-save",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn transition_table_is_exact() {
        let allowed = [
            (Init, Ready),
            (Ready, AwaitResponse),
            (Ready, Streaming),
            (AwaitResponse, Streaming),
            (AwaitResponse, Ready),
            (Streaming, Ready),
            (Streaming, ViCapture),
            (Streaming, EditorSave),
            (ViCapture, Ready),
            (EditorSave, Streaming),
            (EditorSave, Ready),
        ];

        for from in SessionState::ALL {
            for to in SessionState::ALL {
                let expected = to == Init || allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn capture_cannot_skip_streaming() {
        assert!(!AwaitResponse.can_transition_to(ViCapture));
        assert!(!Ready.can_transition_to(EditorSave));
        assert!(!Init.can_transition_to(AwaitResponse));
    }

    #[test]
    fn busy_states() {
        assert!(!Init.is_busy());
        assert!(!Ready.is_busy());
        for state in [AwaitResponse, Streaming, ViCapture, EditorSave] {
            assert!(state.is_busy(), "{state}");
        }
    }
}
