use glint_common::{GlintError, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolState {
    Handshake,
    Status,
    Login,
    Play,
}

impl ProtocolState {
    /// Maps the handshake `next state` field. Only status (1) and login (2) are valid.
    pub fn from_next_state(next_state: i32) -> Result<Self> {
        match next_state {
            1 => Ok(ProtocolState::Status),
            2 => Ok(ProtocolState::Login),
            other => Err(GlintError::UnsupportedProtocolState(other)),
        }
    }

    pub fn can_transition_to(self, target: ProtocolState) -> bool {
        matches!(
            (self, target),
            (ProtocolState::Handshake, ProtocolState::Status)
                | (ProtocolState::Handshake, ProtocolState::Login)
                | (ProtocolState::Login, ProtocolState::Play)
        )
    }

    /// Returns the target state when the edge is legal.
    pub fn transition(self, target: ProtocolState) -> Result<ProtocolState> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(GlintError::IllegalStateTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolState::Handshake => "HANDSHAKE",
            ProtocolState::Status => "STATUS",
            ProtocolState::Login => "LOGIN",
            ProtocolState::Play => "PLAY",
        };
        f.write_str(name)
    }
}
