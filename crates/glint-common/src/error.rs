use std::io;
use thiserror::Error;

/// Version string shown to clients in version mismatch messages.
pub const GAME_VERSION: &str = "1.16.5";

#[derive(Debug, Error)]
pub enum GlintError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Proxy metadata in the handshake hostname could not be parsed.
    #[error("Malformed handshake data: {0}")]
    MalformedHandshakeData(String),

    /// The handshake asked for a next state other than status or login.
    #[error("Unsupported protocol state: {0}")]
    UnsupportedProtocolState(i32),

    #[error("Illegal protocol state transition from {from} to {to}")]
    IllegalStateTransition { from: String, to: String },

    #[error("Protocol version mismatch: client {client}, server {server}")]
    ProtocolVersionMismatch { client: i32, server: i32 },

    #[error("Proxy security key mismatch for {claimed_name}")]
    ProxySecurityMismatch { claimed_name: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl GlintError {
    pub fn decode(msg: impl Into<String>) -> Self {
        GlintError::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        GlintError::Encode(msg.into())
    }

    /// The reason shown to the client when this error closes its connection.
    pub fn disconnect_reason(&self) -> String {
        match self {
            GlintError::MalformedHandshakeData(_) => {
                "If you wish to use IP forwarding, please enable proxy forwarding in your proxy config as well!"
                    .to_owned()
            }
            GlintError::UnsupportedProtocolState(state) => {
                format!("Invalid handshake state: {}", state)
            }
            GlintError::IllegalStateTransition { .. } => "Invalid protocol state".to_owned(),
            GlintError::ProtocolVersionMismatch { client, server } if client < server => {
                format!("Outdated client! I'm running {}", GAME_VERSION)
            }
            GlintError::ProtocolVersionMismatch { .. } => {
                format!("Outdated server! I'm running {}", GAME_VERSION)
            }
            GlintError::ProxySecurityMismatch { .. } => {
                "Unable to authenticate - security key mismatch".to_owned()
            }
            GlintError::Authentication(msg) => format!("Failed to verify username: {}", msg),
            GlintError::Decode(_) | GlintError::Encode(_) => {
                "Internal protocol error, see server log".to_owned()
            }
            GlintError::Io(_) | GlintError::Config(_) | GlintError::Server(_) => {
                "Internal server error".to_owned()
            }
        }
    }
}

impl From<serde_json::Error> for GlintError {
    fn from(err: serde_json::Error) -> Self {
        GlintError::Decode(format!("invalid JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_version_mismatch_reason() {
        let old = GlintError::ProtocolVersionMismatch {
            client: 753,
            server: 754,
        };
        assert!(old.disconnect_reason().starts_with("Outdated client!"));

        let new = GlintError::ProtocolVersionMismatch {
            client: 755,
            server: 754,
        };
        assert!(new.disconnect_reason().starts_with("Outdated server!"));
    }

    #[test]
    fn test_malformed_handshake_mentions_forwarding() {
        let err = GlintError::MalformedHandshakeData("2 fields".to_owned());
        assert!(err.disconnect_reason().contains("proxy forwarding"));
    }

    #[test]
    fn test_json_error_is_decode_error() {
        let err: GlintError = serde_json::from_str::<Vec<u8>>("[").unwrap_err().into();
        assert_matches!(err, GlintError::Decode(_));
    }
}
