use crate::dispatch::AsyncJob;
use glint_common::{GameProfile, GlintError, Result};
use glint_protocol::client_settings::ClientSettingsPacket;
use glint_protocol::{Packet, ProtocolState, PROTOCOL_VERSION};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Work for the connection task, applied strictly in the order it was queued.
#[derive(Debug)]
pub enum Outbound {
    /// A packet encoded with the state captured when it was sent.
    Packet { state: ProtocolState, packet: Packet },
    Compression(i32),
    Encryption(Vec<u8>),
    Close { state: ProtocolState, reason: String },
}

/// Host and port a client believes it connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualAddress {
    pub host: String,
    pub port: u16,
}

impl VirtualAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Data a proxy can attach during the handshake.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionExtensions {
    /// Real client address reported by a proxy
    pub virtual_address: Option<VirtualAddress>,
    pub spoofed_profile: Option<GameProfile>,
    pub modded: bool,
}

#[derive(Debug, Default)]
pub struct LoginState {
    pub username: Option<String>,
    pub verify_token: Vec<u8>,
}

#[derive(Debug)]
pub struct KeepAliveState {
    pub last_id: i64,
    pub sent_at: Option<Instant>,
    pub last_response: Option<Instant>,
}

/// Mutable per-connection data. Guarded by a short lock in [`Session`].
#[derive(Debug)]
pub struct SessionState {
    pub protocol_state: ProtocolState,
    pub protocol_version: i32,
    pub virtual_host: Option<VirtualAddress>,
    pub compression_threshold: i32,
    pub encrypted: bool,
    pub extensions: SessionExtensions,
    pub login: LoginState,
    pub profile: Option<GameProfile>,
    pub channels: HashSet<String>,
    pub keep_alive: KeepAliveState,
    pub settings: Option<ClientSettingsPacket>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            protocol_state: ProtocolState::Handshake,
            protocol_version: PROTOCOL_VERSION,
            virtual_host: None,
            compression_threshold: -1,
            encrypted: false,
            extensions: SessionExtensions::default(),
            login: LoginState::default(),
            profile: None,
            channels: HashSet::new(),
            keep_alive: KeepAliveState {
                last_id: 0,
                sent_at: None,
                last_response: None,
            },
            settings: None,
        }
    }
}

/// One client connection. Shared between the connection task, the main thread
/// and the async lane; all writes go through the ordered outbound queue.
pub struct Session {
    id: u64,
    peer: SocketAddr,
    state: Mutex<SessionState>,
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: AtomicBool,
    pub(crate) lane: OnceCell<mpsc::UnboundedSender<AsyncJob>>,
}

impl Session {
    pub fn new(id: u64, peer: SocketAddr) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let session = Self {
            id,
            peer,
            state: Mutex::new(SessionState::new()),
            outbound,
            closed: AtomicBool::new(false),
            lane: OnceCell::new(),
        };
        (session, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Locks the mutable state. Never hold the guard across an await point.
    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn protocol_state(&self) -> ProtocolState {
        self.state().protocol_state
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Applies a legal transition. Illegal targets close the connection and
    /// leave the state untouched.
    pub fn set_protocol_state(&self, target: ProtocolState) -> Result<()> {
        let mut state = self.state();
        match state.protocol_state.transition(target) {
            Ok(next) => {
                state.protocol_state = next;
                Ok(())
            }
            Err(e) => {
                let current = state.protocol_state;
                drop(state);
                self.close_in(current, &e.disconnect_reason());
                Err(e)
            }
        }
    }

    /// Queues a packet. Order between calls on one session is preserved.
    pub fn send(&self, packet: impl Into<Packet>) -> Result<()> {
        let state = self.state();
        self.enqueue(Outbound::Packet {
            state: state.protocol_state,
            packet: packet.into(),
        })
    }

    /// Queues `packet` in the current state and moves to `target` under the same
    /// lock, so nothing decoded afterwards sees the old state.
    pub fn send_and_transition(&self, packet: impl Into<Packet>, target: ProtocolState) -> Result<()> {
        let mut state = self.state();
        let next = state.protocol_state.transition(target)?;
        self.enqueue(Outbound::Packet {
            state: state.protocol_state,
            packet: packet.into(),
        })?;
        state.protocol_state = next;
        Ok(())
    }

    /// Compression starts right after everything queued so far.
    pub fn set_compression(&self, threshold: i32) -> Result<()> {
        let mut state = self.state();
        state.compression_threshold = threshold;
        self.enqueue(Outbound::Compression(threshold))
    }

    /// Installs the cipher after everything queued so far. Only allowed once.
    pub fn enable_encryption(&self, shared_secret: Vec<u8>) -> Result<()> {
        let mut state = self.state();
        if state.encrypted {
            return Err(GlintError::Authentication(
                "encryption is already enabled".to_owned(),
            ));
        }
        state.encrypted = true;
        self.enqueue(Outbound::Encryption(shared_secret))
    }

    /// Closes the connection with a reason shown to the client. Idempotent.
    pub fn close(&self, reason: &str) {
        let state = self.protocol_state();
        self.close_in(state, reason);
    }

    /// Closes with the reason an error maps to.
    pub fn close_with(&self, error: &GlintError) {
        self.close(&error.disconnect_reason());
    }

    fn close_in(&self, state: ProtocolState, reason: &str) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The receiver is gone only once the connection task has already finished.
        let _ = self.outbound.send(Outbound::Close {
            state,
            reason: reason.to_owned(),
        });
    }

    fn enqueue(&self, item: Outbound) -> Result<()> {
        if self.is_closed() {
            return Err(GlintError::Server(format!("session {} is closed", self.id)));
        }
        self.outbound
            .send(item)
            .map_err(|_| GlintError::Server(format!("session {} has no writer", self.id)))
    }

    pub fn profile(&self) -> Option<GameProfile> {
        self.state().profile.clone()
    }

    pub fn username(&self) -> Option<String> {
        let state = self.state();
        state
            .profile
            .as_ref()
            .map(|profile| profile.name.clone())
            .or_else(|| state.login.username.clone())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.username() {
            Some(name) => write!(f, "{} ({}) #{}", name, self.peer, self.id),
            None => write!(f, "{} #{}", self.peer, self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use glint_protocol::keep_alive::KeepAlivePacket;
    use glint_protocol::login::LoginSuccessPacket;
    use uuid::Uuid;

    fn session() -> (Session, mpsc::UnboundedReceiver<Outbound>) {
        Session::new(1, "127.0.0.1:40000".parse().unwrap())
    }

    #[test]
    fn test_send_captures_state_in_order() {
        let (session, mut rx) = session();
        session.set_protocol_state(ProtocolState::Login).unwrap();
        session.set_compression(64).unwrap();
        session
            .send_and_transition(LoginSuccessPacket::new(Uuid::nil(), "a"), ProtocolState::Play)
            .unwrap();
        session.send(KeepAlivePacket::new(1)).unwrap();

        assert_matches!(rx.try_recv(), Ok(Outbound::Compression(64)));
        assert_matches!(
            rx.try_recv(),
            Ok(Outbound::Packet { state: ProtocolState::Login, .. })
        );
        assert_matches!(
            rx.try_recv(),
            Ok(Outbound::Packet { state: ProtocolState::Play, .. })
        );
    }

    #[test]
    fn test_illegal_transition_closes_without_mutation() {
        let (session, mut rx) = session();
        assert_matches!(
            session.set_protocol_state(ProtocolState::Play),
            Err(GlintError::IllegalStateTransition { .. })
        );
        assert_eq!(session.protocol_state(), ProtocolState::Handshake);
        assert!(session.is_closed());
        assert_matches!(rx.try_recv(), Ok(Outbound::Close { state: ProtocolState::Handshake, .. }));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (session, mut rx) = session();
        session.set_protocol_state(ProtocolState::Login).unwrap();
        session.close("first");
        session.close("second");
        match rx.try_recv() {
            Ok(Outbound::Close { state, reason }) => {
                assert_eq!(state, ProtocolState::Login);
                assert_eq!(reason, "first");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(rx.try_recv().is_err());
        assert!(session.send(KeepAlivePacket::new(1)).is_err());
    }

    #[test]
    fn test_encryption_is_write_once() {
        let (session, _rx) = session();
        session.enable_encryption(vec![1; 16]).unwrap();
        assert_matches!(
            session.enable_encryption(vec![1; 16]),
            Err(GlintError::Authentication(_))
        );
    }
}
