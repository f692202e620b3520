use crate::context::NetworkContext;
use crate::handlers::unexpected;
use crate::proxy::negotiate;
use glint_common::{GlintError, Result};
use glint_logger::log;
use glint_logger::LogSeverity::{Debug, Warning};
use glint_protocol::{Packet, PacketKind, ProtocolState};

pub fn handle_handshake(context: &NetworkContext, packet: Packet) -> Result<()> {
    let handshake = match packet {
        Packet::Handshake(handshake) => handshake,
        other => return Err(unexpected(PacketKind::Handshake, &other)),
    };
    let session = &context.session;
    let proxy = &context.server.config.proxy;

    let outcome = match negotiate(&handshake, proxy.dialect, &proxy.secret, session.peer().port()) {
        Ok(outcome) => outcome,
        Err(e) => {
            // A login attempt gets its reason as a login disconnect.
            if matches!(
                ProtocolState::from_next_state(handshake.next_state),
                Ok(ProtocolState::Login)
            ) {
                session.set_protocol_state(ProtocolState::Login)?;
            }
            if let GlintError::ProxySecurityMismatch { claimed_name } = &e {
                log(
                    format!("{} ({}) used the wrong proxy security key", claimed_name, session.peer()),
                    Warning,
                );
                session.close_with(&e);
                return Ok(());
            }
            return Err(e);
        }
    };

    log(
        format!(
            "{} handshake: {} via {} (modded: {})",
            session, outcome.next_state, outcome.virtual_host, outcome.extensions.modded
        ),
        Debug,
    );
    {
        let mut state = session.state();
        state.protocol_version = handshake.protocol_version;
        state.virtual_host = Some(outcome.virtual_host);
        state.extensions = outcome.extensions;
    }
    session.set_protocol_state(outcome.next_state)
}
