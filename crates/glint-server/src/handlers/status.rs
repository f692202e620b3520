use crate::context::NetworkContext;
use crate::handlers::unexpected;
use glint_common::error::GAME_VERSION;
use glint_common::Result;
use glint_protocol::status::{
    ServerStatus, StatusDescription, StatusPlayers, StatusResponsePacket, StatusVersion,
};
use glint_protocol::{Packet, PacketKind, PROTOCOL_VERSION};

pub fn server_status(context: &NetworkContext) -> ServerStatus {
    let config = &context.server.config;
    ServerStatus {
        version: StatusVersion {
            name: GAME_VERSION.to_owned(),
            protocol: PROTOCOL_VERSION,
        },
        players: StatusPlayers {
            max: config.max_players,
            online: context.server.online_count() as u32,
        },
        description: StatusDescription {
            text: config.motd.clone(),
        },
    }
}

pub fn handle_status_request(context: &NetworkContext, _packet: Packet) -> Result<()> {
    context
        .session
        .send(StatusResponsePacket::new(&server_status(context))?)
}

/// Echoes the payload and ends the status exchange.
pub fn handle_ping(context: &NetworkContext, packet: Packet) -> Result<()> {
    let ping = match packet {
        Packet::Ping(ping) => ping,
        other => return Err(unexpected(PacketKind::Ping, &other)),
    };
    context.session.send(ping)?;
    context.session.close("Status exchange complete");
    Ok(())
}
