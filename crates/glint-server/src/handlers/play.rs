use crate::context::NetworkContext;
use crate::game::GameState;
use crate::handlers::unexpected;
use glint_common::{GlintError, Result};
use glint_logger::log;
use glint_logger::LogSeverity::Debug;
use glint_protocol::{Packet, PacketKind};
use tokio::time::Instant;
use uuid::Uuid;

fn player_id(context: &NetworkContext) -> Result<Uuid> {
    context
        .session
        .profile()
        .map(|profile| profile.id)
        .ok_or_else(|| GlintError::Server(format!("{} has no profile in play", context.session)))
}

/// Records the reply to our latest keep-alive. Stale ids are ignored.
pub fn handle_keep_alive(context: &NetworkContext, packet: Packet) -> Result<()> {
    let keep_alive = match packet {
        Packet::KeepAlive(keep_alive) => keep_alive,
        other => return Err(unexpected(PacketKind::KeepAlive, &other)),
    };
    let mut state = context.session.state();
    if keep_alive.keep_alive_id == state.keep_alive.last_id {
        state.keep_alive.last_response = Some(Instant::now());
    } else {
        log(
            format!(
                "Stale keep alive {} from {}",
                keep_alive.keep_alive_id, context.session
            ),
            Debug,
        );
    }
    Ok(())
}

pub fn handle_chat_message(context: &NetworkContext, game: &mut GameState, packet: Packet) -> Result<()> {
    let chat = match packet {
        Packet::ChatMessage(chat) => chat,
        other => return Err(unexpected(PacketKind::ChatMessage, &other)),
    };
    game.chat(&player_id(context)?, chat.message.trim());
    Ok(())
}

pub fn handle_player_position(
    context: &NetworkContext,
    game: &mut GameState,
    packet: Packet,
) -> Result<()> {
    let position = match packet {
        Packet::PlayerPosition(position) => position,
        other => return Err(unexpected(PacketKind::PlayerPosition, &other)),
    };
    if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
        return Err(GlintError::decode("non-finite player position"));
    }
    game.move_player(&player_id(context)?, (position.x, position.y, position.z));
    Ok(())
}

pub fn handle_client_settings(
    context: &NetworkContext,
    _game: &mut GameState,
    packet: Packet,
) -> Result<()> {
    let settings = match packet {
        Packet::ClientSettings(settings) => settings,
        other => return Err(unexpected(PacketKind::ClientSettings, &other)),
    };
    log(format!("{} settings: {:?}", context.session, settings), Debug);
    context.session.state().settings = Some(settings);
    Ok(())
}

pub fn handle_plugin_message(
    context: &NetworkContext,
    _game: &mut GameState,
    packet: Packet,
) -> Result<()> {
    let message = match packet {
        Packet::PluginMessage(message) => message,
        other => return Err(unexpected(PacketKind::PluginMessage, &other)),
    };
    log(
        format!(
            "{} sent {} bytes on {}",
            context.session,
            message.data.len(),
            message.channel
        ),
        Debug,
    );
    Ok(())
}

pub fn handle_register_channel(
    context: &NetworkContext,
    _game: &mut GameState,
    packet: Packet,
) -> Result<()> {
    let register = match packet {
        Packet::RegisterChannel(register) => register,
        other => return Err(unexpected(PacketKind::RegisterChannel, &other)),
    };
    context.session.state().channels.insert(register.channel);
    Ok(())
}

pub fn handle_unregister_channel(
    context: &NetworkContext,
    _game: &mut GameState,
    packet: Packet,
) -> Result<()> {
    let unregister = match packet {
        Packet::UnregisterChannel(unregister) => unregister,
        other => return Err(unexpected(PacketKind::UnregisterChannel, &other)),
    };
    context.session.state().channels.remove(&unregister.channel);
    Ok(())
}
