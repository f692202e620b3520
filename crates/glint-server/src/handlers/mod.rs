pub mod handshake;
pub mod login;
pub mod play;
pub mod status;

use crate::dispatch::HandlerTable;
use glint_common::GlintError;
use glint_protocol::{Packet, PacketKind};

/// Handlers for every packet the server reacts to, with their affinities.
pub fn handler_table() -> HandlerTable {
    let mut table = HandlerTable::new();
    table
        .register_io(PacketKind::Handshake, handshake::handle_handshake)
        .register_io(PacketKind::StatusRequest, status::handle_status_request)
        .register_io(PacketKind::Ping, status::handle_ping)
        .register_async(PacketKind::LoginStart, login::handle_login_start)
        .register_io(PacketKind::EncryptionResponse, login::handle_encryption_response)
        .register_io(PacketKind::KeepAlive, play::handle_keep_alive)
        .register(PacketKind::ChatMessage, play::handle_chat_message)
        .register(PacketKind::PlayerPosition, play::handle_player_position)
        .register(PacketKind::ClientSettings, play::handle_client_settings)
        .register(PacketKind::PluginMessage, play::handle_plugin_message)
        .register(PacketKind::RegisterChannel, play::handle_register_channel)
        .register(PacketKind::UnregisterChannel, play::handle_unregister_channel);
    table
}

pub(crate) fn unexpected(expected: PacketKind, packet: &Packet) -> GlintError {
    GlintError::Server(format!(
        "{:?} handler received {:?}",
        expected,
        packet.kind()
    ))
}
