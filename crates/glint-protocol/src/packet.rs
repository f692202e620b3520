use crate::buffer::PacketBuffer;
use crate::chat::{ChatBroadcastPacket, ChatMessagePacket};
use crate::chunk_data::ChunkDataPacket;
use crate::client_settings::ClientSettingsPacket;
use crate::disconnect::DisconnectPacket;
use crate::handshake::HandshakePacket;
use crate::join_game::JoinGamePacket;
use crate::keep_alive::KeepAlivePacket;
use crate::login::{
    EncryptionRequestPacket, EncryptionResponsePacket, LoginStartPacket, LoginSuccessPacket,
    SetCompressionPacket,
};
use crate::player_position::{PlayerPositionAndLookPacket, PlayerPositionPacket};
use crate::plugin_message::{PluginMessagePacket, RegisterChannelPacket, UnregisterChannelPacket};
use crate::status::{PingPacket, StatusRequestPacket, StatusResponsePacket};
use glint_common::{GlintError, Result};

/// Body codec of a single packet type. The packet id is not part of the body;
/// ids live in the protocol registry per state and direction.
pub trait PacketBody: Sized {
    fn read_body(_buffer: &mut PacketBuffer) -> Result<Self> {
        Err(GlintError::decode(format!(
            "{} cannot be decoded",
            std::any::type_name::<Self>()
        )))
    }

    fn write_body(&self, _buffer: &mut PacketBuffer) -> Result<()> {
        Err(GlintError::encode(format!(
            "{} cannot be encoded",
            std::any::type_name::<Self>()
        )))
    }
}

macro_rules! packets {
    ($($variant:ident($body:ty)),* $(,)?) => {
        /// Every packet the engine knows about, plus [`BulkPacket`].
        #[derive(Debug, Clone, PartialEq)]
        pub enum Packet {
            $($variant($body),)*
            Bulk(BulkPacket),
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum PacketKind {
            $($variant,)*
            Bulk,
        }

        impl Packet {
            pub fn kind(&self) -> PacketKind {
                match self {
                    $(Packet::$variant(_) => PacketKind::$variant,)*
                    Packet::Bulk(_) => PacketKind::Bulk,
                }
            }

            /// Writes the packet body without its id.
            pub fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
                match self {
                    $(Packet::$variant(body) => body.write_body(buffer),)*
                    Packet::Bulk(_) => Err(GlintError::encode(
                        "bulk packets are written one frame per sub-packet",
                    )),
                }
            }
        }

        $(
            impl From<$body> for Packet {
                fn from(body: $body) -> Self {
                    Packet::$variant(body)
                }
            }
        )*
    };
}

packets! {
    Handshake(HandshakePacket),
    StatusRequest(StatusRequestPacket),
    StatusResponse(StatusResponsePacket),
    Ping(PingPacket),
    LoginStart(LoginStartPacket),
    EncryptionRequest(EncryptionRequestPacket),
    EncryptionResponse(EncryptionResponsePacket),
    LoginSuccess(LoginSuccessPacket),
    SetCompression(SetCompressionPacket),
    Disconnect(DisconnectPacket),
    KeepAlive(KeepAlivePacket),
    ChatMessage(ChatMessagePacket),
    ChatBroadcast(ChatBroadcastPacket),
    ClientSettings(ClientSettingsPacket),
    PluginMessage(PluginMessagePacket),
    RegisterChannel(RegisterChannelPacket),
    UnregisterChannel(UnregisterChannelPacket),
    PlayerPosition(PlayerPositionPacket),
    PlayerPositionAndLook(PlayerPositionAndLookPacket),
    ChunkData(ChunkDataPacket),
    JoinGame(JoinGamePacket),
}

/// An ordered group of packets that reaches the wire as one contiguous write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkPacket {
    pub packets: Vec<Packet>,
}

impl BulkPacket {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self { packets }
    }

    pub fn push(&mut self, packet: impl Into<Packet>) {
        self.packets.push(packet.into());
    }

    /// Flattens nested bulks into the order they are written.
    pub fn flatten(self) -> Vec<Packet> {
        let mut out = Vec::with_capacity(self.packets.len());
        for packet in self.packets {
            match packet {
                Packet::Bulk(inner) => out.extend(inner.flatten()),
                other => out.push(other),
            }
        }
        out
    }
}

impl From<BulkPacket> for Packet {
    fn from(bulk: BulkPacket) -> Self {
        Packet::Bulk(bulk)
    }
}
