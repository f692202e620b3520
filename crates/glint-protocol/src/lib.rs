pub mod buffer;
pub mod chat;
pub mod chunk_data;
pub mod cipher;
pub mod client_settings;
pub mod disconnect;
pub mod frame;
pub mod handshake;
pub mod join_game;
pub mod keep_alive;
pub mod login;
pub mod nbt;
pub mod packet;
pub mod player_position;
pub mod plugin_message;
pub mod registry;
pub mod state;
pub mod status;

pub use buffer::PacketBuffer;
pub use frame::FrameCodec;
pub use packet::{BulkPacket, Packet, PacketBody, PacketKind};
pub use registry::{CodecContext, ProtocolRegistry, PROTOCOL};
pub use state::ProtocolState;

/// Protocol version spoken by this server (1.16.5).
pub const PROTOCOL_VERSION: i32 = 754;
