use crate::buffer::PacketBuffer;
use crate::chat::ChatMessagePacket;
use crate::client_settings::ClientSettingsPacket;
use crate::handshake::HandshakePacket;
use crate::keep_alive::KeepAlivePacket;
use crate::login::{EncryptionResponsePacket, LoginStartPacket};
use crate::packet::{Packet, PacketBody, PacketKind};
use crate::player_position::PlayerPositionPacket;
use crate::plugin_message::{split_channel_registrations, PluginMessagePacket};
use crate::state::ProtocolState;
use crate::status::{PingPacket, StatusRequestPacket};
use bytes::Bytes;
use glint_common::{GlintError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// What a decoder or processor knows about the connection it works for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecContext {
    pub state: ProtocolState,
    pub protocol_version: i32,
}

impl CodecContext {
    pub fn new(state: ProtocolState, protocol_version: i32) -> Self {
        Self {
            state,
            protocol_version,
        }
    }
}

/// Decodes a packet body. Must not have side effects.
pub type DecodeFn = fn(&CodecContext, &mut PacketBuffer) -> Result<Packet>;

/// Turns one decoded packet into zero or more packets before any handler sees them.
pub type ProcessFn = fn(&CodecContext, Packet, &mut Vec<Packet>) -> Result<()>;

#[derive(Clone, Copy)]
pub struct InboundCodec {
    pub kind: PacketKind,
    pub decode: DecodeFn,
    pub processor: Option<ProcessFn>,
}

impl std::fmt::Debug for InboundCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundCodec")
            .field("kind", &self.kind)
            .field("processed", &self.processor.is_some())
            .finish()
    }
}

fn decode_body<P: PacketBody + Into<Packet>>(
    _context: &CodecContext,
    buffer: &mut PacketBuffer,
) -> Result<Packet> {
    Ok(P::read_body(buffer)?.into())
}

/// Opcode tables for one protocol state.
#[derive(Debug, Default)]
pub struct StateTable {
    inbound: HashMap<i32, InboundCodec>,
    outbound: HashMap<PacketKind, i32>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inbound<P: PacketBody + Into<Packet>>(self, opcode: i32, kind: PacketKind) -> Self {
        self.inbound_codec(opcode, kind, decode_body::<P>, None)
    }

    pub fn inbound_codec(
        mut self,
        opcode: i32,
        kind: PacketKind,
        decode: DecodeFn,
        processor: Option<ProcessFn>,
    ) -> Self {
        self.inbound.insert(
            opcode,
            InboundCodec {
                kind,
                decode,
                processor,
            },
        );
        self
    }

    pub fn outbound(mut self, kind: PacketKind, opcode: i32) -> Self {
        self.outbound.insert(kind, opcode);
        self
    }

    pub fn inbound_codec_for(&self, opcode: i32) -> Option<&InboundCodec> {
        self.inbound.get(&opcode)
    }

    pub fn outbound_opcode(&self, kind: PacketKind) -> Option<i32> {
        self.outbound.get(&kind).copied()
    }
}

/// Per-state inbound and outbound tables. Built once and never mutated.
#[derive(Debug)]
pub struct ProtocolRegistry {
    tables: HashMap<ProtocolState, StateTable>,
}

impl ProtocolRegistry {
    pub fn new(tables: HashMap<ProtocolState, StateTable>) -> Self {
        Self { tables }
    }

    /// The protocol 754 tables.
    pub fn v754() -> Self {
        let mut tables = HashMap::new();

        tables.insert(
            ProtocolState::Handshake,
            StateTable::new().inbound::<HandshakePacket>(0x00, PacketKind::Handshake),
        );

        tables.insert(
            ProtocolState::Status,
            StateTable::new()
                .inbound::<StatusRequestPacket>(0x00, PacketKind::StatusRequest)
                .inbound::<PingPacket>(0x01, PacketKind::Ping)
                .outbound(PacketKind::StatusResponse, 0x00)
                .outbound(PacketKind::Ping, 0x01),
        );

        tables.insert(
            ProtocolState::Login,
            StateTable::new()
                .inbound::<LoginStartPacket>(0x00, PacketKind::LoginStart)
                .inbound::<EncryptionResponsePacket>(0x01, PacketKind::EncryptionResponse)
                .outbound(PacketKind::Disconnect, 0x00)
                .outbound(PacketKind::EncryptionRequest, 0x01)
                .outbound(PacketKind::LoginSuccess, 0x02)
                .outbound(PacketKind::SetCompression, 0x03),
        );

        tables.insert(
            ProtocolState::Play,
            StateTable::new()
                .inbound::<ChatMessagePacket>(0x03, PacketKind::ChatMessage)
                .inbound::<ClientSettingsPacket>(0x05, PacketKind::ClientSettings)
                .inbound_codec(
                    0x0B,
                    PacketKind::PluginMessage,
                    decode_body::<PluginMessagePacket>,
                    Some(split_channel_registrations),
                )
                .inbound::<KeepAlivePacket>(0x10, PacketKind::KeepAlive)
                .inbound::<PlayerPositionPacket>(0x12, PacketKind::PlayerPosition)
                .outbound(PacketKind::ChatBroadcast, 0x0E)
                .outbound(PacketKind::PluginMessage, 0x17)
                .outbound(PacketKind::Disconnect, 0x19)
                .outbound(PacketKind::KeepAlive, 0x1F)
                .outbound(PacketKind::ChunkData, 0x20)
                .outbound(PacketKind::JoinGame, 0x24)
                .outbound(PacketKind::PlayerPositionAndLook, 0x34),
        );

        Self::new(tables)
    }

    pub fn table(&self, state: ProtocolState) -> Option<&StateTable> {
        self.tables.get(&state)
    }

    /// Decodes one frame (`[VarInt id][body]`) and runs its processor.
    /// Unknown ids and unread trailing bytes are decode errors.
    pub fn decode_frame(&self, context: &CodecContext, frame: Vec<u8>) -> Result<Vec<Packet>> {
        let mut buffer = PacketBuffer::from_bytes(frame);
        let opcode = buffer.read_varint()?;
        let codec = self
            .table(context.state)
            .and_then(|table| table.inbound_codec_for(opcode))
            .ok_or_else(|| {
                GlintError::decode(format!(
                    "unknown packet 0x{:02X} in state {}",
                    opcode, context.state
                ))
            })?;

        let packet = (codec.decode)(context, &mut buffer)?;
        if buffer.remaining() > 0 {
            return Err(GlintError::decode(format!(
                "{} trailing bytes after {:?}",
                buffer.remaining(),
                codec.kind
            )));
        }

        let mut output = Vec::new();
        match codec.processor {
            Some(process) => process(context, packet, &mut output)?,
            None => output.push(packet),
        }
        Ok(output)
    }

    /// Encodes a packet into frames for `state`. A bulk packet yields one frame per
    /// sub-packet; if any sub-packet fails nothing is returned.
    pub fn encode(&self, state: ProtocolState, packet: Packet) -> Result<Vec<Bytes>> {
        let packets = match packet {
            Packet::Bulk(bulk) => bulk.flatten(),
            single => vec![single],
        };
        packets
            .iter()
            .map(|packet| self.encode_single(state, packet))
            .collect()
    }

    fn encode_single(&self, state: ProtocolState, packet: &Packet) -> Result<Bytes> {
        let opcode = self
            .table(state)
            .and_then(|table| table.outbound_opcode(packet.kind()))
            .ok_or_else(|| {
                GlintError::encode(format!(
                    "{:?} has no outbound id in state {}",
                    packet.kind(),
                    state
                ))
            })?;
        let mut buffer = PacketBuffer::new();
        buffer.write_varint(opcode);
        packet.write_body(&mut buffer)?;
        Ok(Bytes::from(buffer.into_inner()))
    }
}

pub static PROTOCOL: Lazy<ProtocolRegistry> = Lazy::new(ProtocolRegistry::v754);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::BulkPacket;
    use crate::plugin_message::RegisterChannelPacket;
    use crate::status::PingPacket;
    use assert_matches::assert_matches;

    fn play() -> CodecContext {
        CodecContext::new(ProtocolState::Play, 754)
    }

    fn frame(opcode: i32, body: impl FnOnce(&mut PacketBuffer)) -> Vec<u8> {
        let mut buffer = PacketBuffer::new();
        buffer.write_varint(opcode);
        body(&mut buffer);
        buffer.into_inner()
    }

    #[test]
    fn test_keep_alive_ids_differ_by_direction() {
        let bytes = PROTOCOL
            .encode(ProtocolState::Play, KeepAlivePacket::new(9).into())
            .unwrap();
        assert_eq!(bytes[0][0], 0x1F);

        let inbound = frame(0x10, |buffer| buffer.write_i64(9).unwrap());
        let packets = PROTOCOL.decode_frame(&play(), inbound).unwrap();
        assert_eq!(packets, vec![Packet::KeepAlive(KeepAlivePacket::new(9))]);

        let wrong_direction = frame(0x1F, |buffer| buffer.write_i64(9).unwrap());
        assert_matches!(
            PROTOCOL.decode_frame(&play(), wrong_direction),
            Err(GlintError::Decode(_))
        );
    }

    #[test]
    fn test_ids_are_scoped_by_state() {
        let ping = frame(0x01, |buffer| buffer.write_i64(77).unwrap());
        let status = CodecContext::new(ProtocolState::Status, 754);
        assert_eq!(
            PROTOCOL.decode_frame(&status, ping.clone()).unwrap(),
            vec![Packet::Ping(PingPacket::new(77))]
        );
        // 0x01 in LOGIN is the encryption response, which this body does not fit
        let login = CodecContext::new(ProtocolState::Login, 754);
        assert!(PROTOCOL.decode_frame(&login, ping).is_err());
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut inbound = frame(0x10, |buffer| buffer.write_i64(1).unwrap());
        inbound.push(0);
        assert_matches!(
            PROTOCOL.decode_frame(&play(), inbound),
            Err(GlintError::Decode(_))
        );
    }

    #[test]
    fn test_processor_runs_on_decode() {
        let inbound = frame(0x0B, |buffer| {
            buffer.write_string("minecraft:register");
            buffer.write_bytes(b"a:b\0c:d");
        });
        let packets = PROTOCOL.decode_frame(&play(), inbound).unwrap();
        assert_eq!(
            packets,
            vec![
                RegisterChannelPacket::new("a:b").into(),
                RegisterChannelPacket::new("c:d").into(),
            ]
        );
    }

    #[test]
    fn test_missing_outbound_id_is_encode_error() {
        assert_matches!(
            PROTOCOL.encode(ProtocolState::Status, KeepAlivePacket::new(1).into()),
            Err(GlintError::Encode(_))
        );
    }

    #[test]
    fn test_bulk_encodes_frame_per_packet() {
        let mut bulk = BulkPacket::default();
        bulk.push(KeepAlivePacket::new(1));
        bulk.push(KeepAlivePacket::new(2));
        let frames = PROTOCOL.encode(ProtocolState::Play, bulk.into()).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1][8], 2);

        let mut bad = BulkPacket::default();
        bad.push(KeepAlivePacket::new(1));
        bad.push(RegisterChannelPacket::new("x:y"));
        assert!(PROTOCOL.encode(ProtocolState::Play, bad.into()).is_err());
    }
}
