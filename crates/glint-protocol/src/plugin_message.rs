use crate::buffer::PacketBuffer;
use crate::packet::{Packet, PacketBody};
use crate::registry::CodecContext;
use glint_common::Result;

pub const REGISTER_CHANNEL: &str = "minecraft:register";
pub const UNREGISTER_CHANNEL: &str = "minecraft:unregister";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMessagePacket {
    pub channel: String,
    pub data: Vec<u8>,
}

impl PluginMessagePacket {
    pub fn new(channel: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            channel: channel.into(),
            data,
        }
    }
}

impl PacketBody for PluginMessagePacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            channel: buffer.read_string()?,
            data: buffer.read_remaining(),
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.channel);
        buffer.write_bytes(&self.data);
        Ok(())
    }
}

/// A client announced it listens on `channel`. Produced by the decode pipeline only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterChannelPacket {
    pub channel: String,
}

impl RegisterChannelPacket {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

impl PacketBody for RegisterChannelPacket {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisterChannelPacket {
    pub channel: String,
}

impl UnregisterChannelPacket {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

impl PacketBody for UnregisterChannelPacket {}

/// Splits `minecraft:register` / `minecraft:unregister` payloads into one event per
/// NUL separated channel. Other plugin messages pass through untouched.
pub fn split_channel_registrations(
    _context: &CodecContext,
    packet: Packet,
    output: &mut Vec<Packet>,
) -> Result<()> {
    let message = match packet {
        Packet::PluginMessage(message) => message,
        other => {
            output.push(other);
            return Ok(());
        }
    };

    let register = match message.channel.as_str() {
        REGISTER_CHANNEL => true,
        UNREGISTER_CHANNEL => false,
        _ => {
            output.push(Packet::PluginMessage(message));
            return Ok(());
        }
    };

    let channels = message
        .data
        .split(|byte| *byte == 0)
        .filter(|name| !name.is_empty())
        .map(|name| String::from_utf8_lossy(name).into_owned());
    for channel in channels {
        output.push(if register {
            RegisterChannelPacket::new(channel).into()
        } else {
            UnregisterChannelPacket::new(channel).into()
        });
    }
    Ok(())
}
