use crate::buffer::PacketBuffer;
use crate::chat::text_component;
use crate::packet::PacketBody;
use glint_common::Result;

/// Disconnect with a chat component reason. Used in both login and play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectPacket {
    pub reason_json: String,
}

impl DisconnectPacket {
    pub fn new(reason: &str) -> Self {
        Self {
            reason_json: text_component(reason),
        }
    }
}

impl PacketBody for DisconnectPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            reason_json: buffer.read_string()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.reason_json);
        Ok(())
    }
}
