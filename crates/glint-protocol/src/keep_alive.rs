use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlivePacket {
    pub keep_alive_id: i64,
}

impl KeepAlivePacket {
    pub fn new(keep_alive_id: i64) -> Self {
        Self { keep_alive_id }
    }
}

impl PacketBody for KeepAlivePacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            keep_alive_id: buffer.read_i64()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_i64(self.keep_alive_id)
    }
}
