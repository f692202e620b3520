use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::Result;

/// The first packet of every connection.
///
/// `hostname` is read with the general string limit because proxies pack their
/// forwarding data into it; plain clients are held to 255 characters later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakePacket {
    pub protocol_version: i32,
    pub hostname: String,
    pub port: u16,
    pub next_state: i32,
}

impl HandshakePacket {
    pub const MAX_HOSTNAME_LENGTH: usize = 255;

    pub fn new(protocol_version: i32, hostname: impl Into<String>, port: u16, next_state: i32) -> Self {
        Self {
            protocol_version,
            hostname: hostname.into(),
            port,
            next_state,
        }
    }
}

impl PacketBody for HandshakePacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            protocol_version: buffer.read_varint()?,
            hostname: buffer.read_string()?,
            port: buffer.read_u16()?,
            next_state: buffer.read_varint()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_varint(self.protocol_version);
        buffer.write_string(&self.hostname);
        buffer.write_u16(self.port);
        buffer.write_varint(self.next_state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_client_handshake() {
        // 754, "localhost", 25565, login
        let mut bytes = vec![0xF2, 0x05, 9];
        bytes.extend_from_slice(b"localhost");
        bytes.extend_from_slice(&[0x63, 0xDD, 0x02]);

        let packet = HandshakePacket::read_body(&mut PacketBuffer::from_bytes(bytes)).unwrap();
        assert_eq!(packet, HandshakePacket::new(754, "localhost", 25565, 2));
    }
}
