use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::{GameProfile, Result};
use uuid::Uuid;

pub const MAX_USERNAME_LENGTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStartPacket {
    pub username: String,
}

impl LoginStartPacket {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl PacketBody for LoginStartPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            username: buffer.read_string_max(MAX_USERNAME_LENGTH)?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.username);
        Ok(())
    }
}

/// Starts online-mode authentication. `public_key` is the DER encoded RSA key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionRequestPacket {
    pub server_id: String,
    pub public_key: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl PacketBody for EncryptionRequestPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            server_id: buffer.read_string_max(20)?,
            public_key: buffer.read_byte_array()?,
            verify_token: buffer.read_byte_array()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.server_id);
        buffer.write_byte_array(&self.public_key);
        buffer.write_byte_array(&self.verify_token);
        Ok(())
    }
}

/// Both fields are encrypted with the server's public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionResponsePacket {
    pub shared_secret: Vec<u8>,
    pub verify_token: Vec<u8>,
}

impl PacketBody for EncryptionResponsePacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            shared_secret: buffer.read_byte_array()?,
            verify_token: buffer.read_byte_array()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_byte_array(&self.shared_secret);
        buffer.write_byte_array(&self.verify_token);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccessPacket {
    pub uuid: Uuid,
    pub username: String,
}

impl LoginSuccessPacket {
    pub fn new(uuid: Uuid, username: impl Into<String>) -> Self {
        Self {
            uuid,
            username: username.into(),
        }
    }
}

impl From<&GameProfile> for LoginSuccessPacket {
    fn from(profile: &GameProfile) -> Self {
        Self::new(profile.id, profile.name.clone())
    }
}

impl PacketBody for LoginSuccessPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            uuid: buffer.read_uuid()?,
            username: buffer.read_string_max(MAX_USERNAME_LENGTH)?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_uuid(self.uuid);
        buffer.write_string(&self.username);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCompressionPacket {
    pub threshold: i32,
}

impl PacketBody for SetCompressionPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            threshold: buffer.read_varint()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_varint(self.threshold);
        Ok(())
    }
}
