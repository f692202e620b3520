use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::{GlintError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRequestPacket;

impl PacketBody for StatusRequestPacket {
    fn read_body(_buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self)
    }

    fn write_body(&self, _buffer: &mut PacketBuffer) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPlayers {
    pub max: u32,
    pub online: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDescription {
    pub text: String,
}

/// Server list ping document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    pub description: StatusDescription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponsePacket {
    pub json: String,
}

impl StatusResponsePacket {
    pub fn new(status: &ServerStatus) -> Result<Self> {
        let json = serde_json::to_string(status)
            .map_err(|e| GlintError::encode(format!("status document: {}", e)))?;
        Ok(Self { json })
    }

    pub fn status(&self) -> Result<ServerStatus> {
        Ok(serde_json::from_str(&self.json)?)
    }
}

impl PacketBody for StatusResponsePacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            json: buffer.read_string()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.json);
        Ok(())
    }
}

/// Status ping. The server answers with the same payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingPacket {
    pub payload: i64,
}

impl PingPacket {
    pub fn new(payload: i64) -> Self {
        Self { payload }
    }
}

impl PacketBody for PingPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            payload: buffer.read_i64()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_i64(self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_document_shape() {
        let status = ServerStatus {
            version: StatusVersion {
                name: "1.16.5".to_owned(),
                protocol: 754,
            },
            players: StatusPlayers { max: 20, online: 3 },
            description: StatusDescription {
                text: "A Glint server".to_owned(),
            },
        };
        let packet = StatusResponsePacket::new(&status).unwrap();
        let value: serde_json::Value = serde_json::from_str(&packet.json).unwrap();
        assert_eq!(value["version"]["protocol"], 754);
        assert_eq!(value["players"]["online"], 3);
        assert_eq!(value["description"]["text"], "A Glint server");
        assert_eq!(packet.status().unwrap(), status);
    }
}
