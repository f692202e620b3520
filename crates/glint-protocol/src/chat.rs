use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::Result;
use uuid::Uuid;

pub const MAX_CHAT_LENGTH: usize = 256;

/// Wraps plain text in a chat component.
pub fn text_component(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}

/// Chat typed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessagePacket {
    pub message: String,
}

impl ChatMessagePacket {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl PacketBody for ChatMessagePacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            message: buffer.read_string_max(MAX_CHAT_LENGTH)?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.message);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChatPosition {
    Chat = 0,
    System = 1,
    GameInfo = 2,
}

/// Chat sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatBroadcastPacket {
    pub json: String,
    pub position: ChatPosition,
    pub sender: Uuid,
}

impl ChatBroadcastPacket {
    pub fn chat(sender: Uuid, sender_name: &str, message: &str) -> Self {
        Self {
            json: text_component(&format!("<{}> {}", sender_name, message)),
            position: ChatPosition::Chat,
            sender,
        }
    }

    pub fn system(message: &str) -> Self {
        Self {
            json: text_component(message),
            position: ChatPosition::System,
            sender: Uuid::nil(),
        }
    }
}

impl PacketBody for ChatBroadcastPacket {
    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.json);
        buffer.write_u8(self.position as u8);
        buffer.write_uuid(self.sender);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_component_escapes() {
        assert_eq!(text_component("say \"hi\""), r#"{"text":"say \"hi\""}"#);
    }

    #[test]
    fn test_broadcast_layout() {
        let sender = Uuid::from_u128(7);
        let mut buffer = PacketBuffer::new();
        ChatBroadcastPacket::chat(sender, "Alex", "hello")
            .write_body(&mut buffer)
            .unwrap();

        let json = buffer.read_string().unwrap();
        assert_eq!(json, r#"{"text":"<Alex> hello"}"#);
        assert_eq!(buffer.read_u8().unwrap(), 0);
        assert_eq!(buffer.read_uuid().unwrap(), sender);
        assert_eq!(buffer.remaining(), 0);
    }
}
