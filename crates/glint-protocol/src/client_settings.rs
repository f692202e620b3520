use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettingsPacket {
    pub locale: String,
    pub view_distance: u8,
    pub chat_mode: i32, // 0 = enabled, 1 = commands only, 2 = hidden
    pub chat_colors: bool,
    pub displayed_skin_parts: u8, // Bitmask for skin parts
    pub main_hand: i32,           // 0 = Left, 1 = Right
}

impl PacketBody for ClientSettingsPacket {
    fn read_body(buffer: &mut PacketBuffer) -> Result<Self> {
        Ok(Self {
            locale: buffer.read_string_max(16)?,
            view_distance: buffer.read_u8()?,
            chat_mode: buffer.read_varint()?,
            chat_colors: buffer.read_bool()?,
            displayed_skin_parts: buffer.read_u8()?,
            main_hand: buffer.read_varint()?,
        })
    }

    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_string(&self.locale);
        buffer.write_u8(self.view_distance);
        buffer.write_varint(self.chat_mode);
        buffer.write_bool(self.chat_colors);
        buffer.write_u8(self.displayed_skin_parts);
        buffer.write_varint(self.main_hand);
        Ok(())
    }
}
