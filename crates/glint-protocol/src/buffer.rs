use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use glint_common::{GlintError, Result};
use uuid::Uuid;

/// Default maximum string length in characters.
pub const MAX_STRING_LENGTH: usize = 32767;

/// Packet buffer. Contains the buffer and the cursor.
/// The cursor is used to keep track of the current read position in the buffer.
#[derive(Debug, Default, Clone)]
pub struct PacketBuffer {
    pub buffer: Vec<u8>,
    cursor: usize,
}

fn eof(what: &str) -> GlintError {
    GlintError::decode(format!("unexpected end of packet while reading {}", what))
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    /// Creates a buffer positioned at the start of `bytes`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buffer: bytes,
            cursor: 0,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    /// Returns the byte under the cursor without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    /// Writes a VarInt: 7 bits per byte, least significant group first, with the
    /// high bit set on every byte except the last. Negative values take five bytes.
    pub fn write_varint(&mut self, value: i32) {
        let mut value = value as u32;
        while (value & !0x7F) != 0 {
            self.buffer.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        self.buffer.push(value as u8);
    }

    /// Reads a VarInt (see [`PacketBuffer::write_varint`]). More than five bytes is an error.
    pub fn read_varint(&mut self) -> Result<i32> {
        let mut result: u32 = 0;
        let mut shift = 0;

        loop {
            let byte = self.read_u8().map_err(|_| eof("VarInt"))?;
            result |= ((byte & 0x7F) as u32) << shift;

            if (byte & 0x80) == 0 {
                break;
            }

            shift += 7;
            if shift >= 35 {
                return Err(GlintError::decode("VarInt too big"));
            }
        }

        Ok(result as i32)
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_varint(value.len() as i32);
        self.buffer.extend_from_slice(value.as_bytes());
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.read_string_max(MAX_STRING_LENGTH)
    }

    /// Reads a UTF-8 string of at most `max_chars` characters.
    pub fn read_string_max(&mut self, max_chars: usize) -> Result<String> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(GlintError::decode(format!("negative string length {}", length)));
        }
        let length = length as usize;
        if length > max_chars * 4 {
            return Err(GlintError::decode(format!(
                "string of {} bytes exceeds limit of {} characters",
                length, max_chars
            )));
        }
        let bytes = self.read_bytes(length)?;
        let string = String::from_utf8(bytes)
            .map_err(|_| GlintError::decode("Failed to convert bytes to UTF-8 string"))?;
        if string.chars().count() > max_chars {
            return Err(GlintError::decode(format!(
                "string exceeds limit of {} characters",
                max_chars
            )));
        }
        Ok(string)
    }

    /// Writes a UUID as two big-endian longs.
    pub fn write_uuid(&mut self, value: Uuid) {
        self.buffer.extend_from_slice(value.as_bytes());
    }

    pub fn read_uuid(&mut self) -> Result<Uuid> {
        let bytes = self.read_bytes(16)?;
        Uuid::from_slice(&bytes).map_err(|_| eof("UUID"))
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = self.peek_byte().ok_or_else(|| eof("u8"))?;
        self.cursor += 1;
        Ok(byte)
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(value as u8);
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(GlintError::decode(format!("invalid boolean byte {}", other))),
        }
    }

    // Write an u16 in network (big-endian) order.
    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    // Read an u16 in network (big-endian) order.
    pub fn read_u16(&mut self) -> Result<u16> {
        let value = self.remaining_slice().read_u16::<BigEndian>().map_err(|_| eof("u16"))?;
        self.cursor += 2;
        Ok(value)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.buffer.write_i16::<BigEndian>(value)?;
        Ok(())
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let value = self.remaining_slice().read_i16::<BigEndian>().map_err(|_| eof("i16"))?;
        self.cursor += 2;
        Ok(value)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.buffer.write_i32::<BigEndian>(value)?;
        Ok(())
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self.remaining_slice().read_i32::<BigEndian>().map_err(|_| eof("i32"))?;
        self.cursor += 4;
        Ok(value)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.buffer.write_i64::<BigEndian>(value)?;
        Ok(())
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let value = self.remaining_slice().read_i64::<BigEndian>().map_err(|_| eof("i64"))?;
        self.cursor += 8;
        Ok(value)
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.buffer.write_u64::<BigEndian>(value)?;
        Ok(())
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.remaining_slice().read_u64::<BigEndian>().map_err(|_| eof("u64"))?;
        self.cursor += 8;
        Ok(value)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.buffer.write_f32::<BigEndian>(value)?;
        Ok(())
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let value = self.remaining_slice().read_f32::<BigEndian>().map_err(|_| eof("f32"))?;
        self.cursor += 4;
        Ok(value)
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.buffer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let value = self.remaining_slice().read_f64::<BigEndian>().map_err(|_| eof("f64"))?;
        self.cursor += 8;
        Ok(value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        if length > self.remaining() {
            return Err(eof(&format!("{} bytes", length)));
        }
        let bytes = self.buffer[self.cursor..self.cursor + length].to_vec();
        self.cursor += length;
        Ok(bytes)
    }

    /// Writes a VarInt length followed by the bytes.
    pub fn write_byte_array(&mut self, bytes: &[u8]) {
        self.write_varint(bytes.len() as i32);
        self.write_bytes(bytes);
    }

    pub fn read_byte_array(&mut self) -> Result<Vec<u8>> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(GlintError::decode(format!("negative array length {}", length)));
        }
        self.read_bytes(length as usize)
    }

    /// Consumes everything that is left, e.g. a plugin message payload.
    pub fn read_remaining(&mut self) -> Vec<u8> {
        let bytes = self.buffer[self.cursor..].to_vec();
        self.cursor = self.buffer.len();
        bytes
    }

    fn remaining_slice(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }
}
