use crate::buffer::PacketBuffer;
use glint_common::{GlintError, Result};

/// A write-only NBT value. Compound entries keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(Vec<(String, Tag)>),
}

impl Tag {
    pub fn type_id(&self) -> u8 {
        match self {
            Tag::Byte(_) => 1,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
        }
    }

    pub fn string(value: &str) -> Tag {
        Tag::String(value.to_string())
    }

    pub fn flag(value: bool) -> Tag {
        Tag::Byte(value as i8)
    }

    /// Writes the tag as a root value with an empty name.
    pub fn write_root(&self, buffer: &mut PacketBuffer) -> Result<()> {
        self.write_named(buffer, "")
    }

    fn write_named(&self, buffer: &mut PacketBuffer, name: &str) -> Result<()> {
        buffer.write_u8(self.type_id());
        write_nbt_string(buffer, name)?;
        self.write_payload(buffer)
    }

    fn write_payload(&self, buffer: &mut PacketBuffer) -> Result<()> {
        match self {
            Tag::Byte(v) => buffer.write_u8(*v as u8),
            Tag::Int(v) => buffer.write_i32(*v)?,
            Tag::Long(v) => buffer.write_i64(*v)?,
            Tag::Float(v) => buffer.write_f32(*v)?,
            Tag::Double(v) => buffer.write_f64(*v)?,
            Tag::String(v) => write_nbt_string(buffer, v)?,
            Tag::List(items) => {
                // Empty lists are typed TAG_End
                let element_type = items.first().map_or(0, Tag::type_id);
                if items.iter().any(|item| item.type_id() != element_type) {
                    return Err(GlintError::encode("NBT list elements differ in type"));
                }
                buffer.write_u8(element_type);
                buffer.write_i32(items.len() as i32)?;
                for item in items {
                    item.write_payload(buffer)?;
                }
            }
            Tag::Compound(entries) => {
                for (name, tag) in entries {
                    tag.write_named(buffer, name)?;
                }
                buffer.write_u8(0);
            }
        }
        Ok(())
    }
}

/// NBT strings carry a u16 byte length instead of a VarInt.
fn write_nbt_string(buffer: &mut PacketBuffer, value: &str) -> Result<()> {
    let length = u16::try_from(value.len())
        .map_err(|_| GlintError::encode("NBT string longer than 65535 bytes"))?;
    buffer.write_u16(length);
    buffer.write_bytes(value.as_bytes());
    Ok(())
}

/// Builds a compound from `(name, tag)` pairs.
#[macro_export]
macro_rules! compound {
    ($($name:expr => $tag:expr),* $(,)?) => {
        $crate::nbt::Tag::Compound(vec![$(($name.to_string(), $tag)),*])
    };
}
