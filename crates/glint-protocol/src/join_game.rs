use crate::buffer::PacketBuffer;
use crate::compound;
use crate::nbt::Tag;
use crate::packet::PacketBody;
use glint_common::Result;

pub const OVERWORLD: &str = "minecraft:overworld";

/// Join Game (clientbound). Carries the dimension and biome registries the
/// client needs before it accepts chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinGamePacket {
    pub entity_id: i32,
    pub is_hardcore: bool,
    pub gamemode: u8,
    /// -1 when there was none
    pub previous_gamemode: i8,
    pub world_names: Vec<String>,
    pub dimension_codec: Tag,
    pub dimension: Tag,
    pub world_name: String,
    pub hashed_seed: i64,
    /// Ignored by the client
    pub max_players: i32,
    pub view_distance: i32,
    pub reduced_debug_info: bool,
    pub enable_respawn_screen: bool,
    pub is_debug: bool,
    pub is_flat: bool,
}

impl JoinGamePacket {
    /// A creative-mode overworld join with one dimension type and one biome.
    pub fn overworld(entity_id: i32, max_players: i32, view_distance: i32) -> Self {
        Self {
            entity_id,
            is_hardcore: false,
            gamemode: 1,
            previous_gamemode: -1,
            world_names: vec![OVERWORLD.to_string()],
            dimension_codec: dimension_codec(),
            dimension: overworld_type(),
            world_name: OVERWORLD.to_string(),
            hashed_seed: 0,
            max_players,
            view_distance: view_distance.clamp(2, 32),
            reduced_debug_info: false,
            enable_respawn_screen: true,
            is_debug: false,
            is_flat: true,
        }
    }
}

impl PacketBody for JoinGamePacket {
    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_i32(self.entity_id)?;
        buffer.write_bool(self.is_hardcore);
        buffer.write_u8(self.gamemode);
        buffer.write_u8(self.previous_gamemode as u8);
        buffer.write_varint(self.world_names.len() as i32);
        for name in &self.world_names {
            buffer.write_string(name);
        }
        self.dimension_codec.write_root(buffer)?;
        self.dimension.write_root(buffer)?;
        buffer.write_string(&self.world_name);
        buffer.write_i64(self.hashed_seed)?;
        buffer.write_varint(self.max_players);
        buffer.write_varint(self.view_distance);
        buffer.write_bool(self.reduced_debug_info);
        buffer.write_bool(self.enable_respawn_screen);
        buffer.write_bool(self.is_debug);
        buffer.write_bool(self.is_flat);
        Ok(())
    }
}

fn overworld_type() -> Tag {
    compound! {
        "piglin_safe" => Tag::flag(false),
        "natural" => Tag::flag(true),
        "ambient_light" => Tag::Float(0.0),
        "infiniburn" => Tag::string("minecraft:infiniburn_overworld"),
        "respawn_anchor_works" => Tag::flag(false),
        "has_skylight" => Tag::flag(true),
        "bed_works" => Tag::flag(true),
        "effects" => Tag::string(OVERWORLD),
        "has_raids" => Tag::flag(true),
        "logical_height" => Tag::Int(256),
        "coordinate_scale" => Tag::Float(1.0),
        "ultrawarm" => Tag::flag(false),
        "has_ceiling" => Tag::flag(false),
    }
}

/// Plains, registered under id 1 to match the biome ids chunks are sent with.
fn plains() -> Tag {
    compound! {
        "precipitation" => Tag::string("rain"),
        "depth" => Tag::Float(0.125),
        "temperature" => Tag::Float(0.8),
        "scale" => Tag::Float(0.05),
        "downfall" => Tag::Float(0.4),
        "category" => Tag::string("plains"),
        "effects" => compound! {
            "sky_color" => Tag::Int(7_907_327),
            "water_fog_color" => Tag::Int(329_011),
            "fog_color" => Tag::Int(12_638_463),
            "water_color" => Tag::Int(4_159_204),
            "mood_sound" => compound! {
                "tick_delay" => Tag::Int(6000),
                "offset" => Tag::Double(2.0),
                "sound" => Tag::string("minecraft:ambient.cave"),
                "block_search_extent" => Tag::Int(8),
            },
        },
    }
}

fn registry(kind: &str, entries: Vec<(&str, i32, Tag)>) -> Tag {
    let value = entries
        .into_iter()
        .map(|(name, id, element)| {
            compound! {
                "name" => Tag::string(name),
                "id" => Tag::Int(id),
                "element" => element,
            }
        })
        .collect();
    compound! {
        "type" => Tag::string(kind),
        "value" => Tag::List(value),
    }
}

fn dimension_codec() -> Tag {
    compound! {
        "minecraft:dimension_type" => registry(
            "minecraft:dimension_type",
            vec![(OVERWORLD, 0, overworld_type())],
        ),
        "minecraft:worldgen/biome" => registry(
            "minecraft:worldgen/biome",
            vec![("minecraft:plains", 1, plains())],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let packet = JoinGamePacket::overworld(42, 20, 64);
        assert_eq!(packet.view_distance, 32);

        let mut buffer = PacketBuffer::new();
        packet.write_body(&mut buffer).unwrap();
        let mut read = PacketBuffer::from_bytes(buffer.into_inner());
        assert_eq!(read.read_i32().unwrap(), 42);
        assert!(!read.read_bool().unwrap());
        assert_eq!(read.read_u8().unwrap(), 1);
        assert_eq!(read.read_u8().unwrap(), 0xFF);
        assert_eq!(read.read_varint().unwrap(), 1);
        assert_eq!(read.read_string().unwrap(), OVERWORLD);
        // codec starts as an unnamed root compound
        assert_eq!(read.read_bytes(3).unwrap(), vec![0x0A, 0x00, 0x00]);
    }

    #[test]
    fn test_trailer_fields() {
        let mut buffer = PacketBuffer::new();
        JoinGamePacket::overworld(1, 20, 10)
            .write_body(&mut buffer)
            .unwrap();
        let bytes = buffer.into_inner();
        // world name, seed, max players, view distance, then four flags
        let tail = &bytes[bytes.len() - 4..];
        assert_eq!(tail, &[0, 1, 0, 1]);
        let name_at = bytes.len() - 4 - 1 - 1 - 8 - (OVERWORLD.len() + 1);
        let mut read = PacketBuffer::from_bytes(bytes[name_at..].to_vec());
        assert_eq!(read.read_string().unwrap(), OVERWORLD);
        assert_eq!(read.read_i64().unwrap(), 0);
        assert_eq!(read.read_varint().unwrap(), 20);
        assert_eq!(read.read_varint().unwrap(), 10);
    }

    #[test]
    fn test_codec_lists_plains_as_biome_one() {
        let codec = dimension_codec();
        let biomes = match &codec {
            Tag::Compound(entries) => &entries[1].1,
            other => panic!("unexpected {:?}", other),
        };
        let value = match biomes {
            Tag::Compound(entries) => &entries[1].1,
            other => panic!("unexpected {:?}", other),
        };
        match value {
            Tag::List(items) => match &items[0] {
                Tag::Compound(entry) => {
                    assert_eq!(entry[0].1, Tag::string("minecraft:plains"));
                    assert_eq!(entry[1].1, Tag::Int(1));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
