use crate::buffer::PacketBuffer;
use crate::packet::PacketBody;
use glint_common::{GlintError, Result};
use glint_world::palette_array::DEFAULT_MAX_LOCAL_BITS;
use glint_world::variable_value_array::calculate_needed_bits;
use glint_world::{
    GlobalPalette, Palette, PaletteBasedArray, PaletteError, SerializedPaletteArray,
    VariableValueArray, AIR,
};
use std::sync::Arc;

/// Blocks in a 16x16x16 section.
pub const SECTION_VOLUME: usize = 4096;
pub const SECTIONS_PER_CHUNK: usize = 16;
pub const BIOMES_PER_CHUNK: usize = 1024;
/// Smallest width a client accepts for an indirect palette.
pub const MIN_WIRE_BITS: u8 = 4;

/// An unnamed empty NBT compound.
pub const EMPTY_NBT_COMPOUND: [u8; 3] = [0x0A, 0x00, 0x00];

fn palette_error(e: PaletteError) -> GlintError {
    GlintError::decode(format!("block states: {}", e))
}

/// One 16x16x16 block section, indexed `(y * 16 + z) * 16 + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSection {
    /// Number of non-air blocks in the section
    block_count: i16,
    states: PaletteBasedArray<u32>,
}

impl ChunkSection {
    /// An all-air section.
    pub fn new(global: Arc<GlobalPalette<u32>>) -> Result<Self> {
        let states = PaletteBasedArray::new(
            SECTION_VOLUME,
            &AIR,
            global,
            DEFAULT_MAX_LOCAL_BITS,
        )
        .map_err(palette_error)?;
        Ok(Self {
            block_count: 0,
            states,
        })
    }

    pub fn block_count(&self) -> i16 {
        self.block_count
    }

    pub fn states(&self) -> &PaletteBasedArray<u32> {
        &self.states
    }

    pub fn get_block_state(&self, x: usize, y: usize, z: usize) -> Result<u32> {
        self.states
            .get(Self::index(x, y, z))
            .copied()
            .map_err(palette_error)
    }

    pub fn set_block_state(&mut self, x: usize, y: usize, z: usize, state: u32) -> Result<()> {
        let index = Self::index(x, y, z);
        let previous = *self.states.get(index).map_err(palette_error)?;
        self.states.set(index, &state).map_err(palette_error)?;
        match (previous == AIR, state == AIR) {
            (true, false) => self.block_count += 1,
            (false, true) => self.block_count -= 1,
            _ => {}
        }
        Ok(())
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        ((y & 15) * 16 + (z & 15)) * 16 + (x & 15)
    }

    /// Writes the section in the 1.16 wire layout: indirect palettes use at least
    /// [`MIN_WIRE_BITS`] bits, and entries never span two longs.
    pub fn write(&self, buffer: &mut PacketBuffer) -> Result<()> {
        let serialized = self.states.serialize();
        let storage_bits = self.states.bits();
        let wire_bits = if serialized.palette.is_empty() {
            storage_bits
        } else {
            storage_bits.max(MIN_WIRE_BITS)
        };
        let ids = VariableValueArray::from_backing(storage_bits, SECTION_VOLUME, serialized.data)
            .map_err(palette_error)?;

        buffer.write_i16(self.block_count)?;
        buffer.write_u8(wire_bits);
        if !serialized.palette.is_empty() {
            buffer.write_varint(serialized.palette.len() as i32);
            for entry in &serialized.palette {
                buffer.write_varint(*entry as i32);
            }
        }
        let longs = pack_padded(ids.iter(), wire_bits);
        buffer.write_varint(longs.len() as i32);
        for long in &longs {
            buffer.write_u64(*long)?;
        }
        Ok(())
    }

    /// Reads a section written by [`ChunkSection::write`]. Widths above the local
    /// palette limit carry no palette and hold global ids.
    pub fn read(buffer: &mut PacketBuffer, global: Arc<GlobalPalette<u32>>) -> Result<Self> {
        let block_count = buffer.read_i16()?;
        let wire_bits = buffer.read_u8()?;

        let mut palette = Vec::new();
        let storage_bits = if wire_bits <= DEFAULT_MAX_LOCAL_BITS {
            let length = buffer.read_varint()?;
            if length <= 0 {
                return Err(GlintError::decode(format!("invalid palette length {}", length)));
            }
            for _ in 0..length {
                palette.push(buffer.read_varint()? as u32);
            }
            let needed = calculate_needed_bits(palette.len());
            if wire_bits != needed.max(MIN_WIRE_BITS) {
                return Err(GlintError::decode(format!(
                    "section declares {} bits but its palette needs {}",
                    wire_bits,
                    needed.max(MIN_WIRE_BITS)
                )));
            }
            needed
        } else {
            let needed = calculate_needed_bits(global.size());
            if wire_bits != needed {
                return Err(GlintError::decode(format!(
                    "direct section declares {} bits, global ids need {}",
                    wire_bits, needed
                )));
            }
            needed
        };

        let longs = buffer.read_varint()?;
        if longs < 0 || longs as usize != padded_len(wire_bits) {
            return Err(GlintError::decode(format!(
                "section has {} longs, expected {}",
                longs,
                padded_len(wire_bits)
            )));
        }
        let mut packed = Vec::with_capacity(longs as usize);
        for _ in 0..longs {
            packed.push(buffer.read_u64()?);
        }

        let mut ids = VariableValueArray::new(storage_bits, SECTION_VOLUME).map_err(palette_error)?;
        for (index, id) in unpack_padded(&packed, wire_bits).enumerate() {
            ids.set(index, id).map_err(palette_error)?;
        }

        let states = PaletteBasedArray::deserialize(
            SerializedPaletteArray {
                palette,
                data: ids.into_backing(),
            },
            SECTION_VOLUME,
            global,
            DEFAULT_MAX_LOCAL_BITS,
        )
        .map_err(palette_error)?;
        Ok(Self {
            block_count,
            states,
        })
    }
}

fn entries_per_long(bits: u8) -> usize {
    64 / bits as usize
}

/// Longs needed for a section at `bits` per entry in the padded layout.
pub fn padded_len(bits: u8) -> usize {
    let per_long = entries_per_long(bits);
    (SECTION_VOLUME + per_long - 1) / per_long
}

fn pack_padded(ids: impl Iterator<Item = u32>, bits: u8) -> Vec<u64> {
    let per_long = entries_per_long(bits);
    let mut longs = vec![0u64; padded_len(bits)];
    for (index, id) in ids.enumerate() {
        let shift = (index % per_long) * bits as usize;
        longs[index / per_long] |= (id as u64) << shift;
    }
    longs
}

fn unpack_padded(longs: &[u64], bits: u8) -> impl Iterator<Item = u32> + '_ {
    let per_long = entries_per_long(bits);
    let mask = (1u64 << bits) - 1;
    (0..SECTION_VOLUME).map(move |index| {
        let shift = (index % per_long) * bits as usize;
        ((longs[index / per_long] >> shift) & mask) as u32
    })
}

/// Chunk Data (clientbound). Heightmaps and block entities are pre-encoded NBT.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDataPacket {
    pub chunk_x: i32,
    pub chunk_z: i32,
    pub full_chunk: bool,
    /// `sections[y]` is sent when present; the bit mask is derived from it.
    pub sections: Vec<Option<ChunkSection>>,
    pub heightmaps: Vec<u8>,
    /// Only written for full chunks
    pub biomes: Vec<i32>,
    pub block_entities: Vec<Vec<u8>>,
}

impl ChunkDataPacket {
    pub fn new(chunk_x: i32, chunk_z: i32) -> Self {
        Self {
            chunk_x,
            chunk_z,
            full_chunk: true,
            sections: vec![None; SECTIONS_PER_CHUNK],
            heightmaps: EMPTY_NBT_COMPOUND.to_vec(),
            biomes: vec![1; BIOMES_PER_CHUNK],
            block_entities: Vec::new(),
        }
    }

    pub fn primary_bit_mask(&self) -> i32 {
        self.sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.is_some())
            .fold(0, |mask, (y, _)| mask | (1 << y))
    }
}

impl PacketBody for ChunkDataPacket {
    fn write_body(&self, buffer: &mut PacketBuffer) -> Result<()> {
        buffer.write_i32(self.chunk_x)?;
        buffer.write_i32(self.chunk_z)?;
        buffer.write_bool(self.full_chunk);
        buffer.write_varint(self.primary_bit_mask());
        buffer.write_bytes(&self.heightmaps);

        if self.full_chunk {
            buffer.write_varint(self.biomes.len() as i32);
            for biome in &self.biomes {
                buffer.write_varint(*biome);
            }
        }

        let mut data = PacketBuffer::new();
        for section in self.sections.iter().flatten() {
            section.write(&mut data)?;
        }
        buffer.write_byte_array(&data.into_inner());

        buffer.write_varint(self.block_entities.len() as i32);
        for entity in &self.block_entities {
            buffer.write_bytes(entity);
        }
        Ok(())
    }
}
