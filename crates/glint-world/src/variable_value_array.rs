use crate::PaletteError;

/// A fixed-length array of unsigned integers that all share one bit width,
/// packed back to back into 64-bit words. An entry may straddle two words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableValueArray {
    bits: u8,
    len: usize,
    mask: u64,
    backing: Vec<u64>,
}

/// Number of bits needed to index a palette of `size` entries: `ceil(log2(max(2, size)))`.
pub fn calculate_needed_bits(size: usize) -> u8 {
    let size = size.max(2) as u64;
    (64 - (size - 1).leading_zeros()) as u8
}

fn words_for(bits: u8, len: usize) -> usize {
    (len * bits as usize + 63) / 64
}

impl VariableValueArray {
    /// Creates a zeroed array. `bits` must be between 1 and 32.
    pub fn new(bits: u8, len: usize) -> Result<Self, PaletteError> {
        Self::from_backing(bits, len, vec![0; words_for(bits, len)])
    }

    /// Wraps an existing packed long array, e.g. one read from the wire.
    pub fn from_backing(bits: u8, len: usize, backing: Vec<u64>) -> Result<Self, PaletteError> {
        if !(1..=32).contains(&bits) {
            return Err(PaletteError::InvalidBitWidth(bits));
        }
        let expected = words_for(bits, len);
        if backing.len() != expected {
            return Err(PaletteError::BackingLength {
                expected,
                actual: backing.len(),
            });
        }
        Ok(Self {
            bits,
            len,
            mask: (1u64 << bits) - 1,
            backing,
        })
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn backing(&self) -> &[u64] {
        &self.backing
    }

    pub fn into_backing(self) -> Vec<u64> {
        self.backing
    }

    pub fn get(&self, index: usize) -> Result<u32, PaletteError> {
        self.check_index(index)?;
        let bit_index = index * self.bits as usize;
        let word = bit_index / 64;
        let offset = bit_index % 64;

        let mut value = self.backing[word] >> offset;
        if offset + self.bits as usize > 64 {
            value |= self.backing[word + 1] << (64 - offset);
        }
        Ok((value & self.mask) as u32)
    }

    pub fn set(&mut self, index: usize, value: u32) -> Result<(), PaletteError> {
        self.check_index(index)?;
        let value = value as u64;
        if value > self.mask {
            return Err(PaletteError::ValueTooWide {
                value: value as u32,
                bits: self.bits,
            });
        }
        let bit_index = index * self.bits as usize;
        let word = bit_index / 64;
        let offset = bit_index % 64;

        self.backing[word] = (self.backing[word] & !(self.mask << offset)) | (value << offset);
        if offset + self.bits as usize > 64 {
            let spill = 64 - offset;
            self.backing[word + 1] =
                (self.backing[word + 1] & !(self.mask >> spill)) | (value >> spill);
        }
        Ok(())
    }

    /// Copies every value into a new array with a different bit width.
    pub fn resize(&self, bits: u8) -> Result<Self, PaletteError> {
        let mut resized = Self::new(bits, self.len)?;
        for index in 0..self.len {
            resized.set(index, self.get(index)?)?;
        }
        Ok(resized)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len).filter_map(move |index| self.get(index).ok())
    }

    fn check_index(&self, index: usize) -> Result<(), PaletteError> {
        if index >= self.len {
            return Err(PaletteError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(())
    }
}
