use crate::palette::{GlobalPalette, LocalPalette, Palette, INVALID_ID};
use crate::variable_value_array::{calculate_needed_bits, VariableValueArray};
use crate::PaletteError;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::Arc;

/// Local palettes above this many bits switch over to the global palette.
pub const DEFAULT_MAX_LOCAL_BITS: u8 = 8;

/// The palette currently backing a [`PaletteBasedArray`].
#[derive(Debug, Clone)]
pub enum SectionPalette<T: Eq + Hash> {
    /// Indirect palette with its own dense ids
    Local(LocalPalette<T>),
    /// Direct palette using global ids
    Global(Arc<GlobalPalette<T>>),
}

impl<T: Clone + Eq + Hash> SectionPalette<T> {
    pub fn size(&self) -> usize {
        match self {
            SectionPalette::Local(palette) => palette.size(),
            SectionPalette::Global(palette) => palette.size(),
        }
    }

    pub fn get(&self, id: i32) -> Option<&T> {
        match self {
            SectionPalette::Local(palette) => palette.get(id),
            SectionPalette::Global(palette) => palette.get(id),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, SectionPalette::Global(_))
    }
}

/// Wire and storage form: the ordered palette entries plus the raw packed longs.
/// An empty `palette` means the values are global ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPaletteArray<T> {
    pub palette: Vec<T>,
    pub data: Vec<u64>,
}

/// A fixed-length array of values stored as palette ids in a [`VariableValueArray`].
#[derive(Debug, Clone)]
pub struct PaletteBasedArray<T: Eq + Hash> {
    palette: SectionPalette<T>,
    global: Arc<GlobalPalette<T>>,
    max_local_bits: u8,
    data: VariableValueArray,
}

impl<T: Clone + Eq + Hash> PaletteBasedArray<T> {
    /// Creates an array of `len` entries all set to `initial`.
    pub fn new(
        len: usize,
        initial: &T,
        global: Arc<GlobalPalette<T>>,
        max_local_bits: u8,
    ) -> Result<Self, PaletteError> {
        let mut palette = LocalPalette::new();
        palette.get_id_or_assign(initial);
        Ok(Self {
            data: VariableValueArray::new(calculate_needed_bits(palette.size()), len)?,
            palette: SectionPalette::Local(palette),
            global,
            max_local_bits,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current bit width of the packed backing array.
    pub fn bits(&self) -> u8 {
        self.data.bits()
    }

    pub fn palette(&self) -> &SectionPalette<T> {
        &self.palette
    }

    pub fn backing(&self) -> &[u64] {
        self.data.backing()
    }

    pub fn get(&self, index: usize) -> Result<&T, PaletteError> {
        let id = self.data.get(index)? as i32;
        self.palette
            .get(id)
            .ok_or(PaletteError::CorruptId(id))
    }

    pub fn set(&mut self, index: usize, value: &T) -> Result<(), PaletteError> {
        if index >= self.len() {
            return Err(PaletteError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        let id = self.id_or_assign(value)?;
        self.data.set(index, id as u32)
    }

    /// Counts entries matching a predicate, e.g. non-air blocks in a section.
    pub fn count<F: Fn(&T) -> bool>(&self, predicate: F) -> usize {
        (0..self.len())
            .filter_map(|index| self.get(index).ok())
            .filter(|value| predicate(value))
            .count()
    }

    pub fn serialize(&self) -> SerializedPaletteArray<T> {
        let palette = match &self.palette {
            SectionPalette::Local(palette) => palette.entries().to_vec(),
            SectionPalette::Global(_) => Vec::new(),
        };
        SerializedPaletteArray {
            palette,
            data: self.data.backing().to_vec(),
        }
    }

    pub fn deserialize(
        serialized: SerializedPaletteArray<T>,
        len: usize,
        global: Arc<GlobalPalette<T>>,
        max_local_bits: u8,
    ) -> Result<Self, PaletteError> {
        let palette = if serialized.palette.is_empty() {
            SectionPalette::Global(global.copy())
        } else {
            SectionPalette::Local(LocalPalette::from_entries(serialized.palette))
        };
        let bits = calculate_needed_bits(palette.size());
        let data = VariableValueArray::from_backing(bits, len, serialized.data)?;
        let array = Self {
            palette,
            global,
            max_local_bits,
            data,
        };
        for index in 0..array.len() {
            array.get(index)?;
        }
        Ok(array)
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<&T, PaletteError>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    fn id_or_assign(&mut self, value: &T) -> Result<i32, PaletteError> {
        let needs_global = match &self.palette {
            SectionPalette::Local(palette) => {
                palette.get_id(value) == INVALID_ID
                    && calculate_needed_bits(palette.size() + 1) > self.max_local_bits
            }
            SectionPalette::Global(_) => false,
        };
        if needs_global {
            self.switch_to_global()?;
        }

        match &mut self.palette {
            SectionPalette::Local(palette) => {
                let before = palette.size();
                let id = palette.get_id_or_assign(value);
                let bits = calculate_needed_bits(palette.size());
                if palette.size() != before && bits != self.data.bits() {
                    self.data = self.data.resize(bits)?;
                }
                Ok(id)
            }
            SectionPalette::Global(palette) => match palette.get_id(value) {
                INVALID_ID => Err(PaletteError::UnknownValue),
                id => Ok(id),
            },
        }
    }

    fn switch_to_global(&mut self) -> Result<(), PaletteError> {
        let SectionPalette::Local(local) = &self.palette else {
            return Ok(());
        };
        let mut data = VariableValueArray::new(calculate_needed_bits(self.global.size()), self.len())?;
        for index in 0..self.len() {
            let local_id = self.data.get(index)? as i32;
            let value = local.get(local_id).ok_or(PaletteError::CorruptId(local_id))?;
            match self.global.get_id(value) {
                INVALID_ID => return Err(PaletteError::UnknownValue),
                id => data.set(index, id as u32)?,
            }
        }
        self.palette = SectionPalette::Global(self.global.copy());
        self.data = data;
        Ok(())
    }
}

/// Two arrays are equal when they hold the same values, regardless of palette layout.
impl<T: Clone + Eq + Hash> PartialEq for PaletteBasedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| matches!((a, b), (Ok(a), Ok(b)) if a == b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn global(size: u32) -> Arc<GlobalPalette<u32>> {
        GlobalPalette::new((0..size).collect())
    }

    #[test]
    fn test_bit_width_tracks_palette_size() {
        let mut array = PaletteBasedArray::new(4096, &0u32, global(1000), 8).unwrap();
        assert_eq!(array.bits(), 1);

        array.set(0, &1).unwrap();
        assert_eq!(array.bits(), 1);
        array.set(1, &2).unwrap();
        assert_eq!(array.bits(), 2);
        for (index, value) in (3..17).enumerate() {
            array.set(index + 2, &value).unwrap();
        }
        // 17 distinct values
        assert_eq!(array.palette().size(), 17);
        assert_eq!(array.bits(), 5);
        assert_eq!(array.get(0).unwrap(), &1);
        assert_eq!(array.get(15).unwrap(), &16);
        assert_eq!(array.get(4095).unwrap(), &0);
    }

    #[test]
    fn test_round_trip() {
        let global = global(1000);
        let mut array = PaletteBasedArray::new(4096, &0u32, global.clone(), 8).unwrap();
        for index in 0..4096 {
            array.set(index, &((index * 7 % 23) as u32)).unwrap();
        }
        let serialized = array.serialize();
        assert_eq!(serialized.palette.len(), 23);
        assert_eq!(array.bits(), 5);

        let restored = PaletteBasedArray::deserialize(serialized, 4096, global, 8).unwrap();
        assert_eq!(restored.bits(), 5);
        for index in 0..4096 {
            assert_eq!(restored.get(index).unwrap(), array.get(index).unwrap());
        }
    }

    #[test]
    fn test_switches_to_global_above_threshold() {
        let global = global(600);
        let mut array = PaletteBasedArray::new(512, &0u32, global.clone(), 4).unwrap();
        for index in 0..16 {
            array.set(index, &(index as u32)).unwrap();
        }
        assert!(!array.palette().is_global());
        assert_eq!(array.bits(), 4);

        array.set(16, &500).unwrap();
        assert!(array.palette().is_global());
        assert_eq!(array.bits(), 10);
        assert_eq!(array.get(16).unwrap(), &500);
        assert_eq!(array.get(3).unwrap(), &3);

        let serialized = array.serialize();
        assert!(serialized.palette.is_empty());
        let restored = PaletteBasedArray::deserialize(serialized, 512, global.clone(), 4).unwrap();
        assert!(restored.palette().is_global());
        match restored.palette() {
            SectionPalette::Global(shared) => assert!(Arc::ptr_eq(shared, &global)),
            SectionPalette::Local(_) => panic!("expected the global palette"),
        }
        assert_eq!(restored.get(16).unwrap(), &500);
    }

    #[test]
    fn test_unknown_global_value() {
        let mut array = PaletteBasedArray::new(16, &0u32, global(4), 1).unwrap();
        array.set(0, &1).unwrap();
        assert_matches!(array.set(1, &99), Err(PaletteError::UnknownValue));
    }

    #[test]
    fn test_deserialize_rejects_bad_backing() {
        let serialized = SerializedPaletteArray {
            palette: vec![1u32, 2, 3],
            data: vec![0; 3],
        };
        assert_matches!(
            PaletteBasedArray::deserialize(serialized, 4096, global(4), 8),
            Err(PaletteError::BackingLength { .. })
        );
    }

    #[test]
    fn test_serde_form() {
        let mut array = PaletteBasedArray::new(8, &0u32, global(8), 8).unwrap();
        array.set(3, &5).unwrap();
        let json = serde_json::to_string(&array.serialize()).unwrap();
        let back: SerializedPaletteArray<u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.palette, vec![0, 5]);
        assert_eq!(back, array.serialize());
    }

    #[test]
    fn test_count() {
        let mut array = PaletteBasedArray::new(64, &0u32, global(8), 8).unwrap();
        array.set(1, &3).unwrap();
        array.set(2, &3).unwrap();
        assert_eq!(array.count(|value| *value != 0), 2);
    }
}
