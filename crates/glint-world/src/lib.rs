pub mod block_states;
pub mod palette;
pub mod palette_array;
pub mod variable_value_array;

pub use block_states::{block_state_palette, AIR, BLOCK_STATE_COUNT};
pub use palette::{GlobalPalette, LocalPalette, Palette, INVALID_ID};
pub use palette_array::{PaletteBasedArray, SectionPalette, SerializedPaletteArray};
pub use variable_value_array::VariableValueArray;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide { value: u32, bits: u8 },

    #[error("bit width {0} is outside 1..=32")]
    InvalidBitWidth(u8),

    #[error("packed array has {actual} longs, expected {expected}")]
    BackingLength { expected: usize, actual: usize },

    #[error("value is not present in the global palette")]
    UnknownValue,

    #[error("packed id {0} has no palette entry")]
    CorruptId(i32),
}
