use crate::palette::GlobalPalette;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// Number of block states known to protocol 754 clients.
pub const BLOCK_STATE_COUNT: u32 = 17_112;

pub const AIR: u32 = 0;

static BLOCK_STATES: Lazy<Arc<GlobalPalette<u32>>> =
    Lazy::new(|| GlobalPalette::new((0..BLOCK_STATE_COUNT).collect()));

/// The shared global palette of block state ids. Every call returns the same instance.
pub fn block_state_palette() -> Arc<GlobalPalette<u32>> {
    BLOCK_STATES.copy()
}
