pub mod error;
pub mod types;

pub use error::GlintError;
pub use types::{GameProfile, ProfileProperty, Result};
