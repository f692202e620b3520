use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use uuid::{Builder, Uuid};

pub type Result<T> = std::result::Result<T, crate::error::GlintError>;

/// A signed (or unsigned) key/value pair attached to a profile, e.g. skin textures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ProfileProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>, signature: Option<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            signature,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

/// Player identity. A trusted proxy may hand us one before login completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<ProfileProperty>,
}

impl GameProfile {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties(mut self, properties: Vec<ProfileProperty>) -> Self {
        self.properties = properties;
        self
    }

    /// Builds the offline-mode profile. The UUID is the MD5 of `OfflinePlayer:<name>`
    /// with the v3 bits set and no namespace prefix.
    pub fn offline(name: &str) -> Self {
        let digest: [u8; 16] = Md5::digest(format!("OfflinePlayer:{}", name).as_bytes()).into();
        Self::new(Builder::from_md5_bytes(digest).into_uuid(), name)
    }
}

/// Parses a 32 hex digit UUID without dashes.
pub fn parse_flat_uuid(flat: &str) -> Option<Uuid> {
    if flat.len() != 32 || !flat.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Uuid::try_parse(flat).ok()
}
