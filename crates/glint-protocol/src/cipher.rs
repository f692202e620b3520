use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use glint_common::{GlintError, Result};

type Aes128Cfb8Enc = cfb8::Encryptor<aes::Aes128>;
type Aes128Cfb8Dec = cfb8::Decryptor<aes::Aes128>;

/// Length of the shared secret negotiated during login.
pub const SHARED_SECRET_LENGTH: usize = 16;

/// AES-128 in CFB8 mode, keyed and seeded with the shared secret.
/// Each direction keeps its own running state for the life of the connection.
pub struct StreamCipher {
    encryptor: Aes128Cfb8Enc,
    decryptor: Aes128Cfb8Dec,
}

impl StreamCipher {
    pub fn new(shared_secret: &[u8]) -> Result<Self> {
        if shared_secret.len() != SHARED_SECRET_LENGTH {
            return Err(GlintError::Authentication(format!(
                "shared secret must be {} bytes, got {}",
                SHARED_SECRET_LENGTH,
                shared_secret.len()
            )));
        }
        let invalid = |_| GlintError::Authentication("invalid shared secret".to_owned());
        Ok(Self {
            encryptor: Aes128Cfb8Enc::new_from_slices(shared_secret, shared_secret)
                .map_err(invalid)?,
            decryptor: Aes128Cfb8Dec::new_from_slices(shared_secret, shared_secret)
                .map_err(invalid)?,
        })
    }

    /// Encrypts outbound bytes in place.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.encryptor
                .encrypt_block_mut(GenericArray::from_mut_slice(std::slice::from_mut(byte)));
        }
    }

    /// Decrypts inbound bytes in place.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            self.decryptor
                .decrypt_block_mut(GenericArray::from_mut_slice(std::slice::from_mut(byte)));
        }
    }
}

impl std::fmt::Debug for StreamCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamCipher(AES-128/CFB8)")
    }
}
