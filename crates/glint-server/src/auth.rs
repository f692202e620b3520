use futures::future::BoxFuture;
use futures::FutureExt;
use glint_common::types::parse_flat_uuid;
use glint_common::{GameProfile, GlintError, ProfileProperty, Result};
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use serde::Deserialize;
use sha1::{Digest, Sha1};

pub const RSA_KEY_BITS: usize = 1024;
pub const VERIFY_TOKEN_LENGTH: usize = 4;

/// Turns a username (and, online, the server hash) into a game profile.
/// Implementations run on the async pool, never on the connection task.
pub trait ProfileResolver: Send + Sync {
    fn resolve(&self, username: String, server_hash: String) -> BoxFuture<'static, Result<GameProfile>>;
}

/// Offline mode: name based UUIDs, no properties.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineResolver;

impl ProfileResolver for OfflineResolver {
    fn resolve(&self, username: String, _server_hash: String) -> BoxFuture<'static, Result<GameProfile>> {
        futures::future::ready(Ok(GameProfile::offline(&username))).boxed()
    }
}

#[derive(Debug, Deserialize)]
struct HasJoinedResponse {
    id: String,
    name: String,
    #[serde(default)]
    properties: Vec<ProfileProperty>,
}

/// Online mode: asks the session server whether the player joined with our hash.
#[derive(Debug, Clone)]
pub struct MojangResolver {
    client: reqwest::Client,
    base_url: String,
}

impl MojangResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn profile_from_response(response: HasJoinedResponse) -> Result<GameProfile> {
        let id = parse_flat_uuid(&response.id).ok_or_else(|| {
            GlintError::Authentication(format!("session server sent bad UUID '{}'", response.id))
        })?;
        Ok(GameProfile::new(id, response.name).with_properties(response.properties))
    }
}

impl ProfileResolver for MojangResolver {
    fn resolve(&self, username: String, server_hash: String) -> BoxFuture<'static, Result<GameProfile>> {
        let client = self.client.clone();
        let url = format!("{}/session/minecraft/hasJoined", self.base_url);
        async move {
            let response = client
                .get(&url)
                .query(&[("username", username.as_str()), ("serverId", server_hash.as_str())])
                .send()
                .await
                .map_err(|e| GlintError::Authentication(format!("session server: {}", e)))?;

            // 204 No Content means the client never called join
            if response.status() == reqwest::StatusCode::NO_CONTENT {
                return Err(GlintError::Authentication(
                    "not authenticated with Minecraft.net".to_owned(),
                ));
            }
            let response = response
                .error_for_status()
                .map_err(|e| GlintError::Authentication(format!("session server: {}", e)))?;
            let body: HasJoinedResponse = response
                .json()
                .await
                .map_err(|e| GlintError::Authentication(format!("session server: {}", e)))?;
            Self::profile_from_response(body)
        }
        .boxed()
    }
}

/// The RSA key pair used for the login handshake.
pub struct ServerKeys {
    private_key: RsaPrivateKey,
    public_der: Vec<u8>,
}

impl ServerKeys {
    pub fn generate() -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), RSA_KEY_BITS)
            .map_err(|e| GlintError::Server(format!("failed to generate RSA key: {}", e)))?;
        let public_der = RsaPublicKey::from(&private_key)
            .to_public_key_der()
            .map_err(|e| GlintError::Server(format!("failed to encode RSA key: {}", e)))?
            .as_bytes()
            .to_vec();
        Ok(Self {
            private_key,
            public_der,
        })
    }

    /// DER encoded SubjectPublicKeyInfo, as sent in the encryption request.
    pub fn public_der(&self) -> &[u8] {
        &self.public_der
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.private_key
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| GlintError::Authentication("invalid encryption response".to_owned()))
    }
}

impl std::fmt::Debug for ServerKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ServerKeys(RSA-1024)")
    }
}

pub fn verify_token() -> Vec<u8> {
    rand::random::<[u8; VERIFY_TOKEN_LENGTH]>().to_vec()
}

/// Server hash sent to the session server: SHA-1 over server id, shared secret
/// and public key, printed as a signed hex number.
pub fn server_hash(server_id: &str, shared_secret: &[u8], public_der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(shared_secret);
    hasher.update(public_der);
    minecraft_hex_digest(hasher.finalize().into())
}

/// Formats a digest as a two's complement big-endian integer in hex, with a
/// leading minus for negative values and no leading zeros.
pub fn minecraft_hex_digest(mut digest: [u8; 20]) -> String {
    let negative = digest[0] & 0x80 != 0;
    if negative {
        let mut carry = true;
        for byte in digest.iter_mut().rev() {
            *byte = !*byte;
            if carry {
                let (value, overflow) = byte.overflowing_add(1);
                *byte = value;
                carry = overflow;
            }
        }
    }

    let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
    let trimmed = match hex.trim_start_matches('0') {
        "" => "0",
        rest => rest,
    };
    if negative {
        format!("-{}", trimmed)
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePublicKey;

    fn sha1_hex(name: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(name.as_bytes());
        minecraft_hex_digest(hasher.finalize().into())
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(sha1_hex("Notch"), "4ed1f46bbe04bc756bcb17c0c7ce3e4632f06a48");
        assert_eq!(sha1_hex("jeb_"), "-7c9d5b0044c130109a5d7b5fb5c317c02b4e28c1");
        assert_eq!(sha1_hex("simon"), "88e16a1019277b15d58faf0541e11910eb756f6");
    }

    #[test]
    fn test_key_round_trip() {
        let keys = ServerKeys::generate().unwrap();
        let public = RsaPublicKey::from_public_key_der(keys.public_der()).unwrap();
        let secret = [9u8; 16];
        let encrypted = public
            .encrypt(&mut rand::thread_rng(), Pkcs1v15Encrypt, &secret)
            .unwrap();
        assert_eq!(keys.decrypt(&encrypted).unwrap(), secret.to_vec());
        assert!(keys.decrypt(&[0u8; 128]).is_err());
    }

    #[test]
    fn test_session_server_response() {
        let body: HasJoinedResponse = serde_json::from_str(
            r#"{"id":"069a79f444e94726a5befca90e38aaf5","name":"Notch",
                "properties":[{"name":"textures","value":"e30=","signature":"c2ln"}]}"#,
        )
        .unwrap();
        let profile = MojangResolver::profile_from_response(body).unwrap();
        assert_eq!(profile.name, "Notch");
        assert_eq!(profile.id.to_string(), "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert!(profile.properties[0].is_signed());
    }

    #[tokio::test]
    async fn test_offline_resolver() {
        let profile = OfflineResolver
            .resolve("Steve".to_owned(), String::new())
            .await
            .unwrap();
        assert_eq!(profile, GameProfile::offline("Steve"));
    }
}
