use crate::config::ProxyDialect;
use crate::session::{SessionExtensions, VirtualAddress};
use glint_common::types::parse_flat_uuid;
use glint_common::{GameProfile, GlintError, ProfileProperty, Result};
use glint_protocol::handshake::HandshakePacket;
use glint_protocol::{ProtocolState, PROTOCOL_VERSION};
use serde::Deserialize;
use uuid::Uuid;

/// Appended to the hostname by Forge clients, as `\0FML\0` or `\0FML2\0`.
pub const MODDED_MARKER: &str = "\0FML";

const LEGACY_EXTRA_SEPARATOR: &str = "\0|";

/// What a handshake tells us about the connection, once proxy data is unpacked.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeOutcome {
    pub next_state: ProtocolState,
    pub virtual_host: VirtualAddress,
    pub extensions: SessionExtensions,
}

/// Interprets a handshake under the configured proxy dialect. Pure: callers apply
/// the outcome to the session, or close it with the error's reason.
pub fn negotiate(
    handshake: &HandshakePacket,
    dialect: ProxyDialect,
    secret: &str,
    remote_port: u16,
) -> Result<HandshakeOutcome> {
    let next_state = ProtocolState::from_next_state(handshake.next_state)?;

    let (virtual_host, extensions) = match dialect {
        ProxyDialect::None => direct(handshake)?,
        ProxyDialect::Legacy => legacy(handshake, remote_port)?,
        ProxyDialect::Lilypad => lilypad(handshake, secret)?,
    };

    if next_state == ProtocolState::Login {
        check_version(handshake.protocol_version)?;
    }

    let extensions = if next_state == ProtocolState::Login {
        extensions
    } else {
        SessionExtensions {
            spoofed_profile: None,
            ..extensions
        }
    };

    Ok(HandshakeOutcome {
        next_state,
        virtual_host,
        extensions,
    })
}

pub fn check_version(client: i32) -> Result<()> {
    if client == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(GlintError::ProtocolVersionMismatch {
            client,
            server: PROTOCOL_VERSION,
        })
    }
}

fn direct(handshake: &HandshakePacket) -> Result<(VirtualAddress, SessionExtensions)> {
    let mut extensions = SessionExtensions::default();
    let host = match handshake.hostname.find(MODDED_MARKER) {
        Some(index) => {
            extensions.modded = true;
            &handshake.hostname[..index]
        }
        None => handshake.hostname.as_str(),
    };
    if host.chars().count() > HandshakePacket::MAX_HOSTNAME_LENGTH {
        return Err(GlintError::decode(format!(
            "hostname longer than {} characters",
            HandshakePacket::MAX_HOSTNAME_LENGTH
        )));
    }
    Ok((VirtualAddress::new(host, handshake.port), extensions))
}

fn legacy(
    handshake: &HandshakePacket,
    remote_port: u16,
) -> Result<(VirtualAddress, SessionExtensions)> {
    let mut parts = handshake.hostname.splitn(2, LEGACY_EXTRA_SEPARATOR);
    let primary = parts.next().unwrap_or_default();
    let modded = parts.next().map_or(false, |extra| extra.contains("FML"));

    let fields: Vec<&str> = primary.split('\0').collect();
    if fields.len() != 3 && fields.len() != 4 {
        return Err(GlintError::MalformedHandshakeData(format!(
            "expected 3 or 4 forwarded fields, got {}",
            fields.len()
        )));
    }

    let uuid = parse_flat_uuid(fields[2]).ok_or_else(|| {
        GlintError::MalformedHandshakeData(format!("invalid forwarded UUID '{}'", fields[2]))
    })?;
    let properties: Vec<ProfileProperty> = match fields.get(3) {
        Some(json) => serde_json::from_str(json)
            .map_err(|e| GlintError::decode(format!("forwarded properties: {}", e)))?,
        None => Vec::new(),
    };

    let extensions = SessionExtensions {
        virtual_address: Some(VirtualAddress::new(fields[1], remote_port)),
        // The name arrives with LoginStart.
        spoofed_profile: Some(GameProfile::new(uuid, "").with_properties(properties)),
        modded,
    };
    Ok((VirtualAddress::new(fields[0], handshake.port), extensions))
}

#[derive(Debug, Deserialize)]
struct LilyPadProperty {
    #[serde(rename = "n")]
    name: String,
    #[serde(rename = "v")]
    value: String,
    #[serde(rename = "s", default)]
    signature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LilyPadPayload {
    #[serde(rename = "s")]
    secret: String,
    #[serde(rename = "n")]
    name: String,
    #[serde(rename = "u")]
    uuid: String,
    #[serde(rename = "p", default)]
    properties: Vec<LilyPadProperty>,
    #[serde(rename = "rP")]
    real_port: u16,
    #[serde(rename = "h")]
    host: String,
}

fn lilypad(handshake: &HandshakePacket, secret: &str) -> Result<(VirtualAddress, SessionExtensions)> {
    let payload: LilyPadPayload = serde_json::from_str(&handshake.hostname)
        .map_err(|e| GlintError::decode(format!("LilyPad payload: {}", e)))?;

    if !secret.is_empty() && payload.secret != secret {
        return Err(GlintError::ProxySecurityMismatch {
            claimed_name: payload.name,
        });
    }

    let uuid = Uuid::parse_str(&payload.uuid).map_err(|_| {
        GlintError::MalformedHandshakeData(format!("invalid forwarded UUID '{}'", payload.uuid))
    })?;
    let properties = payload
        .properties
        .into_iter()
        .map(|property| ProfileProperty::new(property.name, property.value, property.signature))
        .collect();

    let extensions = SessionExtensions {
        virtual_address: Some(VirtualAddress::new(payload.host.clone(), payload.real_port)),
        spoofed_profile: Some(GameProfile::new(uuid, payload.name).with_properties(properties)),
        modded: false,
    };
    Ok((VirtualAddress::new(payload.host, handshake.port), extensions))
}
