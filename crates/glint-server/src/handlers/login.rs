use crate::auth::{server_hash, verify_token};
use crate::context::NetworkContext;
use crate::dispatch::fail;
use crate::handlers::unexpected;
use futures::future::BoxFuture;
use futures::FutureExt;
use glint_common::{GameProfile, GlintError, Result};
use glint_logger::log;
use glint_logger::LogSeverity::{Error, Info};
use glint_protocol::cipher::SHARED_SECRET_LENGTH;
use glint_protocol::login::{EncryptionRequestPacket, SetCompressionPacket};
use glint_protocol::{Packet, PacketKind};

/// Runs on the session's async lane.
pub fn handle_login_start(context: NetworkContext, packet: Packet) -> BoxFuture<'static, Result<()>> {
    async move {
        let start = match packet {
            Packet::LoginStart(start) => start,
            other => return Err(unexpected(PacketKind::LoginStart, &other)),
        };

        let spoofed = {
            let mut state = context.session.state();
            if state.login.username.is_some() {
                return Err(GlintError::decode("duplicate login start"));
            }
            state.login.username = Some(start.username.clone());
            state.extensions.spoofed_profile.clone()
        };

        if let Some(mut profile) = spoofed {
            if profile.name.is_empty() {
                profile.name = start.username;
            }
            return complete_login(&context, profile);
        }

        match &context.server.keys {
            Some(keys) => {
                let token = verify_token();
                context.session.state().login.verify_token = token.clone();
                context.session.send(EncryptionRequestPacket {
                    server_id: String::new(),
                    public_key: keys.public_der().to_vec(),
                    verify_token: token,
                })
            }
            None => {
                let profile = context
                    .server
                    .resolver
                    .resolve(start.username, String::new())
                    .await?;
                complete_login(&context, profile)
            }
        }
    }
    .boxed()
}

/// Checks the verify token and installs the cipher before the next frame is read,
/// then resolves the profile on the async lane.
pub fn handle_encryption_response(context: &NetworkContext, packet: Packet) -> Result<()> {
    let response = match packet {
        Packet::EncryptionResponse(response) => response,
        other => return Err(unexpected(PacketKind::EncryptionResponse, &other)),
    };
    let keys = context.server.keys.as_ref().ok_or_else(|| {
        GlintError::Authentication("encryption is not used in offline mode".to_owned())
    })?;

    let (username, expected_token) = {
        let mut state = context.session.state();
        let token = std::mem::take(&mut state.login.verify_token);
        match state.login.username.clone() {
            Some(username) if !token.is_empty() => (username, token),
            _ => return Err(GlintError::decode("unexpected encryption response")),
        }
    };

    if keys.decrypt(&response.verify_token)? != expected_token {
        return Err(GlintError::Authentication("invalid verify token".to_owned()));
    }
    let shared_secret = keys.decrypt(&response.shared_secret)?;
    if shared_secret.len() != SHARED_SECRET_LENGTH {
        return Err(GlintError::Authentication("invalid shared secret".to_owned()));
    }

    let hash = server_hash("", &shared_secret, keys.public_der());
    context.session.enable_encryption(shared_secret)?;

    let job_context = context.clone();
    context.server.pool.submit(
        &context.session,
        async move {
            let result = job_context
                .server
                .resolver
                .resolve(username, hash)
                .await
                .and_then(|profile| complete_login(&job_context, profile));
            if let Err(e) = result {
                fail(&job_context, &e);
            }
        }
        .boxed(),
    )
}

/// Finishes login: enables compression, then hands the player to the game,
/// which sends Login Success and switches to PLAY once the player is registered.
pub fn complete_login(context: &NetworkContext, profile: GameProfile) -> Result<()> {
    let session = &context.session;
    let threshold = context.server.config.compression_threshold;
    if threshold >= 0 {
        session.send(SetCompressionPacket { threshold })?;
        session.set_compression(threshold)?;
    }

    session.state().profile = Some(profile.clone());
    log(
        format!("{} logged in as {} ({})", session.peer(), profile.name, profile.id),
        Info,
    );

    let session = session.clone();
    context.server.main.submit(Box::new(move |game| {
        if session.is_closed() {
            return;
        }
        if let Err(e) = game.join(session.clone(), profile) {
            log(format!("Failed to add {} to the game: {}", session, e), Error);
            session.close_with(&e);
        }
    }))
}
