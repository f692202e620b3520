use crate::context::{NetworkContext, ServerContext};
use crate::dispatch::{dispatch, fail};
use crate::session::{Outbound, Session};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use glint_common::{GlintError, Result};
use glint_logger::log;
use glint_logger::systime;
use glint_logger::LogSeverity::{Debug, Info, Warning};
use glint_protocol::disconnect::DisconnectPacket;
use glint_protocol::keep_alive::KeepAlivePacket;
use glint_protocol::{CodecContext, FrameCodec, Packet, ProtocolState, PROTOCOL};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::codec::Framed;

type Transport = Framed<TcpStream, FrameCodec>;

/// Drives one client socket until either side closes it.
pub async fn handle_connection(socket: TcpStream, id: u64, server: Arc<ServerContext>) {
    let peer = match socket.peer_addr() {
        Ok(peer) => peer,
        Err(e) => {
            log(format!("Dropping connection #{} without a peer address: {}", id, e), Debug);
            return;
        }
    };
    if let Err(e) = socket.set_nodelay(true) {
        log(format!("Could not disable Nagle for {}: {}", peer, e), Debug);
    }

    let (session, outbound) = Session::new(id, peer);
    let context = NetworkContext::new(Arc::new(session), server);
    log(format!("New connection from {}", context.session), Info);

    let mut transport = Framed::new(socket, FrameCodec::new());
    if let Err(e) = run(&context, &mut transport, outbound).await {
        log(format!("Connection {} ended with: {}", context.session, e), Debug);
    }

    // Marks the session closed so queued game jobs skip it.
    context.session.close("Disconnected");
    leave_game(&context);
    log(format!("{} disconnected", context.session), Info);
}

async fn run(
    context: &NetworkContext,
    transport: &mut Transport,
    mut outbound: UnboundedReceiver<Outbound>,
) -> Result<()> {
    let config = &context.server.config;
    let idle_timeout = config.idle_timeout();
    let idle = sleep(idle_timeout);
    tokio::pin!(idle);

    let period = config.keep_alive_interval();
    let mut keep_alive = interval_at(Instant::now() + period, period);
    keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut reading = true;
    loop {
        tokio::select! {
            biased;

            item = outbound.recv() => {
                let item = match item {
                    Some(item) => item,
                    None => return Ok(()),
                };
                if !write(transport, item).await? {
                    return Ok(());
                }
                // Push out everything queued behind it in one flush.
                while let Ok(item) = outbound.try_recv() {
                    if !write(transport, item).await? {
                        return Ok(());
                    }
                }
                SinkExt::<Bytes>::flush(transport).await?;
            }

            frame = transport.next(), if reading => {
                let frame = match frame {
                    Some(Ok(frame)) => frame,
                    Some(Err(GlintError::Io(e))) => return Err(GlintError::Io(e)),
                    Some(Err(e)) => {
                        fail(context, &e);
                        reading = false;
                        continue;
                    }
                    None => return Ok(()),
                };
                idle.as_mut().reset(Instant::now() + idle_timeout);
                if let Err(e) = receive(context, frame.to_vec()) {
                    fail(context, &e);
                    reading = false;
                }
            }

            _ = &mut idle, if !context.session.is_closed() => {
                log(format!("{} timed out", context.session), Info);
                context.session.close("Timed out");
            }

            _ = keep_alive.tick() => {
                if context.session.protocol_state() == ProtocolState::Play {
                    send_keep_alive(&context.session);
                }
            }
        }
    }
}

/// Decodes one frame with the session's current state and dispatches the result.
fn receive(context: &NetworkContext, frame: Vec<u8>) -> Result<()> {
    let codec_context = {
        let state = context.session.state();
        CodecContext::new(state.protocol_state, state.protocol_version)
    };
    for packet in PROTOCOL.decode_frame(&codec_context, frame)? {
        if context.session.is_closed() {
            break;
        }
        log(format!("{} -> {:?}", context.session, packet.kind()), Debug);
        dispatch(context, packet)?;
    }
    Ok(())
}

/// Applies one queued item to the transport. Returns false once the connection
/// should be torn down.
async fn write(transport: &mut Transport, item: Outbound) -> Result<bool> {
    match item {
        Outbound::Packet { state, packet } => {
            for frame in PROTOCOL.encode(state, packet)? {
                transport.feed(frame).await?;
            }
        }
        Outbound::Compression(threshold) => transport.codec_mut().set_compression(threshold),
        Outbound::Encryption(shared_secret) => {
            transport.codec_mut().enable_encryption(&shared_secret)?
        }
        Outbound::Close { state, reason } => {
            if matches!(state, ProtocolState::Login | ProtocolState::Play) {
                let disconnect = Packet::from(DisconnectPacket::new(&reason));
                match PROTOCOL.encode(state, disconnect) {
                    Ok(frames) => {
                        for frame in frames {
                            transport.feed(frame).await?;
                        }
                    }
                    Err(e) => log(format!("Could not encode disconnect: {}", e), Warning),
                }
            }
            SinkExt::<Bytes>::flush(transport).await?;
            return Ok(false);
        }
    }
    Ok(true)
}

fn send_keep_alive(session: &Session) {
    let id = systime::unix_timestamp();
    {
        let mut state = session.state();
        state.keep_alive.last_id = id;
        state.keep_alive.sent_at = Some(Instant::now());
    }
    if let Err(e) = session.send(KeepAlivePacket::new(id)) {
        log(format!("Keep alive to {} not sent: {}", session, e), Debug);
    }
}

fn leave_game(context: &NetworkContext) {
    let profile = match context.session.profile() {
        Some(profile) => profile,
        None => return,
    };
    let session_id = context.session.id();
    let result = context.server.main.submit(Box::new(move |game| {
        game.leave(session_id, &profile.id);
    }));
    if let Err(e) = result {
        log(format!("Could not remove {} from the game: {}", context.session, e), Warning);
    }
}
