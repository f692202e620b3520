use crate::session::Session;
use glint_common::{GameProfile, Result};
use glint_logger::log;
use glint_logger::LogSeverity::{Debug, Info};
use glint_protocol::chat::ChatBroadcastPacket;
use glint_protocol::chunk_data::{ChunkDataPacket, ChunkSection};
use glint_protocol::join_game::JoinGamePacket;
use glint_protocol::login::LoginSuccessPacket;
use glint_protocol::player_position::PlayerPositionAndLookPacket;
use glint_protocol::{BulkPacket, Packet, ProtocolState};
use glint_world::block_state_palette;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const STONE: u32 = 1;
const SPAWN: (f64, f64, f64) = (8.5, 64.0, 8.5);
const VIEW_DISTANCE: i32 = 2;
const DEFAULT_MAX_PLAYERS: u32 = 20;

pub struct OnlinePlayer {
    pub entity_id: i32,
    pub session: Arc<Session>,
    pub profile: GameProfile,
    pub position: (f64, f64, f64),
}

/// Game-side state, owned by the main thread.
pub struct GameState {
    players: HashMap<Uuid, OnlinePlayer>,
    online: Arc<AtomicUsize>,
    max_players: u32,
    next_entity_id: i32,
    next_teleport_id: i32,
}

impl GameState {
    pub fn new(online: Arc<AtomicUsize>) -> Self {
        Self {
            players: HashMap::new(),
            online,
            max_players: DEFAULT_MAX_PLAYERS,
            next_entity_id: 1,
            next_teleport_id: 1,
        }
    }

    /// Player cap announced to clients in Join Game.
    pub fn with_max_players(mut self, max_players: u32) -> Self {
        self.max_players = max_players;
        self
    }

    pub fn online_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: &Uuid) -> Option<&OnlinePlayer> {
        self.players.get(id)
    }

    /// Finishes a login on the game side: sends Login Success, moves the
    /// session to PLAY and queues the spawn packets behind it. A player already
    /// online with the same UUID is kicked first.
    pub fn join(&mut self, session: Arc<Session>, profile: GameProfile) -> Result<()> {
        session.send_and_transition(LoginSuccessPacket::from(&profile), ProtocolState::Play)?;

        if let Some(previous) = self.players.remove(&profile.id) {
            log(
                format!("{} logged in twice, kicking {}", profile.name, previous.session),
                Info,
            );
            previous.session.close("You logged in from another location");
        }

        let entity_id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        let teleport_id = self.next_teleport_id;
        self.next_teleport_id = self.next_teleport_id.wrapping_add(1);

        let max_players = i32::try_from(self.max_players).unwrap_or(i32::MAX);
        let mut spawn = BulkPacket::default();
        spawn.push(JoinGamePacket::overworld(entity_id, max_players, VIEW_DISTANCE));
        spawn.push(spawn_chunk()?);
        spawn.push(PlayerPositionAndLookPacket::teleport(
            SPAWN.0,
            SPAWN.1,
            SPAWN.2,
            teleport_id,
        ));
        spawn.push(ChatBroadcastPacket::system(&format!(
            "Welcome to Glint, {}!",
            profile.name
        )));
        session.send(spawn)?;

        self.broadcast(ChatBroadcastPacket::system(&format!(
            "{} joined the game",
            profile.name
        )));

        log(format!("{} joined the game", session), Info);
        self.players.insert(
            profile.id,
            OnlinePlayer {
                entity_id,
                session,
                profile,
                position: SPAWN,
            },
        );
        self.online.store(self.players.len(), Ordering::Relaxed);
        Ok(())
    }

    /// Removes the player if `session_id` is still its current session.
    pub fn leave(&mut self, session_id: u64, id: &Uuid) {
        let current = self
            .players
            .get(id)
            .map_or(false, |player| player.session.id() == session_id);
        if !current {
            return;
        }
        if let Some(player) = self.players.remove(id) {
            self.online.store(self.players.len(), Ordering::Relaxed);
            self.broadcast(ChatBroadcastPacket::system(&format!(
                "{} left the game",
                player.profile.name
            )));
        }
    }

    pub fn broadcast(&self, packet: impl Into<Packet>) {
        let packet = packet.into();
        for player in self.players.values() {
            if let Err(e) = player.session.send(packet.clone()) {
                log(format!("Skipping broadcast to {}: {}", player.session, e), Debug);
            }
        }
    }

    pub fn chat(&self, sender: &Uuid, message: &str) {
        if let Some(player) = self.players.get(sender) {
            log(format!("<{}> {}", player.profile.name, message), Info);
            self.broadcast(ChatBroadcastPacket::chat(
                player.profile.id,
                &player.profile.name,
                message,
            ));
        }
    }

    pub fn move_player(&mut self, id: &Uuid, position: (f64, f64, f64)) {
        if let Some(player) = self.players.get_mut(id) {
            player.position = position;
        }
    }
}

/// The chunk players spawn in: a stone floor under the spawn point.
fn spawn_chunk() -> Result<ChunkDataPacket> {
    let mut section = ChunkSection::new(block_state_palette())?;
    for x in 0..16 {
        for z in 0..16 {
            section.set_block_state(x, 15, z, STONE)?;
        }
    }
    let mut chunk = ChunkDataPacket::new(0, 0);
    chunk.sections[3] = Some(section);
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Outbound;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn login_session(id: u64) -> (Arc<Session>, UnboundedReceiver<Outbound>) {
        let (session, rx) = Session::new(id, "127.0.0.1:1".parse().unwrap());
        session.set_protocol_state(ProtocolState::Login).unwrap();
        (Arc::new(session), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<Outbound>) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(item) = rx.try_recv() {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_join_sends_spawn_bulk() {
        let online = Arc::new(AtomicUsize::new(0));
        let mut game = GameState::new(online.clone());
        let (session, mut rx) = login_session(1);
        game.join(session.clone(), GameProfile::offline("Alex")).unwrap();

        assert_eq!(online.load(Ordering::Relaxed), 1);
        assert_eq!(session.protocol_state(), ProtocolState::Play);
        match drain(&mut rx).as_slice() {
            [Outbound::Packet {
                state: ProtocolState::Login,
                packet: Packet::LoginSuccess(success),
            }, Outbound::Packet {
                state: ProtocolState::Play,
                packet: Packet::Bulk(bulk),
            }] => {
                assert_eq!(success.username, "Alex");
                assert_eq!(bulk.packets.len(), 4);
                match &bulk.packets[0] {
                    Packet::JoinGame(join) => assert_eq!(join.entity_id, 1),
                    other => panic!("unexpected {:?}", other),
                }
                assert!(matches!(bulk.packets[1], Packet::ChunkData(_)));
                assert!(matches!(bulk.packets[2], Packet::PlayerPositionAndLook(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let mut game = GameState::new(Arc::new(AtomicUsize::new(0))).with_max_players(5);
        let (alex, _alex_rx) = login_session(1);
        let (steve, mut steve_rx) = login_session(2);
        game.join(alex, GameProfile::offline("Alex")).unwrap();
        game.join(steve, GameProfile::offline("Steve")).unwrap();

        let steve_id = GameProfile::offline("Steve").id;
        assert_eq!(game.player(&steve_id).unwrap().entity_id, 2);
        match drain(&mut steve_rx).as_slice() {
            [_, Outbound::Packet {
                packet: Packet::Bulk(bulk),
                ..
            }] => match &bulk.packets[0] {
                Packet::JoinGame(join) => assert_eq!(join.max_players, 5),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_join_of_closed_session_adds_nobody() {
        let mut game = GameState::new(Arc::new(AtomicUsize::new(0)));
        let (session, _rx) = login_session(1);
        session.close("Disconnected");

        assert!(game.join(session, GameProfile::offline("Alex")).is_err());
        assert_eq!(game.online_count(), 0);
    }

    #[test]
    fn test_duplicate_login_kicks_older_session() {
        let mut game = GameState::new(Arc::new(AtomicUsize::new(0)));
        let (first, _first_rx) = login_session(1);
        let (second, _second_rx) = login_session(2);
        let profile = GameProfile::offline("Alex");

        game.join(first.clone(), profile.clone()).unwrap();
        game.join(second.clone(), profile.clone()).unwrap();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(game.online_count(), 1);

        // the kicked session leaving must not remove the new one
        game.leave(first.id(), &profile.id);
        assert_eq!(game.player(&profile.id).unwrap().session.id(), 2);
        game.leave(second.id(), &profile.id);
        assert_eq!(game.online_count(), 0);
    }

    #[test]
    fn test_chat_reaches_everyone() {
        let mut game = GameState::new(Arc::new(AtomicUsize::new(0)));
        let (alex, mut alex_rx) = login_session(1);
        let (steve, mut steve_rx) = login_session(2);
        let alex_profile = GameProfile::offline("Alex");
        game.join(alex, alex_profile.clone()).unwrap();
        game.join(steve, GameProfile::offline("Steve")).unwrap();
        drain(&mut alex_rx);
        drain(&mut steve_rx);

        game.chat(&alex_profile.id, "hello");
        for rx in [&mut alex_rx, &mut steve_rx] {
            match drain(rx).as_slice() {
                [Outbound::Packet {
                    packet: Packet::ChatBroadcast(chat),
                    ..
                }] => assert!(chat.json.contains("<Alex> hello")),
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
