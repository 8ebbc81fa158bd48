//! Action dispatch between connections, sessions and rooms
//!
//! [`GameState`] owns the room store. For every inbound action it resolves
//! the acting connection to its session, applies the action to the addressed
//! room and turns the result into outbound packets. It never blocks and never
//! awaits, so each action runs to completion before the next one starts.

use crate::error::RoomError;
use crate::room::{GameRoom, JoinOutcome, RoomAction, RoomUpdate};
use crate::room_store::RoomStore;
use crate::session::SessionRegistry;
use log::{debug, info, warn};
use shared::{ConnectionId, Packet, Player, RoomId};
use std::time::{Duration, Instant};

/// A packet and the connections it should reach
#[derive(Debug, Clone)]
pub struct Outbound {
    pub packet: Packet,
    pub recipients: Vec<ConnectionId>,
}

impl Outbound {
    pub fn to(connection: ConnectionId, packet: Packet) -> Self {
        Self {
            packet,
            recipients: vec![connection],
        }
    }

    pub fn to_all(recipients: Vec<ConnectionId>, packet: Packet) -> Self {
        Self { packet, recipients }
    }
}

pub struct GameState {
    rooms: RoomStore,
}

impl GameState {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            rooms: RoomStore::new(max_rounds),
        }
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    /// Binds a freshly opened connection to its session.
    ///
    /// A resumed session is put back into every room that still holds one of
    /// its seats: the reconnecting party receives the full room state and
    /// everyone else a roster refresh, whatever phase the room is in. The room
    /// the session last sat down in is resent last.
    pub fn connect(
        &mut self,
        sessions: &mut SessionRegistry,
        connection: ConnectionId,
        presented: Option<&str>,
    ) -> Vec<Outbound> {
        let binding = sessions.resume_or_create(presented, connection);
        let mut outbound = vec![Outbound::to(
            connection,
            Packet::Session {
                session_id: binding.session_id.clone(),
                connection_id: connection,
            },
        )];

        if !binding.resumed {
            return outbound;
        }

        let mut seated: Vec<&mut GameRoom> = self.rooms.seated_mut(&binding.session_id).collect();
        if seated.is_empty() {
            debug!("Session {} holds no seat in any live room", binding.session_id);
            return outbound;
        }
        seated.sort_by_key(|room| binding.room_id.as_ref() == Some(room.id()));

        for room in seated {
            if room.rebind(&binding.session_id, connection).is_none() {
                continue;
            }

            let snapshot = room.snapshot();
            outbound.push(Outbound::to(
                connection,
                Packet::RoomState {
                    room: snapshot.clone(),
                },
            ));
            outbound.push(Outbound::to_all(
                others(room, connection),
                Packet::PlayerJoined { room: snapshot },
            ));
        }

        outbound
    }

    /// Applies one client action sent on `connection`.
    ///
    /// User-facing rejections are answered with an `Error` packet to the
    /// sender; every other rejection is dropped silently.
    pub fn handle_action(
        &mut self,
        sessions: &mut SessionRegistry,
        connection: ConnectionId,
        packet: Packet,
    ) -> Vec<Outbound> {
        let Some(session_id) = sessions.touch_connection(connection) else {
            warn!("Connection {} sent {} without a session", connection, packet.name());
            return Vec::new();
        };
        let action_name = packet.name();

        let result = match packet {
            Packet::CreateRoom { player_name } => {
                self.create_room(sessions, &session_id, connection, player_name)
            }
            Packet::JoinRoom {
                room_id,
                player_name,
            } => self.join_room(sessions, &session_id, connection, &room_id, player_name),
            Packet::StartGame { room_id } => {
                self.apply(&room_id, &session_id, RoomAction::StartGame)
            }
            Packet::SubmitTopic { room_id, topic } => {
                self.apply(&room_id, &session_id, RoomAction::SubmitTopic { topic })
            }
            Packet::SubmitGif { room_id, gif_url } => {
                self.apply(&room_id, &session_id, RoomAction::SubmitGif { gif_url })
            }
            Packet::SubmitVote {
                room_id,
                voted_player_id,
            } => self.apply(
                &room_id,
                &session_id,
                RoomAction::SubmitVote { voted_player_id },
            ),
            Packet::NextRound { room_id } => {
                self.apply(&room_id, &session_id, RoomAction::NextRound)
            }
            other => {
                warn!(
                    "Unexpected {} packet from connection {}",
                    other.name(),
                    connection
                );
                Ok(Vec::new())
            }
        };

        match result {
            Ok(outbound) => outbound,
            Err(err) if err.is_user_facing() => {
                debug!("Rejected {} from connection {}: {}", action_name, connection, err);
                vec![Outbound::to(
                    connection,
                    Packet::Error {
                        message: err.to_string(),
                    },
                )]
            }
            Err(err) => {
                debug!("Ignored {} from connection {}: {}", action_name, connection, err);
                Vec::new()
            }
        }
    }

    /// Drops rooms idle for longer than `timeout`.
    pub fn reap_idle_rooms(&mut self, now: Instant, timeout: Duration) -> Vec<RoomId> {
        self.rooms.reap_idle(now, timeout)
    }

    fn create_room(
        &mut self,
        sessions: &mut SessionRegistry,
        session_id: &str,
        connection: ConnectionId,
        player_name: String,
    ) -> Result<Vec<Outbound>, RoomError> {
        let host = Player::new(connection, session_id.to_string(), player_name.clone());
        let room = self.rooms.create(host)?;
        sessions.bind_room(session_id, room.id(), &player_name);

        Ok(vec![Outbound::to(
            connection,
            Packet::RoomCreated {
                room: room.snapshot(),
            },
        )])
    }

    fn join_room(
        &mut self,
        sessions: &mut SessionRegistry,
        session_id: &str,
        connection: ConnectionId,
        room_id: &str,
        player_name: String,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.rooms.get_mut(room_id)?;
        let outcome = room.join(session_id, connection, &player_name)?;
        sessions.bind_room(session_id, room.id(), &player_name);

        let snapshot = room.snapshot();
        let mut outbound = Vec::new();
        if let JoinOutcome::Reconnected { previous } = outcome {
            info!(
                "Session {} reconnected to room {} ({} -> {})",
                session_id, room_id, previous, connection
            );
            outbound.push(Outbound::to(
                connection,
                Packet::RoomState {
                    room: snapshot.clone(),
                },
            ));
        }
        let recipients = match outcome {
            JoinOutcome::Joined => room.recipients(),
            JoinOutcome::Reconnected { .. } => others(room, connection),
        };
        outbound.push(Outbound::to_all(
            recipients,
            Packet::PlayerJoined { room: snapshot },
        ));

        Ok(outbound)
    }

    fn apply(
        &mut self,
        room_id: &str,
        session_id: &str,
        action: RoomAction,
    ) -> Result<Vec<Outbound>, RoomError> {
        let room = self.rooms.get_mut(room_id)?;
        let update = room.apply(session_id, action)?;

        let packet = match update {
            RoomUpdate::GameStarted => Packet::GameStarted {
                room: room.snapshot(),
            },
            RoomUpdate::TopicSubmitted => Packet::TopicSubmitted {
                room: room.snapshot(),
            },
            RoomUpdate::GifSubmitted {
                player_count,
                submission_count,
            } => Packet::GifSubmitted {
                player_count,
                submission_count,
            },
            RoomUpdate::AllGifsSubmitted => Packet::AllGifsSubmitted {
                room: room.snapshot(),
            },
            RoomUpdate::VoteSubmitted {
                player_count,
                vote_count,
            } => Packet::VoteSubmitted {
                player_count,
                vote_count,
            },
            RoomUpdate::RoundEnded(result) => Packet::RoundEnded {
                room: room.snapshot(),
                winners: result.winners,
                vote_counts: result.counts,
            },
            RoomUpdate::NewRound => Packet::NewRound {
                room: room.snapshot(),
            },
        };

        Ok(vec![Outbound::to_all(room.recipients(), packet)])
    }
}

/// Everyone in `room` except `connection`.
fn others(room: &GameRoom, connection: ConnectionId) -> Vec<ConnectionId> {
    room.recipients()
        .into_iter()
        .filter(|id| *id != connection)
        .collect()
}
