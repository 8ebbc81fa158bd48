use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PACKET_SIZE: usize = 64 * 1024;
pub const DEFAULT_MAX_ROUNDS: u32 = 10;
pub const MIN_PLAYERS: usize = 2;
pub const SESSION_TTL_SECS: u64 = 5 * 60;
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;

/// Volatile per-connection handle, rebound when a player reconnects.
pub type ConnectionId = u32;
/// Durable identity presented by a client across reconnects.
pub type SessionId = String;
/// Six-digit numeric room code.
pub type RoomId = String;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
        session_id: Option<SessionId>,
    },
    Heartbeat,
    Disconnect,

    CreateRoom {
        player_name: String,
    },
    JoinRoom {
        room_id: RoomId,
        player_name: String,
    },
    StartGame {
        room_id: RoomId,
    },
    SubmitTopic {
        room_id: RoomId,
        topic: String,
    },
    SubmitGif {
        room_id: RoomId,
        gif_url: String,
    },
    SubmitVote {
        room_id: RoomId,
        voted_player_id: ConnectionId,
    },
    NextRound {
        room_id: RoomId,
    },

    Session {
        session_id: SessionId,
        connection_id: ConnectionId,
    },
    RoomCreated {
        room: Room,
    },
    PlayerJoined {
        room: Room,
    },
    RoomState {
        room: Room,
    },
    GameStarted {
        room: Room,
    },
    TopicSubmitted {
        room: Room,
    },
    GifSubmitted {
        player_count: usize,
        submission_count: usize,
    },
    AllGifsSubmitted {
        room: Room,
    },
    VoteSubmitted {
        player_count: usize,
        vote_count: usize,
    },
    RoundEnded {
        room: Room,
        winners: Vec<ConnectionId>,
        vote_counts: Vec<VoteCount>,
    },
    NewRound {
        room: Room,
    },
    Error {
        message: String,
    },
    Disconnected {
        reason: String,
    },
}

impl Packet {
    /// Event name as used in logs, e.g. `submit-gif` or `round-ended`.
    pub fn name(&self) -> &'static str {
        match self {
            Packet::Connect { .. } => "connect",
            Packet::Heartbeat => "heartbeat",
            Packet::Disconnect => "disconnect",
            Packet::CreateRoom { .. } => "create-room",
            Packet::JoinRoom { .. } => "join-room",
            Packet::StartGame { .. } => "start-game",
            Packet::SubmitTopic { .. } => "submit-topic",
            Packet::SubmitGif { .. } => "submit-gif",
            Packet::SubmitVote { .. } => "submit-vote",
            Packet::NextRound { .. } => "next-round",
            Packet::Session { .. } => "session",
            Packet::RoomCreated { .. } => "room-created",
            Packet::PlayerJoined { .. } => "player-joined",
            Packet::RoomState { .. } => "room-state",
            Packet::GameStarted { .. } => "game-started",
            Packet::TopicSubmitted { .. } => "topic-submitted",
            Packet::GifSubmitted { .. } => "gif-submitted",
            Packet::AllGifsSubmitted { .. } => "all-gifs-submitted",
            Packet::VoteSubmitted { .. } => "vote-submitted",
            Packet::RoundEnded { .. } => "round-ended",
            Packet::NewRound { .. } => "new-round",
            Packet::Error { .. } => "error",
            Packet::Disconnected { .. } => "disconnected",
        }
    }

    /// Room snapshot carried by the packet, if any.
    pub fn room(&self) -> Option<&Room> {
        match self {
            Packet::RoomCreated { room }
            | Packet::PlayerJoined { room }
            | Packet::RoomState { room }
            | Packet::GameStarted { room }
            | Packet::TopicSubmitted { room }
            | Packet::AllGifsSubmitted { room }
            | Packet::RoundEnded { room, .. }
            | Packet::NewRound { room } => Some(room),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lobby,
    TopicSelection,
    GifSelection,
    Voting,
    Reveal,
    GameOver,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::TopicSelection => "topic-selection",
            Phase::GifSelection => "gif-selection",
            Phase::Voting => "voting",
            Phase::Reveal => "reveal",
            Phase::GameOver => "game-over",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::GameOver)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: ConnectionId,
    // Never broadcast: holding another player's session id is enough to take their seat.
    #[serde(skip)]
    pub session_id: SessionId,
    pub name: String,
    pub points: u32,
}

impl Player {
    pub fn new(id: ConnectionId, session_id: SessionId, name: String) -> Self {
        Self {
            id,
            session_id,
            name,
            points: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Submission {
    pub player_id: ConnectionId,
    pub gif_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub voter_id: ConnectionId,
    pub voted_player_id: ConnectionId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct VoteCount {
    pub player_id: ConnectionId,
    pub votes: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    pub host_id: ConnectionId,
    pub players: Vec<Player>,
    pub status: Phase,
    pub current_round: u32,
    pub max_rounds: u32,
    pub topic: String,
    pub submissions: Vec<Submission>,
    pub votes: Vec<Vote>,
    pub winner_of_last_round: Option<ConnectionId>,
}

impl Room {
    /// Creates a lobby with `host` as its only player and first judge.
    pub fn new(id: RoomId, host: Player, max_rounds: u32) -> Self {
        let host_id = host.id;
        Self {
            id,
            host_id,
            players: vec![host],
            status: Phase::Lobby,
            current_round: 0,
            max_rounds,
            topic: String::new(),
            submissions: Vec::new(),
            votes: Vec::new(),
            winner_of_last_round: Some(host_id),
        }
    }

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_by_session(&self, session_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.session_id == session_id)
    }

    pub fn has_player(&self, id: ConnectionId) -> bool {
        self.player(id).is_some()
    }

    /// The player allowed to pick this round's topic.
    pub fn judge_id(&self) -> ConnectionId {
        self.winner_of_last_round.unwrap_or(self.host_id)
    }

    pub fn submission_of(&self, player_id: ConnectionId) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.player_id == player_id)
    }

    pub fn vote_of(&self, voter_id: ConnectionId) -> Option<&Vote> {
        self.votes.iter().find(|v| v.voter_id == voter_id)
    }
}
