//! Durable player identity across reconnects
//!
//! The session registry maps a session id, which the client keeps across
//! refreshes and socket churn, to the connection currently speaking for it and
//! to the room it last sat down in. The room reference is a plain id: the room
//! store stays the only authority on game state, and a session pointing at a
//! room that no longer exists is simply treated as roomless.
//!
//! Sessions expire after a period of inactivity. Expiry only forgets the
//! identity mapping; the player's seat and points stay in the room.

use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;
use shared::{ConnectionId, RoomId, SessionId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const SESSION_ID_LEN: usize = 24;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    /// Connection currently bound to this session
    pub connection: ConnectionId,
    /// Last room this session created or joined
    pub room_id: Option<RoomId>,
    pub player_name: Option<String>,
    pub last_seen: Instant,
}

impl Session {
    fn new(session_id: SessionId, connection: ConnectionId) -> Self {
        Self {
            session_id,
            connection,
            room_id: None,
            player_name: None,
            last_seen: Instant::now(),
        }
    }

    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }
}

/// Outcome of binding a fresh connection to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBinding {
    pub session_id: SessionId,
    /// True when an existing session was picked up again
    pub resumed: bool,
    pub room_id: Option<RoomId>,
    /// Connection the session was bound to before this one
    pub previous_connection: Option<ConnectionId>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    by_connection: HashMap<ConnectionId, SessionId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `connection` to the presented session, or mints a new one.
    ///
    /// Lookup and rebind happen under one `&mut self`, so a sweep can never
    /// evict the session halfway through a reconnect.
    pub fn resume_or_create(
        &mut self,
        presented: Option<&str>,
        connection: ConnectionId,
    ) -> SessionBinding {
        if let Some(session) = presented.and_then(|id| self.sessions.get_mut(id)) {
            let previous = session.connection;
            session.connection = connection;
            session.last_seen = Instant::now();

            let binding = SessionBinding {
                session_id: session.session_id.clone(),
                resumed: true,
                room_id: session.room_id.clone(),
                previous_connection: Some(previous),
            };

            if self.by_connection.get(&previous) == Some(&binding.session_id) {
                self.by_connection.remove(&previous);
            }
            self.by_connection
                .insert(connection, binding.session_id.clone());

            info!(
                "Session {} resumed on connection {} (was {})",
                binding.session_id, connection, previous
            );
            return binding;
        }

        if let Some(id) = presented {
            debug!("Unknown or expired session {}, issuing a new one", id);
        }

        let session_id = self.unused_session_id();
        self.sessions
            .insert(session_id.clone(), Session::new(session_id.clone(), connection));
        self.by_connection.insert(connection, session_id.clone());
        info!("Session {} created for connection {}", session_id, connection);

        SessionBinding {
            session_id,
            resumed: false,
            room_id: None,
            previous_connection: None,
        }
    }

    /// Resolves the session speaking on `connection` and refreshes it.
    pub fn touch_connection(&mut self, connection: ConnectionId) -> Option<SessionId> {
        let session_id = self.by_connection.get(&connection)?;
        let session = self.sessions.get_mut(session_id)?;
        session.last_seen = Instant::now();
        Some(session.session_id.clone())
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Records the room a session sat down in.
    pub fn bind_room(&mut self, session_id: &str, room_id: &RoomId, player_name: &str) {
        if let Some(session) = self.sessions.get_mut(session_id) {
            session.room_id = Some(room_id.clone());
            session.player_name = Some(player_name.to_string());
            session.last_seen = Instant::now();
        }
    }

    /// Forgets which session a dropped connection spoke for; the session itself stays.
    pub fn detach_connection(&mut self, connection: ConnectionId) -> Option<SessionId> {
        self.by_connection.remove(&connection)
    }

    /// Evicts sessions idle for longer than `ttl` and returns their ids.
    ///
    /// A session still bound to a live connection is never evicted, however
    /// long its player has been quiet.
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> Vec<SessionId> {
        let expired: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|session| session.is_expired(now, ttl) && !self.is_bound(session))
            .map(|session| session.session_id.clone())
            .collect();

        for session_id in &expired {
            self.sessions.remove(session_id);
        }

        expired
    }

    fn is_bound(&self, session: &Session) -> bool {
        self.by_connection.get(&session.connection) == Some(&session.session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn unused_session_id(&self) -> SessionId {
        loop {
            let candidate = generate_session_id();
            if !self.sessions.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

pub fn generate_session_id() -> SessionId {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}
