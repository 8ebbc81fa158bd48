//! In-memory store of all live rooms, keyed by their six-digit code.

use crate::error::RoomError;
use crate::room::GameRoom;
use log::info;
use rand::Rng;
use shared::{Player, RoomId};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const ROOM_ID_MIN: u32 = 100_000;
const ROOM_ID_MAX: u32 = 999_999;
const MAX_ID_ATTEMPTS: usize = 64;

#[derive(Debug)]
pub struct RoomStore {
    rooms: HashMap<RoomId, GameRoom>,
    max_rounds: u32,
}

impl RoomStore {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            rooms: HashMap::new(),
            max_rounds,
        }
    }

    /// Creates a lobby hosted by `host` under a fresh, unused room id.
    pub fn create(&mut self, host: Player) -> Result<&mut GameRoom, RoomError> {
        let room_id = self.unused_room_id()?;
        info!("Room {} created by {}", room_id, host.name);

        let room = GameRoom::new(room_id.clone(), host, self.max_rounds);
        Ok(self.rooms.entry(room_id).or_insert(room))
    }

    pub fn get(&self, room_id: &str) -> Option<&GameRoom> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Result<&mut GameRoom, RoomError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))
    }

    /// Rooms in which `session_id` holds a seat.
    pub fn seated_mut<'a>(
        &'a mut self,
        session_id: &'a str,
    ) -> impl Iterator<Item = &'a mut GameRoom> + 'a {
        self.rooms
            .values_mut()
            .filter(move |room| room.room().player_by_session(session_id).is_some())
    }

    /// Drops rooms nobody acted in for longer than `timeout`.
    pub fn reap_idle(&mut self, now: Instant, timeout: Duration) -> Vec<RoomId> {
        let idle: Vec<RoomId> = self
            .rooms
            .values()
            .filter(|room| room.is_idle(now, timeout))
            .map(|room| room.id().clone())
            .collect();

        for room_id in &idle {
            self.rooms.remove(room_id);
            info!("Room {} reaped after inactivity", room_id);
        }

        idle
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn unused_room_id(&self) -> Result<RoomId, RoomError> {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = rng.gen_range(ROOM_ID_MIN..=ROOM_ID_MAX).to_string();
            if !self.rooms.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
        Err(RoomError::RoomIdsExhausted)
    }
}
