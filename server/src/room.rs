//! Authoritative room state machine
//!
//! A [`GameRoom`] owns one [`Room`] and is the only place its phase changes.
//! Phases advance when every seated player has acted (quorum), never on a
//! timer:
//!
//! ```text
//! lobby -> topic-selection -> gif-selection -> voting -> reveal -> topic-selection
//!                                                   \-> game-over (last round)
//! ```
//!
//! Every action is checked against one rule table: the phase it requires and
//! who may perform it. Actors are identified by session id; connection handles
//! only say where to send things and are rebound on reconnect.

use crate::error::RoomError;
use crate::tally::{tally, TallyResult};
use log::{debug, info};
use shared::{ConnectionId, Phase, Player, Room, RoomId, Submission, Vote, MIN_PLAYERS};
use std::time::{Duration, Instant};

/// Actions a seated player can perform on a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomAction {
    StartGame,
    SubmitTopic { topic: String },
    SubmitGif { gif_url: String },
    SubmitVote { voted_player_id: ConnectionId },
    NextRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Authority {
    Host,
    Judge,
    AnyPlayer,
}

#[derive(Debug, Clone, Copy)]
struct Rule {
    phase: Phase,
    authority: Authority,
}

impl RoomAction {
    pub fn name(&self) -> &'static str {
        match self {
            RoomAction::StartGame => "start-game",
            RoomAction::SubmitTopic { .. } => "submit-topic",
            RoomAction::SubmitGif { .. } => "submit-gif",
            RoomAction::SubmitVote { .. } => "submit-vote",
            RoomAction::NextRound => "next-round",
        }
    }

    fn rule(&self) -> Rule {
        let (phase, authority) = match self {
            RoomAction::StartGame => (Phase::Lobby, Authority::Host),
            RoomAction::SubmitTopic { .. } => (Phase::TopicSelection, Authority::Judge),
            RoomAction::SubmitGif { .. } => (Phase::GifSelection, Authority::AnyPlayer),
            RoomAction::SubmitVote { .. } => (Phase::Voting, Authority::AnyPlayer),
            RoomAction::NextRound => (Phase::Reveal, Authority::Host),
        };
        Rule { phase, authority }
    }
}

/// What an accepted action did to the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomUpdate {
    GameStarted,
    TopicSubmitted,
    GifSubmitted {
        player_count: usize,
        submission_count: usize,
    },
    AllGifsSubmitted,
    VoteSubmitted {
        player_count: usize,
        vote_count: usize,
    },
    RoundEnded(TallyResult),
    NewRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// The session already had a seat; it now speaks through the new connection
    Reconnected { previous: ConnectionId },
}

#[derive(Debug, Clone)]
pub struct GameRoom {
    room: Room,
    last_activity: Instant,
}

impl GameRoom {
    pub fn new(room_id: RoomId, host: Player, max_rounds: u32) -> Self {
        Self {
            room: Room::new(room_id, host, max_rounds),
            last_activity: Instant::now(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.room.id
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn snapshot(&self) -> Room {
        self.room.clone()
    }

    pub fn phase(&self) -> Phase {
        self.room.status
    }

    /// Connections every broadcast for this room goes to
    pub fn recipients(&self) -> Vec<ConnectionId> {
        self.room.players.iter().map(|p| p.id).collect()
    }

    pub fn is_idle(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_activity) > timeout
    }

    /// Seats a new player, or reconnects one whose session already has a seat.
    ///
    /// Reconnection works in every phase; new seats are only handed out in the lobby.
    pub fn join(
        &mut self,
        session_id: &str,
        connection: ConnectionId,
        player_name: &str,
    ) -> Result<JoinOutcome, RoomError> {
        if let Some(previous) = self.rebind(session_id, connection) {
            return Ok(JoinOutcome::Reconnected { previous });
        }

        if self.room.status != Phase::Lobby {
            return Err(RoomError::GameAlreadyStarted);
        }

        self.room.players.push(Player::new(
            connection,
            session_id.to_string(),
            player_name.to_string(),
        ));
        self.last_activity = Instant::now();
        info!(
            "Player {} joined room {} as {} ({} players)",
            player_name,
            self.room.id,
            connection,
            self.room.players.len()
        );

        Ok(JoinOutcome::Joined)
    }

    /// Points the seat owned by `session_id` at `connection`.
    ///
    /// Every reference to the old handle moves with it (host, judge,
    /// submissions, votes), so nothing the player already did is lost.
    /// Returns the previous handle, or None if the session has no seat here.
    pub fn rebind(&mut self, session_id: &str, connection: ConnectionId) -> Option<ConnectionId> {
        let player = self
            .room
            .players
            .iter_mut()
            .find(|p| p.session_id == session_id)?;
        let previous = player.id;
        player.id = connection;
        self.last_activity = Instant::now();

        if previous == connection {
            return Some(previous);
        }

        let rebound = |id: &mut ConnectionId| {
            if *id == previous {
                *id = connection;
            }
        };

        let room = &mut self.room;
        rebound(&mut room.host_id);
        if let Some(winner) = room.winner_of_last_round.as_mut() {
            rebound(winner);
        }
        for submission in &mut room.submissions {
            rebound(&mut submission.player_id);
        }
        for vote in &mut room.votes {
            rebound(&mut vote.voter_id);
            rebound(&mut vote.voted_player_id);
        }

        info!(
            "Room {}: rebound player {} from connection {} to {}",
            room.id, session_id, previous, connection
        );
        Some(previous)
    }

    /// Applies `action` on behalf of the player seated under `session_id`.
    pub fn apply(&mut self, session_id: &str, action: RoomAction) -> Result<RoomUpdate, RoomError> {
        let actor = self
            .room
            .player_by_session(session_id)
            .map(|p| p.id)
            .ok_or_else(|| RoomError::NotInRoom(self.room.id.clone()))?;

        let rule = action.rule();
        if self.room.status != rule.phase {
            return Err(RoomError::InvalidPhase {
                action: action.name(),
                current: self.room.status,
            });
        }
        self.authorize(actor, rule.authority, action.name())?;

        let update = match action {
            RoomAction::StartGame => self.start_game()?,
            RoomAction::SubmitTopic { topic } => self.submit_topic(topic),
            RoomAction::SubmitGif { gif_url } => self.submit_gif(actor, gif_url),
            RoomAction::SubmitVote { voted_player_id } => {
                self.submit_vote(actor, voted_player_id)?
            }
            RoomAction::NextRound => self.next_round(),
        };

        self.last_activity = Instant::now();
        Ok(update)
    }

    fn authorize(
        &self,
        actor: ConnectionId,
        authority: Authority,
        action: &'static str,
    ) -> Result<(), RoomError> {
        let allowed = match authority {
            Authority::Host => actor == self.room.host_id,
            Authority::Judge => actor == self.room.judge_id(),
            Authority::AnyPlayer => true,
        };

        if allowed {
            Ok(())
        } else {
            Err(RoomError::NotAuthorized { action })
        }
    }

    fn start_game(&mut self) -> Result<RoomUpdate, RoomError> {
        let present = self.room.players.len();
        if present < MIN_PLAYERS {
            return Err(RoomError::InsufficientPlayers {
                required: MIN_PLAYERS,
                present,
            });
        }

        self.room.status = Phase::TopicSelection;
        self.room.current_round = 1;
        info!("Room {}: game started with {} players", self.room.id, present);
        Ok(RoomUpdate::GameStarted)
    }

    fn submit_topic(&mut self, topic: String) -> RoomUpdate {
        self.room.submissions.clear();
        self.room.topic = topic;
        self.room.status = Phase::GifSelection;
        debug!(
            "Room {}: round {} topic is {:?}",
            self.room.id, self.room.current_round, self.room.topic
        );
        RoomUpdate::TopicSubmitted
    }

    fn submit_gif(&mut self, actor: ConnectionId, gif_url: String) -> RoomUpdate {
        match self
            .room
            .submissions
            .iter_mut()
            .find(|s| s.player_id == actor)
        {
            Some(existing) => existing.gif_url = gif_url,
            None => self.room.submissions.push(Submission {
                player_id: actor,
                gif_url,
            }),
        }

        let player_count = self.room.players.len();
        let submission_count = self.room.submissions.len();

        if submission_count == player_count {
            self.room.votes.clear();
            self.room.status = Phase::Voting;
            debug!("Room {}: all gifs in, voting opens", self.room.id);
            RoomUpdate::AllGifsSubmitted
        } else {
            RoomUpdate::GifSubmitted {
                player_count,
                submission_count,
            }
        }
    }

    fn submit_vote(
        &mut self,
        actor: ConnectionId,
        voted_player_id: ConnectionId,
    ) -> Result<RoomUpdate, RoomError> {
        if voted_player_id == actor || !self.room.has_player(voted_player_id) {
            return Err(RoomError::InvalidVote(voted_player_id));
        }

        match self.room.votes.iter_mut().find(|v| v.voter_id == actor) {
            Some(existing) => existing.voted_player_id = voted_player_id,
            None => self.room.votes.push(Vote {
                voter_id: actor,
                voted_player_id,
            }),
        }

        let player_count = self.room.players.len();
        let vote_count = self.room.votes.len();

        if vote_count < player_count {
            return Ok(RoomUpdate::VoteSubmitted {
                player_count,
                vote_count,
            });
        }

        Ok(RoomUpdate::RoundEnded(self.close_voting()))
    }

    fn close_voting(&mut self) -> TallyResult {
        let result = tally(&self.room.players, &self.room.votes);

        for player in &mut self.room.players {
            if result.is_winner(player.id) {
                player.points += 1;
            }
        }
        if let Some(judge) = result.next_judge() {
            self.room.winner_of_last_round = Some(judge);
        }

        self.room.status = if self.room.current_round >= self.room.max_rounds {
            Phase::GameOver
        } else {
            Phase::Reveal
        };

        info!(
            "Room {}: round {} ended, winners {:?}, now {}",
            self.room.id, self.room.current_round, result.winners, self.room.status
        );
        result
    }

    fn next_round(&mut self) -> RoomUpdate {
        self.room.current_round += 1;
        self.room.submissions.clear();
        self.room.votes.clear();
        self.room.status = Phase::TopicSelection;
        RoomUpdate::NewRound
    }
}
