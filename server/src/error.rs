//! Room-level error taxonomy.
//!
//! Only [`RoomError::RoomNotFound`] and [`RoomError::GameAlreadyStarted`] are
//! reported back to the client; everything else is a silent no-op so that
//! duplicate or late retries from flaky clients are harmless.

use shared::{ConnectionId, Phase, RoomId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Not authorized to {action}")]
    NotAuthorized { action: &'static str },

    #[error("{action} is not valid during {current}")]
    InvalidPhase {
        action: &'static str,
        current: Phase,
    },

    #[error("At least {required} players are needed, room has {present}")]
    InsufficientPlayers { required: usize, present: usize },

    #[error("Cannot vote for player {0}")]
    InvalidVote(ConnectionId),

    #[error("Player is not seated in room {0}")]
    NotInRoom(RoomId),

    #[error("Could not allocate a free room id")]
    RoomIdsExhausted,
}

impl RoomError {
    /// Whether the initiating client should be told about this rejection.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RoomError::RoomNotFound(_) | RoomError::GameAlreadyStarted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(RoomError::RoomNotFound("123456".to_string()).is_user_facing());
        assert!(RoomError::GameAlreadyStarted.is_user_facing());
        assert!(!RoomError::NotAuthorized { action: "start-game" }.is_user_facing());
        assert!(!RoomError::InvalidPhase {
            action: "submit-vote",
            current: Phase::Lobby
        }
        .is_user_facing());
        assert!(!RoomError::InsufficientPlayers {
            required: 2,
            present: 1
        }
        .is_user_facing());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            RoomError::RoomNotFound("654321".to_string()).to_string(),
            "Room 654321 not found"
        );
        assert_eq!(
            RoomError::InvalidPhase {
                action: "next-round",
                current: Phase::Voting
            }
            .to_string(),
            "next-round is not valid during voting"
        );
    }
}
