//! Vote tallying for a closed voting phase.
//!
//! Counts are kept in join order, so both the reported counts and the choice
//! of the next judge among tied winners are deterministic: the earliest-joined
//! winner judges the next round.

use shared::{ConnectionId, Player, Vote, VoteCount};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    /// Candidates with at least one vote, in join order
    pub counts: Vec<VoteCount>,
    /// Every candidate holding the maximal count, in join order
    pub winners: Vec<ConnectionId>,
}

impl TallyResult {
    /// Judge of the next round: the earliest-joined winner.
    pub fn next_judge(&self) -> Option<ConnectionId> {
        self.winners.first().copied()
    }

    pub fn is_winner(&self, player_id: ConnectionId) -> bool {
        self.winners.contains(&player_id)
    }
}

/// Tallies `votes` against the room's seated `players`.
///
/// Votes naming a handle that is not seated are not counted. Ties are not
/// broken: all tied candidates win.
pub fn tally(players: &[Player], votes: &[Vote]) -> TallyResult {
    let counts: Vec<VoteCount> = players
        .iter()
        .map(|player| VoteCount {
            player_id: player.id,
            votes: votes
                .iter()
                .filter(|vote| vote.voted_player_id == player.id)
                .count() as u32,
        })
        .filter(|count| count.votes > 0)
        .collect();

    let max_votes = counts.iter().map(|count| count.votes).max().unwrap_or(0);

    let winners = counts
        .iter()
        .filter(|count| count.votes == max_votes)
        .map(|count| count.player_id)
        .collect();

    TallyResult { counts, winners }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players(ids: &[ConnectionId]) -> Vec<Player> {
        ids.iter()
            .map(|id| Player::new(*id, format!("session-{}", id), format!("player-{}", id)))
            .collect()
    }

    fn vote(voter_id: ConnectionId, voted_player_id: ConnectionId) -> Vote {
        Vote {
            voter_id,
            voted_player_id,
        }
    }

    #[test]
    fn test_single_winner() {
        let players = players(&[1, 2, 3]);
        let votes = vec![vote(1, 2), vote(3, 2), vote(2, 1)];

        let result = tally(&players, &votes);

        assert_eq!(
            result.counts,
            vec![
                VoteCount {
                    player_id: 1,
                    votes: 1
                },
                VoteCount {
                    player_id: 2,
                    votes: 2
                },
            ]
        );
        assert_eq!(result.winners, vec![2]);
        assert_eq!(result.next_judge(), Some(2));
    }

    #[test]
    fn test_three_way_tie() {
        let players = players(&[1, 2, 3]);
        let votes = vec![vote(1, 2), vote(2, 3), vote(3, 1)];

        let result = tally(&players, &votes);

        assert_eq!(result.winners, vec![1, 2, 3]);
        assert!(result.counts.iter().all(|count| count.votes == 1));
    }

    #[test]
    fn test_tie_break_follows_join_order() {
        // Player 9 joined before player 4
        let players = players(&[9, 4, 5, 6]);
        let votes = vec![vote(9, 4), vote(4, 9), vote(5, 4), vote(6, 9)];

        let result = tally(&players, &votes);

        assert_eq!(result.winners, vec![9, 4]);
        assert_eq!(result.next_judge(), Some(9));
        assert!(result.is_winner(4));
        assert!(!result.is_winner(5));
    }

    #[test]
    fn test_votes_for_unseated_handles_are_ignored() {
        let players = players(&[1, 2]);
        let votes = vec![vote(1, 42), vote(2, 1)];

        let result = tally(&players, &votes);

        assert_eq!(result.winners, vec![1]);
        assert_eq!(result.counts.len(), 1);
    }

    #[test]
    fn test_no_votes() {
        let result = tally(&players(&[1, 2]), &[]);

        assert!(result.counts.is_empty());
        assert!(result.winners.is_empty());
        assert_eq!(result.next_judge(), None);
    }
}
