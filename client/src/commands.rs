//! Text commands typed at the client prompt and their protocol packets

use shared::{ConnectionId, Packet, RoomId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { player_name: String },
    Join { room_id: RoomId, player_name: String },
    Start,
    Topic { topic: String },
    Gif { gif_url: String },
    Vote { player_id: ConnectionId },
    Next,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a player id")]
    InvalidPlayerId(String),
    #[error("join or create a room first")]
    NoRoom,
}

pub const HELP: &str = "\
create <name>          create a room and become its host
join <room> <name>     join a room (or retake your seat)
start                  start the game (host)
topic <text>           set this round's topic (judge)
gif <url>              submit your gif
vote <player-id>       vote for another player's gif
next                   start the next round (host)
status                 show the room
quit                   leave the prompt";

impl Command {
    /// Parses one prompt line; blank lines yield None.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "create" => Command::Create {
                player_name: required(rest, "create <name>")?,
            },
            "join" => {
                let (room_id, player_name) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("join <room> <name>"))?;
                Command::Join {
                    room_id: room_id.to_string(),
                    player_name: required(player_name.trim(), "join <room> <name>")?,
                }
            }
            "start" => Command::Start,
            "topic" => Command::Topic {
                topic: required(rest, "topic <text>")?,
            },
            "gif" => Command::Gif {
                gif_url: required(rest, "gif <url>")?,
            },
            "vote" => {
                let raw = required(rest, "vote <player-id>")?;
                let player_id = raw
                    .parse()
                    .map_err(|_| CommandError::InvalidPlayerId(raw.clone()))?;
                Command::Vote { player_id }
            }
            "next" => Command::Next,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }

    /// Builds the packet for this command; room actions need the current room.
    ///
    /// Local commands (status, help, quit) have no packet.
    pub fn to_packet(&self, room_id: Option<&RoomId>) -> Result<Option<Packet>, CommandError> {
        let room = || room_id.cloned().ok_or(CommandError::NoRoom);

        let packet = match self {
            Command::Create { player_name } => Packet::CreateRoom {
                player_name: player_name.clone(),
            },
            Command::Join {
                room_id,
                player_name,
            } => Packet::JoinRoom {
                room_id: room_id.clone(),
                player_name: player_name.clone(),
            },
            Command::Start => Packet::StartGame { room_id: room()? },
            Command::Topic { topic } => Packet::SubmitTopic {
                room_id: room()?,
                topic: topic.clone(),
            },
            Command::Gif { gif_url } => Packet::SubmitGif {
                room_id: room()?,
                gif_url: gif_url.clone(),
            },
            Command::Vote { player_id } => Packet::SubmitVote {
                room_id: room()?,
                voted_player_id: *player_id,
            },
            Command::Next => Packet::NextRound { room_id: room()? },
            Command::Status | Command::Help | Command::Quit => return Ok(None),
        };

        Ok(Some(packet))
    }
}

fn required(value: &str, usage: &'static str) -> Result<String, CommandError> {
    if value.is_empty() {
        Err(CommandError::Usage(usage))
    } else {
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("create alice"),
            Ok(Some(Command::Create {
                player_name: "alice".to_string()
            }))
        );
        assert_eq!(
            Command::parse("  JOIN 123456 bob the builder "),
            Ok(Some(Command::Join {
                room_id: "123456".to_string(),
                player_name: "bob the builder".to_string()
            }))
        );
        assert_eq!(
            Command::parse("topic cats in hats"),
            Ok(Some(Command::Topic {
                topic: "cats in hats".to_string()
            }))
        );
        assert_eq!(
            Command::parse("vote 3"),
            Ok(Some(Command::Vote { player_id: 3 }))
        );
        assert_eq!(Command::parse("next"), Ok(Some(Command::Next)));
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Command::parse("create"),
            Err(CommandError::Usage("create <name>"))
        );
        assert_eq!(
            Command::parse("join 123456"),
            Err(CommandError::Usage("join <room> <name>"))
        );
        assert_eq!(
            Command::parse("vote bob"),
            Err(CommandError::InvalidPlayerId("bob".to_string()))
        );
        assert_eq!(
            Command::parse("dance"),
            Err(CommandError::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn test_room_actions_need_a_room() {
        assert_eq!(Command::Start.to_packet(None).err(), Some(CommandError::NoRoom));

        let room_id = "654321".to_string();
        match (Command::Gif {
            gif_url: "https://gifs.test/x".to_string(),
        })
        .to_packet(Some(&room_id))
        {
            Ok(Some(Packet::SubmitGif { room_id, gif_url })) => {
                assert_eq!(room_id, "654321");
                assert_eq!(gif_url, "https://gifs.test/x");
            }
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_local_commands_have_no_packet() {
        assert!(matches!(Command::Status.to_packet(None), Ok(None)));
        assert!(matches!(Command::Quit.to_packet(None), Ok(None)));
        assert!(matches!(
            Command::Create {
                player_name: "alice".to_string()
            }
            .to_packet(None),
            Ok(Some(Packet::CreateRoom { .. }))
        ));
    }
}
