//! Performance benchmarks for critical game systems

use server::connection_manager::ConnectionManager;
use server::room::{GameRoom, RoomAction};
use server::room_store::RoomStore;
use server::session::SessionRegistry;
use server::tally::tally;
use shared::{Phase, Player, Vote, DEFAULT_MAX_ROUNDS};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

fn session(i: u32) -> String {
    format!("session-{}", i)
}

fn players(count: u32) -> Vec<Player> {
    (0..count)
        .map(|i| Player::new(i, session(i), format!("player-{}", i)))
        .collect()
}

/// Benchmarks vote tallying for a crowded room
#[test]
fn benchmark_tally() {
    let players = players(500);
    let votes: Vec<Vote> = (0..500)
        .map(|i| Vote {
            voter_id: i,
            voted_player_id: (i * 7 + 1) % 500,
        })
        .collect();

    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        let result = tally(&players, &votes);
        assert!(!result.winners.is_empty());
    }

    let duration = start.elapsed();
    println!(
        "Tally: {} players × {} iterations in {:?} ({:.2} μs/iter)",
        players.len(),
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks complete games played through the room state machine
#[test]
fn benchmark_full_games() {
    let seats = 8;
    let games = 200;
    let start = Instant::now();

    for game in 0..games {
        let mut all = players(seats).into_iter();
        let host = match all.next() {
            Some(host) => host,
            None => panic!("No host"),
        };
        let mut room = GameRoom::new(format!("{}", 100000 + game), host, DEFAULT_MAX_ROUNDS);
        for player in all {
            room.join(&player.session_id, player.id, &player.name).unwrap();
        }

        room.apply(&session(0), RoomAction::StartGame).unwrap();
        loop {
            let judge = room.room().judge_id();
            room.apply(
                &session(judge),
                RoomAction::SubmitTopic {
                    topic: "benchmarks".to_string(),
                },
            )
            .unwrap();
            for i in 0..seats {
                room.apply(
                    &session(i),
                    RoomAction::SubmitGif {
                        gif_url: format!("https://gifs.example/{}.gif", i),
                    },
                )
                .unwrap();
            }
            for i in 0..seats {
                room.apply(
                    &session(i),
                    RoomAction::SubmitVote {
                        voted_player_id: (i + 1) % seats,
                    },
                )
                .unwrap();
            }

            if room.phase() == Phase::GameOver {
                break;
            }
            room.apply(&session(0), RoomAction::NextRound).unwrap();
        }

        assert_eq!(room.room().current_round, DEFAULT_MAX_ROUNDS);
    }

    let duration = start.elapsed();
    println!(
        "Full games: {} games of {} rounds in {:?} ({:.2} μs/game)",
        games,
        DEFAULT_MAX_ROUNDS,
        duration,
        duration.as_micros() as f64 / games as f64
    );

    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks room creation including id collision retries
#[test]
fn benchmark_room_creation() {
    let mut store = RoomStore::new(DEFAULT_MAX_ROUNDS);
    let rooms = 10_000;
    let start = Instant::now();

    for i in 0..rooms {
        store
            .create(Player::new(i, session(i), format!("host-{}", i)))
            .unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Room creation: {} rooms in {:?} ({:.2} μs/room)",
        rooms,
        duration,
        duration.as_micros() as f64 / rooms as f64
    );

    assert_eq!(store.len(), rooms as usize);
    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks session resume and sweep
#[test]
fn benchmark_session_registry() {
    let mut registry = SessionRegistry::new();
    let sessions = 10_000;

    let start = Instant::now();
    let ids: Vec<String> = (0..sessions)
        .map(|connection| registry.resume_or_create(None, connection).session_id)
        .collect();
    for (connection, id) in ids.iter().enumerate() {
        let connection = sessions + connection as u32;
        let binding = registry.resume_or_create(Some(id.as_str()), connection);
        assert!(binding.resumed);
        registry.detach_connection(connection);
    }
    let evicted = registry.sweep_expired(
        Instant::now() + Duration::from_secs(3600),
        Duration::from_secs(300),
    );
    let duration = start.elapsed();

    println!(
        "Session registry: {} sessions created, resumed, dropped and swept in {:?}",
        sessions, duration
    );

    assert_eq!(evicted.len(), sessions as usize);
    assert!(registry.is_empty());
    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks connection lookups by address
#[test]
fn benchmark_connection_lookup() {
    let mut connections = ConnectionManager::new(256);
    let addrs: Vec<SocketAddr> = (0..256)
        .map(|i| SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 10_000 + i))
        .collect();
    for addr in &addrs {
        assert!(connections.open(*addr).is_some());
    }

    let iterations = 100_000;
    let start = Instant::now();

    for i in 0..iterations {
        let addr = addrs[i % addrs.len()];
        assert!(connections.find_by_addr(addr).is_some());
    }

    let duration = start.elapsed();
    println!(
        "Connection lookup: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks network packet serialization of a full room snapshot
#[test]
fn benchmark_packet_serialization() {
    use bincode::{deserialize, serialize};
    use shared::{Packet, Room, Submission, MAX_PACKET_SIZE};

    let mut all = players(12).into_iter();
    let host = match all.next() {
        Some(host) => host,
        None => panic!("No host"),
    };
    let mut room = Room::new("123456".to_string(), host, DEFAULT_MAX_ROUNDS);
    room.players.extend(all);
    room.status = Phase::Voting;
    room.topic = "When the build finally passes".to_string();
    room.submissions = (0..12)
        .map(|i| Submission {
            player_id: i,
            gif_url: format!("https://media.giphy.example/media/{:08}/giphy.gif", i),
        })
        .collect();

    let packet = Packet::AllGifsSubmitted { room };

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let serialized = serialize(&packet).unwrap();
        assert!(serialized.len() < MAX_PACKET_SIZE);
        let _deserialized: Packet = deserialize(&serialized).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Packet serialization: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}
