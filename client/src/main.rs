use clap::Parser;
use client::commands::{Command, HELP};
use client::network::GameClient;
use log::{error, info};
use shared::{Packet, Room};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Session id from an earlier run, to retake your seat
    #[arg(long)]
    session: Option<String>,
}

#[tokio::main]
async fn main() -> client::ClientResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    let mut client = GameClient::new(&args.server).await?;
    client.connect(args.session).await?;

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut heartbeat_interval = interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(Command::Help)) => println!("{}", HELP),
                    Ok(Some(Command::Status)) => match client.room() {
                        Some(room) => println!("{}", describe_room(room)),
                        None => println!("Not in a room"),
                    },
                    Ok(Some(command)) => match command.to_packet(client.room_id()) {
                        Ok(Some(packet)) => client.send(&packet).await?,
                        Ok(None) => {}
                        Err(e) => println!("{}", e),
                    },
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            },

            packet = client.recv() => {
                match packet {
                    Ok(packet) => println!("{}", describe(&packet)),
                    Err(e) => error!("Error receiving packet: {}", e),
                }
            },

            _ = heartbeat_interval.tick() => {
                if client.is_connected() {
                    if let Err(e) = client.heartbeat().await {
                        error!("Error sending heartbeat: {}", e);
                    }
                }
            },
        }
    }

    client.disconnect().await?;
    if let Some(session_id) = client.session_id() {
        println!("Rejoin later with --session {}", session_id);
    }

    Ok(())
}

fn describe(packet: &Packet) -> String {
    match packet {
        Packet::Session {
            session_id,
            connection_id,
        } => format!("Connected as player {} (session {})", connection_id, session_id),
        Packet::GifSubmitted {
            player_count,
            submission_count,
        } => format!("{}/{} gifs submitted", submission_count, player_count),
        Packet::VoteSubmitted {
            player_count,
            vote_count,
        } => format!("{}/{} votes cast", vote_count, player_count),
        Packet::RoundEnded {
            room,
            winners,
            vote_counts,
        } => {
            let counts: Vec<String> = vote_counts
                .iter()
                .map(|count| format!("{}: {}", player_name(room, count.player_id), count.votes))
                .collect();
            let winners: Vec<String> = winners.iter().map(|id| player_name(room, *id)).collect();
            format!(
                "Round over. Votes [{}], winners: {}\n{}",
                counts.join(", "),
                winners.join(", "),
                describe_room(room)
            )
        }
        Packet::Error { message } => format!("Error: {}", message),
        Packet::Disconnected { reason } => format!("Disconnected: {}", reason),
        packet => match packet.room() {
            Some(room) => format!("[{}]\n{}", packet.name(), describe_room(room)),
            None => format!("[{}]", packet.name()),
        },
    }
}

fn describe_room(room: &Room) -> String {
    let mut lines = vec![format!(
        "Room {} | {} | round {}/{} | judge: {}",
        room.id,
        room.status,
        room.current_round,
        room.max_rounds,
        player_name(room, room.judge_id())
    )];

    if !room.topic.is_empty() {
        lines.push(format!("Topic: {}", room.topic));
    }
    for player in &room.players {
        let host = if player.id == room.host_id { " (host)" } else { "" };
        lines.push(format!(
            "  {} {}{}: {} points",
            player.id, player.name, host, player.points
        ));
    }
    for submission in &room.submissions {
        lines.push(format!(
            "  gif by {}: {}",
            player_name(room, submission.player_id),
            submission.gif_url
        ));
    }

    lines.join("\n")
}

fn player_name(room: &Room, id: shared::ConnectionId) -> String {
    room.player(id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| id.to_string())
}
