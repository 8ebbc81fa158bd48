use crate::ClientResult;
use bincode::{deserialize, serialize};
use log::{debug, info, warn};
use shared::{ConnectionId, Packet, Room, RoomId, SessionId, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Protocol-level client: one UDP socket talking to one server
///
/// Keeps the identity the server handed out and the latest room snapshot it
/// broadcast, so callers can address room actions and reconnect with the
/// same session after a restart.
#[derive(Debug)]
pub struct GameClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    session_id: Option<SessionId>,
    connection_id: Option<ConnectionId>,
    room: Option<Room>,
}

impl GameClient {
    pub async fn new(server_addr: &str) -> ClientResult<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(GameClient {
            socket,
            server_addr,
            session_id: None,
            connection_id: None,
            room: None,
        })
    }

    /// Opens a connection, presenting `session_id` to retake an earlier identity.
    pub async fn connect(&mut self, session_id: Option<SessionId>) -> ClientResult<()> {
        info!("Connecting to {}...", self.server_addr);
        self.connection_id = None;

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
            session_id: session_id.or_else(|| self.session_id.clone()),
        };
        self.send(&packet).await
    }

    pub async fn send(&self, packet: &Packet) -> ClientResult<()> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    pub async fn heartbeat(&self) -> ClientResult<()> {
        self.send(&Packet::Heartbeat).await
    }

    pub async fn disconnect(&mut self) -> ClientResult<()> {
        if self.connection_id.take().is_some() {
            self.send(&Packet::Disconnect).await?;
        }
        Ok(())
    }

    /// Waits for the next packet from the server and records what it says.
    pub async fn recv(&mut self) -> ClientResult<Packet> {
        let mut buffer = vec![0u8; MAX_PACKET_SIZE];

        loop {
            let (len, from) = self.socket.recv_from(&mut buffer).await?;
            if from != self.server_addr {
                warn!("Ignoring datagram from unexpected peer {}", from);
                continue;
            }

            match deserialize::<Packet>(&buffer[..len]) {
                Ok(packet) => {
                    self.observe(&packet);
                    return Ok(packet);
                }
                Err(e) => warn!("Failed to deserialize packet: {}", e),
            }
        }
    }

    /// Like [`GameClient::recv`], giving up after `wait`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> ClientResult<Option<Packet>> {
        match timeout(wait, self.recv()).await {
            Ok(packet) => packet.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Receives until a packet satisfies `accept`, or `wait` elapses.
    pub async fn recv_until<F>(&mut self, wait: Duration, mut accept: F) -> ClientResult<Option<Packet>>
    where
        F: FnMut(&Packet) -> bool,
    {
        let deadline = tokio::time::Instant::now() + wait;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match self.recv_timeout(remaining).await? {
                Some(packet) if accept(&packet) => return Ok(Some(packet)),
                Some(packet) => debug!("Skipping {}", packet.name()),
                None => return Ok(None),
            }
        }
    }

    fn observe(&mut self, packet: &Packet) {
        match packet {
            Packet::Session {
                session_id,
                connection_id,
            } => {
                info!("Connected as {} (session {})", connection_id, session_id);
                self.session_id = Some(session_id.clone());
                self.connection_id = Some(*connection_id);
            }
            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connection_id = None;
            }
            packet => {
                if let Some(room) = packet.room() {
                    self.room = Some(room.clone());
                }
            }
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn connection_id(&self) -> Option<ConnectionId> {
        self.connection_id
    }

    pub fn is_connected(&self) -> bool {
        self.connection_id.is_some()
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.room.as_ref().map(|room| &room.id)
    }
}
