//! Server network layer handling UDP communications and the game event loop

use crate::config::ServerConfig;
use crate::connection_manager::ConnectionManager;
use crate::game::{GameState, Outbound};
use crate::session::SessionRegistry;
use crate::ServerResult;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ConnectionId, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ConnectionTimeout { connection_id: ConnectionId },
    ReapIdleRooms,
    Shutdown,
}

/// Messages sent from the game loop to the network sender
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    Deliver {
        packet: Packet,
        recipients: Vec<ConnectionId>,
    },
}

/// Main server coordinating networking, sessions and rooms
///
/// Every room-affecting packet is handled by the single loop in [`Server::run`],
/// which owns the room store; actions on the same room can therefore never
/// interleave. The session registry is shared with the sweeper task behind a
/// lock so that eviction and reconnection never overlap.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionManager>>,
    sessions: Arc<RwLock<SessionRegistry>>,
    game_state: GameState,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr()).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionManager::new(config.max_connections))),
            sessions: Arc::new(RwLock::new(SessionRegistry::new())),
            game_state: GameState::new(config.max_rounds),
            config,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Sender that can stop [`Server::run`] with [`ServerMessage::Shutdown`].
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::Deliver { packet, recipients } => {
                        let addrs = {
                            let connections_guard = connections.read().await;
                            connections_guard.addrs_for(&recipients)
                        };

                        for (connection_id, addr) in addrs {
                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to connection {}: {}", connection_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drops connections that went silent
    async fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.connection_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut connections_guard = connections.write().await;
                    connections_guard.check_timeouts(Instant::now(), timeout)
                };

                for connection_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ConnectionTimeout { connection_id })
                    {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    /// Spawns task that evicts expired sessions
    ///
    /// Runs beside the main loop; holding the registry write lock for the
    /// whole pass keeps it from racing a reconnect of the same session.
    async fn spawn_session_sweeper(&self) {
        let sessions = Arc::clone(&self.sessions);
        let period = self.config.session_sweep_interval;
        let ttl = self.config.session_ttl;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                let (evicted, remaining) = {
                    let mut sessions_guard = sessions.write().await;
                    let evicted = sessions_guard.sweep_expired(Instant::now(), ttl);
                    (evicted, sessions_guard.len())
                };

                if !evicted.is_empty() {
                    info!(
                        "Evicted {} expired sessions, {} remain",
                        evicted.len(),
                        remaining
                    );
                }
            }
        });
    }

    /// Spawns task that periodically asks the main loop to drop idle rooms
    async fn spawn_room_reaper(&self) {
        let server_tx = self.server_tx.clone();
        let period = self.config.room_reap_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                if server_tx.send(ServerMessage::ReapIdleRooms).is_err() {
                    break;
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> ServerResult<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn dispatch(&self, outbound: Vec<Outbound>) {
        for Outbound { packet, recipients } in outbound {
            if recipients.is_empty() {
                continue;
            }
            debug!("Sending {} to {:?}", packet.name(), recipients);
            if let Err(e) = self.game_tx.send(GameMessage::Deliver { packet, recipients }) {
                error!("Failed to queue outbound packet: {}", e);
            }
        }
    }

    /// Processes incoming packets and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                session_id,
            } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: format!("Unsupported client version {}", client_version),
                        },
                        addr,
                    );
                    return;
                }

                let (replaced, connection_id) = {
                    let mut connections = self.connections.write().await;
                    let replaced = connections.find_by_addr(addr);
                    (replaced, connections.open(addr))
                };

                let mut sessions = self.sessions.write().await;
                if let Some(replaced) = replaced {
                    sessions.detach_connection(replaced);
                }

                match connection_id {
                    Some(connection_id) => {
                        let outbound = self.game_state.connect(
                            &mut sessions,
                            connection_id,
                            session_id.as_deref(),
                        );
                        drop(sessions);
                        self.dispatch(outbound);
                    }
                    None => {
                        drop(sessions);
                        self.send_packet(
                            Packet::Disconnected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::Heartbeat => {
                let connection_id = {
                    let mut connections = self.connections.write().await;
                    let connection_id = connections.find_by_addr(addr);
                    if let Some(connection_id) = connection_id {
                        connections.touch(connection_id);
                    }
                    connection_id
                };

                // A connected player keeps their session alive between actions
                if let Some(connection_id) = connection_id {
                    self.sessions.write().await.touch_connection(connection_id);
                }
            }

            Packet::Disconnect => {
                let connection_id = {
                    let mut connections = self.connections.write().await;
                    let connection_id = connections.find_by_addr(addr);
                    if let Some(connection_id) = connection_id {
                        connections.close(connection_id);
                    }
                    connection_id
                };

                // Advisory only: the player keeps their seat and can reconnect
                if let Some(connection_id) = connection_id {
                    self.sessions.write().await.detach_connection(connection_id);
                }
            }

            packet => {
                let connection_id = {
                    let mut connections = self.connections.write().await;
                    let connection_id = connections.find_by_addr(addr);
                    if let Some(connection_id) = connection_id {
                        connections.touch(connection_id);
                    }
                    connection_id
                };

                let Some(connection_id) = connection_id else {
                    warn!("Dropping {} from unconnected peer {}", packet.name(), addr);
                    return;
                };

                let outbound = {
                    let mut sessions = self.sessions.write().await;
                    self.game_state
                        .handle_action(&mut sessions, connection_id, packet)
                };
                self.dispatch(outbound);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> ServerResult<()> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;
        self.spawn_session_sweeper().await;
        self.spawn_room_reaper().await;

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.handle_packet(packet, addr).await;
                }
                ServerMessage::ConnectionTimeout { connection_id } => {
                    debug!("Connection {} timed out", connection_id);
                    self.sessions.write().await.detach_connection(connection_id);
                }
                ServerMessage::ReapIdleRooms => {
                    let reaped = self
                        .game_state
                        .reap_idle_rooms(Instant::now(), self.config.room_idle_timeout);
                    if !reaped.is_empty() {
                        info!(
                            "Reaped {} idle rooms, {} remain",
                            reaped.len(),
                            self.game_state.rooms().len()
                        );
                    }
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio_test::assert_ok;

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_game_message_deliver() {
        let msg = GameMessage::Deliver {
            packet: Packet::GifSubmitted {
                player_count: 3,
                submission_count: 2,
            },
            recipients: vec![1, 2, 3],
        };

        match msg {
            GameMessage::Deliver { packet, recipients } => {
                assert_eq!(recipients, vec![1, 2, 3]);
                assert_eq!(packet.name(), "gif-submitted");
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        assert!(tx
            .send(ServerMessage::PacketReceived {
                packet: Packet::Heartbeat,
                addr,
            })
            .is_ok());

        match rx.try_recv() {
            Ok(ServerMessage::PacketReceived { packet, addr: a }) => {
                assert_eq!(a, addr);
                assert!(matches!(packet, Packet::Heartbeat));
            }
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_binds_ephemeral_port() {
        let server = assert_ok!(Server::new(test_config()).await);
        let addr = assert_ok!(server.local_addr());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_version_is_refused() {
        let mut server = assert_ok!(Server::new(test_config()).await);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9999);

        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION + 1,
                    session_id: None,
                },
                addr,
            )
            .await;

        assert!(server.connections.read().await.is_empty());
        match server.game_rx.try_recv() {
            Ok(GameMessage::SendPacket {
                packet: Packet::Disconnected { reason },
                ..
            }) => assert!(reason.contains("Unsupported")),
            other => panic!("Unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_keeps_session() {
        let mut server = assert_ok!(Server::new(test_config()).await);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9998);

        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                    session_id: None,
                },
                addr,
            )
            .await;
        assert_eq!(server.connections.read().await.len(), 1);

        server.handle_packet(Packet::Disconnect, addr).await;

        assert!(server.connections.read().await.is_empty());
        assert_eq!(server.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_refreshes_session() {
        let mut server = assert_ok!(Server::new(test_config()).await);
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 9997);

        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                    session_id: None,
                },
                addr,
            )
            .await;

        let session_id = match server.game_rx.try_recv() {
            Ok(GameMessage::Deliver {
                packet: Packet::Session { session_id, .. },
                ..
            }) => session_id,
            other => panic!("Unexpected message {:?}", other),
        };
        let connected_at = match server.sessions.read().await.get(&session_id) {
            Some(session) => session.last_seen,
            None => panic!("Session {} missing", session_id),
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        server.handle_packet(Packet::Heartbeat, addr).await;

        let sessions = server.sessions.read().await;
        match sessions.get(&session_id) {
            Some(session) => assert!(session.last_seen > connected_at),
            None => panic!("Session {} missing", session_id),
        }
    }
}
