//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::ClientManager;
use crate::match_clock::MatchClock;
use crate::world::WorldSimulation;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::config::SimulationConfig;
use shared::input::InputSample;
use shared::outbox::Outbound;
use shared::physics::Arena;
use shared::session::Session;
use shared::{sanitize_name, ClientId, MatchPhase, Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: ClientId },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    BroadcastPacket { packet: Packet, exclude: Option<ClientId> },
}

/// Turns a simulation message into a transport instruction.
///
/// Client-bound messages for clients that are gone are dropped, as are
/// authority-bound ones: the server is the authority.
pub fn route_outbound(message: Outbound, clients: &ClientManager) -> Option<GameMessage> {
    match message {
        Outbound::ToClient { client_id, packet } => clients
            .addr_of(client_id)
            .map(|addr| GameMessage::SendPacket { packet, addr }),
        Outbound::Broadcast(packet) => Some(GameMessage::BroadcastPacket {
            packet,
            exclude: None,
        }),
        Outbound::ToAuthority(packet) => {
            warn!("Dropping authority-bound packet on the server: {:?}", packet);
            None
        }
    }
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    world: WorldSimulation,
    match_clock: MatchClock,
    tick_duration: Duration,
    started: Instant,
    frame: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        tick_duration: Duration,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let world = WorldSimulation::new(
            Session::server(),
            SimulationConfig::default(),
            Arena::standard(),
            0.0,
        );

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            world,
            match_clock: MatchClock::new(180.0),
            tick_duration,
            started: Instant::now(),
            frame: 0,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Sets the length of one match.
    pub fn with_match_duration(mut self, seconds: f32) -> Self {
        self.match_clock = MatchClock::new(seconds);
        self
    }

    /// Adds `count` wandering bots to the world.
    pub fn with_bots(mut self, count: usize) -> Self {
        for index in 0..count {
            self.world.spawn_bot(&format!("Bot {}", index + 1));
        }
        self
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Seconds since the server started; the shared network clock
    fn network_time(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Spawns task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

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
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let client_addrs = {
                            let clients_guard = clients.read().await;
                            clients_guard.get_client_addrs()
                        };

                        for (client_id, addr) in client_addrs {
                            if Some(client_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to client {}: {}", client_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    async fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client in timed_out {
                    info!("Client {} timed out", client.id);
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout {
                        client_id: client.id,
                    }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Hands everything the world produced to the sender task.
    async fn flush_outbox(&mut self) {
        let messages = self.world.drain_outbox();
        if messages.is_empty() {
            return;
        }

        let clients = self.clients.read().await;
        for message in messages {
            if let Some(game_message) = route_outbound(message, &clients) {
                if let Err(e) = self.game_tx.send(game_message) {
                    error!("Failed to queue outgoing packet: {}", e);
                }
            }
        }
    }

    /// Processes incoming packets and updates game state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect {
                client_version,
                name,
            } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // Remove existing connection if present
                let existing = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .and_then(|id| clients.remove_client(&id))
                };
                if let Some(existing) = existing {
                    info!("Replacing existing client {} from {}", existing.id, addr);
                    self.world.despawn_owned_by(existing.id);
                }

                let name = sanitize_name(&name);
                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr, name.clone())
                };

                let Some(client_id) = client_id else {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    );
                    return;
                };

                let existing_entities = self.world.spawn_packets();
                let entity_id = self.world.spawn_entity(client_id, &name);
                self.clients.write().await.set_entity(client_id, entity_id);

                self.send_packet(
                    Packet::Connected {
                        client_id,
                        entity_id,
                        server_time: self.network_time(),
                    },
                    addr,
                );
                for packet in existing_entities {
                    self.send_packet(packet, addr);
                }
                self.send_packet(
                    Packet::MatchState {
                        phase: self.match_clock.phase(),
                        remaining: self.match_clock.remaining(),
                    },
                    addr,
                );
            }

            Packet::Input {
                entity_id,
                time,
                horizontal,
                jump,
                claimed_target,
            } => {
                let client_id = {
                    let mut clients = self.clients.write().await;
                    let client_id = clients.find_client_by_addr(addr);
                    if let Some(id) = client_id {
                        clients.touch(id);
                    }
                    client_id
                };

                if let Some(client_id) = client_id {
                    let mut sample = InputSample::new(time, horizontal, jump);
                    sample.claimed_target = claimed_target;
                    self.world.submit_input(client_id, entity_id, sample);
                }
            }

            Packet::Ping { client_time } => {
                let known = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .map(|id| clients.touch(id))
                        .is_some()
                };
                if known {
                    self.send_packet(
                        Packet::Pong {
                            client_time,
                            server_time: self.network_time(),
                        },
                        addr,
                    );
                }
            }

            Packet::Disconnect => {
                let removed = {
                    let mut clients = self.clients.write().await;
                    clients
                        .find_client_by_addr(addr)
                        .and_then(|id| clients.remove_client(&id))
                };

                if let Some(client) = removed {
                    self.world.despawn_owned_by(client.id);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Advances the match clock and announces phase changes.
    async fn update_match(&mut self, delta_time: f32) {
        let players = self.clients.read().await.len();

        if let Some(phase) = self.match_clock.update(delta_time, players) {
            match phase {
                MatchPhase::Finished => {
                    self.world.set_bots_active(false);
                    for (rank, (entity_id, name, score)) in
                        self.world.leaderboard().iter().enumerate().take(3)
                    {
                        info!("#{} {} (entity {}): {} stomps", rank + 1, name, entity_id, score);
                    }
                }
                MatchPhase::Playing => {
                    info!("Match started");
                    self.world.reset_scores();
                    self.world.set_bots_active(true);
                }
                MatchPhase::Waiting => {
                    info!("Waiting for players");
                    self.world.set_bots_active(false);
                }
            }
        }

        if self.match_clock.should_broadcast() && players > 0 {
            let packet = Packet::MatchState {
                phase: self.match_clock.phase(),
                remaining: self.match_clock.remaining(),
            };
            if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
                packet,
                exclude: None,
            }) {
                error!("Failed to queue match state: {}", e);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                            self.flush_outbox().await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.world.despawn_owned_by(client_id);
                            self.flush_outbox().await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    let network_time = self.network_time();
                    self.frame += 1;
                    self.world.drive_bots(network_time);
                    let steps = self.world.tick(network_time, self.frame);
                    self.update_match(dt).await;
                    self.flush_outbox().await;

                    // Periodic performance monitoring
                    if self.frame % 600 == 0 {
                        debug!(
                            "Frame {}: {} entities, {:.1}Hz, {} steps, {} snapshots",
                            self.frame,
                            self.world.entity_count(),
                            1.0 / dt.max(f32::EPSILON),
                            steps,
                            self.world.history().len()
                        );
                    }
                },
            }
        }

        Ok(())
    }
}
