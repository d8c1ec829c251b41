//! UDP server: socket tasks, packet handling and the fixed tick loop that
//! drives the simulation director and broadcasts replication output.

use crate::client_manager::ClientManager;
use crate::game::{Command, GameState};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{InputState, Packet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// The authority id this server signs its entities with. A single-server
/// deployment owns everything it spawns; mirrors only appear when a peer
/// authority feeds us snapshots.
const LOCAL_AUTHORITY: u32 = 1;

/// Longest simulated step; wall-clock stalls are dropped, not integrated.
const MAX_TICK_DT: f32 = 0.25;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the tick loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    tick_duration: Duration,

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
        info!("Server listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let mut game_state = GameState::new(LOCAL_AUTHORITY, None);
        game_state.populate_arena();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game_state,
            tick_duration,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

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

    /// Spawns the task that drains the outgoing packet queue
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

    /// Spawns the task that monitors client timeouts
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

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
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

    async fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket {
            packet: packet.clone(),
            addr,
        }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    async fn broadcast_packet(&self, packet: &Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // A reconnect from a known address replaces the old session.
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.game_state.queue_command(Command::DespawnPlayer {
                        client_id: existing_id,
                    });
                }

                // The entity id is reserved now so the welcome packet can
                // name it; the spawn itself runs at the next tick.
                let entity_id = self.game_state.reserve_entity_id();
                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr, entity_id)
                };

                if let Some(client_id) = client_id {
                    self.game_state.queue_command(Command::SpawnPlayer {
                        client_id,
                        entity_id,
                    });
                    let response = Packet::Connected {
                        client_id,
                        entity_id,
                    };
                    self.send_packet(&response, addr).await;
                } else {
                    let response = Packet::Disconnected {
                        reason: "Server full".to_string(),
                    };
                    self.send_packet(&response, addr).await;
                }
            }

            Packet::Input {
                sequence,
                timestamp,
                left,
                right,
                jump,
                attack,
            } => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let input = InputState {
                        sequence,
                        timestamp,
                        left,
                        right,
                        jump,
                        attack,
                    };

                    let mut clients = self.clients.write().await;
                    clients.add_input(client_id, input);
                }
            }

            Packet::DamageRequest {
                target,
                attacker,
                kind,
            } => {
                // Only connected peers may report hits, and the report is
                // re-validated by the director before any damage lands.
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    {
                        let mut clients = self.clients.write().await;
                        clients.touch(client_id);
                    }
                    debug!(
                        "Damage request from client {}: {:?} on {} by {}",
                        client_id, kind, target, attacker
                    );
                    self.game_state.queue_command(Command::DamageRequest {
                        target,
                        attacker,
                        kind,
                    });
                } else {
                    warn!("Damage request from unknown address {}", addr);
                }
            }

            Packet::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.game_state
                        .queue_command(Command::DespawnPlayer { client_id });
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Applies buffered inputs in timestamp order and advances one tick.
    async fn advance_simulation(&mut self, dt: f32) {
        let all_inputs = {
            let clients = self.clients.read().await;
            clients.get_chronological_inputs()
        };

        for (client_id, input) in &all_inputs {
            self.game_state.apply_input(*client_id, input);

            let mut clients = self.clients.write().await;
            clients.mark_input_processed(*client_id, input.sequence);
        }

        {
            let mut clients = self.clients.write().await;
            clients.cleanup_processed_inputs();
        }

        self.game_state.step(dt.min(MAX_TICK_DT));
    }

    /// Broadcasts queued events and changed entity snapshots.
    async fn broadcast_replication(&mut self) {
        let events = self.game_state.drain_events();
        let entities = self.game_state.changed_snapshots();

        // No peer authorities are configured in a single-server deployment,
        // so cross-authority hits have nowhere to go.
        for outbound in self.game_state.drain_outbound_damage() {
            warn!(
                "No route to authority {} for damage on entity {}",
                outbound.authority, outbound.target
            );
        }

        let client_count = {
            let clients = self.clients.read().await;
            clients.len()
        };
        if client_count == 0 {
            return;
        }

        for event in events {
            self.broadcast_packet(&Packet::Event { event }, None).await;
        }

        let last_processed_input = {
            let clients = self.clients.read().await;
            clients.get_last_processed_inputs()
        };

        // Take the timestamp as close to transmission as possible.
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_millis();
        let timestamp_safe = (timestamp.min(u64::MAX as u128)) as u64;

        let packet = Packet::GameState {
            tick: self.game_state.tick(),
            timestamp: timestamp_safe,
            last_processed_input,
            entities,
        };

        self.broadcast_packet(&packet, None).await;
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        let mut tick_interval = interval(self.tick_duration);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            self.game_state.queue_command(Command::DespawnPlayer { client_id });
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;

                    self.advance_simulation(dt).await;
                    self.broadcast_replication().await;

                    if self.game_state.tick() % 600 == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };
                        debug!(
                            "Tick {}: {} clients, {} entities",
                            self.game_state.tick(),
                            client_count,
                            self.game_state.entity_count()
                        );
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::GameEvent;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_server_message_carries_packet() {
        let packet = Packet::Connect { client_version: 1 };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                assert!(matches!(p, Packet::Connect { client_version: 1 }));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_game_message_broadcast_excludes() {
        let packet = Packet::Event {
            event: GameEvent::Died { entity_id: 4 },
        };
        let msg = GameMessage::BroadcastPacket {
            packet,
            exclude: Some(5),
        };

        match msg {
            GameMessage::BroadcastPacket { exclude, .. } => assert_eq!(exclude, Some(5)),
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_packet_serialization_roundtrip() {
        let test_packets = vec![
            Packet::Connect { client_version: 1 },
            Packet::Connected {
                client_id: 42,
                entity_id: 7,
            },
            Packet::Disconnect,
            Packet::Disconnected {
                reason: "Test".to_string(),
            },
            Packet::Input {
                sequence: 100,
                timestamp: 1234567890,
                left: true,
                right: false,
                jump: true,
                attack: false,
            },
            Packet::DamageRequest {
                target: 3,
                attacker: 9,
                kind: shared::AttackKind::PlayerMelee,
            },
        ];

        for packet in test_packets {
            let serialized = serialize(&packet).unwrap();
            assert!(serialized.len() < 2048);
            let deserialized: Packet = deserialize(&serialized).unwrap();

            match (&packet, &deserialized) {
                (Packet::Connect { .. }, Packet::Connect { .. }) => {}
                (Packet::Connected { .. }, Packet::Connected { .. }) => {}
                (Packet::Disconnect, Packet::Disconnect) => {}
                (Packet::Disconnected { .. }, Packet::Disconnected { .. }) => {}
                (Packet::Input { .. }, Packet::Input { .. }) => {}
                (Packet::DamageRequest { .. }, Packet::DamageRequest { .. }) => {}
                _ => panic!("Packet type mismatch after roundtrip"),
            }
        }
    }

    #[test]
    fn test_tick_dt_capped() {
        assert_eq!(2.0_f32.min(MAX_TICK_DT), MAX_TICK_DT);
        assert_eq!((1.0_f32 / 60.0).min(MAX_TICK_DT), 1.0 / 60.0);
    }
}
