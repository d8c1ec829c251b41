//! Non-blocking UDP connection to the server, polled once per frame from
//! the render loop.

use bincode::{deserialize, serialize};
use log::{info, warn};
use shared::Packet;
use std::io::ErrorKind;
use std::net::{ToSocketAddrs, UdpSocket};

pub struct Connection {
    socket: UdpSocket,
    pub client_id: Option<u32>,
    pub entity_id: Option<u32>,
}

impl Connection {
    /// Binds an ephemeral local port and sends the connect handshake. The
    /// `Connected` reply arrives later through [`Connection::poll`].
    pub fn connect(server: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| format!("Could not resolve server address: {}", server))?;

        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        socket.connect(server_addr)?;
        info!("Connecting to server at {}", server_addr);

        let connection = Connection {
            socket,
            client_id: None,
            entity_id: None,
        };
        connection.send(&Packet::Connect { client_version: 1 })?;
        Ok(connection)
    }

    pub fn send(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        match self.socket.send(&data) {
            Ok(_) => Ok(()),
            // A full send buffer drops the packet; UDP traffic is
            // loss-tolerant by design of the protocol.
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drains every packet currently readable on the socket. Handshake
    /// packets update the connection's own ids and are still returned.
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        let mut buffer = [0u8; 2048];

        loop {
            match self.socket.recv(&mut buffer) {
                Ok(len) => match deserialize::<Packet>(&buffer[0..len]) {
                    Ok(packet) => {
                        if let Packet::Connected {
                            client_id,
                            entity_id,
                        } = &packet
                        {
                            info!(
                                "Connected as client {} controlling entity {}",
                                client_id, entity_id
                            );
                            self.client_id = Some(*client_id);
                            self.entity_id = Some(*entity_id);
                        }
                        packets.push(packet);
                    }
                    Err(e) => warn!("Failed to deserialize server packet: {}", e),
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Socket receive error: {}", e);
                    break;
                }
            }
        }

        packets
    }

    pub fn is_connected(&self) -> bool {
        self.client_id.is_some()
    }

    pub fn disconnect(&self) {
        if self.send(&Packet::Disconnect).is_err() {
            warn!("Failed to send disconnect notice");
        }
    }
}
