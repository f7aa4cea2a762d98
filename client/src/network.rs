//! UDP transport and server clock estimation for the client
//!
//! The render loop runs on the main thread, so the socket lives on a small
//! tokio runtime of its own. Packets cross between the two through unbounded
//! channels; the render loop polls them once per frame without blocking.

use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::outbox::Outbound;
use shared::{Packet, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Seconds between clock-sync pings; they double as keep-alives
pub const PING_INTERVAL: f32 = 1.0;

/// Weight of a new offset estimate against the running one
const CLOCK_SMOOTHING: f32 = 0.1;

/// Estimates the server's network time from local time
///
/// The offset is first taken from the handshake and then refined with every
/// pong: `server_time + rtt / 2` is what the server clock read when the pong
/// arrived.
#[derive(Debug)]
pub struct NetworkClock {
    started: Instant,
    offset: Option<f32>,
    rtt: f32,
    last_ping: Option<f32>,
}

impl NetworkClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            offset: None,
            rtt: 0.0,
            last_ping: None,
        }
    }

    /// Seconds since this clock was created
    pub fn local_time(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    /// Estimated server time now.
    pub fn now(&self) -> f32 {
        self.to_network_time(self.local_time())
    }

    pub fn to_network_time(&self, local_time: f32) -> f32 {
        local_time + self.offset.unwrap_or(0.0)
    }

    pub fn is_synchronized(&self) -> bool {
        self.offset.is_some()
    }

    /// Round-trip time of the last pong in milliseconds
    pub fn rtt_ms(&self) -> u64 {
        (self.rtt * 1000.0).round() as u64
    }

    /// Seeds the offset from the server time in the handshake.
    pub fn on_connected(&mut self, server_time: f32, local_time: f32) {
        if self.offset.is_none() {
            self.offset = Some(server_time - local_time);
        }
    }

    /// Folds a pong into the offset estimate. `client_time` is the local time
    /// the ping was sent at.
    pub fn on_pong(&mut self, client_time: f32, server_time: f32, local_time: f32) {
        let rtt = local_time - client_time;
        if rtt < 0.0 {
            warn!("Ignoring pong from the future ({:.3}s)", rtt);
            return;
        }

        self.rtt = rtt;
        let estimate = server_time + rtt / 2.0 - local_time;
        self.offset = Some(match self.offset {
            Some(offset) => offset + (estimate - offset) * CLOCK_SMOOTHING,
            None => estimate,
        });
        debug!("Clock offset {:.4}s, rtt {:.1}ms", estimate, rtt * 1000.0);
    }

    /// Returns the local time to stamp a ping with when one is due.
    pub fn ping_due(&mut self, local_time: f32) -> Option<f32> {
        let due = self
            .last_ping
            .map_or(true, |last| local_time - last >= PING_INTERVAL);
        if due {
            self.last_ping = Some(local_time);
            Some(local_time)
        } else {
            None
        }
    }
}

impl Default for NetworkClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection to the server driven by background tasks
pub struct NetworkHandle {
    outgoing: mpsc::UnboundedSender<Packet>,
    incoming: mpsc::UnboundedReceiver<Packet>,
    // Keeps the socket tasks alive.
    _runtime: Runtime,
}

impl NetworkHandle {
    /// Binds a local socket and starts the send and receive tasks.
    /// `fake_ping_ms` adds that much round-trip latency, half each way.
    pub fn connect(server_addr: &str, fake_ping_ms: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr: SocketAddr = server_addr.parse()?;
        let runtime = Runtime::new()?;
        let socket = Arc::new(runtime.block_on(UdpSocket::bind("0.0.0.0:0"))?);
        info!("Client socket bound to {}", socket.local_addr()?);

        let one_way = Duration::from_millis(fake_ping_ms / 2);
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        runtime.spawn(Self::run_sender(Arc::clone(&socket), server_addr, outgoing_rx, one_way));
        runtime.spawn(Self::run_receiver(socket, server_addr, incoming_tx, one_way));

        Ok(Self {
            outgoing,
            incoming,
            _runtime: runtime,
        })
    }

    pub fn send(&self, packet: Packet) {
        if let Err(e) = self.outgoing.send(packet) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Sends what the simulation queued for the server.
    pub fn send_outbox(&self, messages: Vec<Outbound>) {
        for message in messages {
            match message {
                Outbound::ToAuthority(packet) => self.send(packet),
                other => warn!("Client cannot route {:?}", other),
            }
        }
    }

    /// Every packet received since the last call, in arrival order.
    pub fn poll(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.incoming.try_recv() {
            packets.push(packet);
        }
        packets
    }

    async fn run_sender(
        socket: Arc<UdpSocket>,
        server_addr: SocketAddr,
        mut outgoing: mpsc::UnboundedReceiver<Packet>,
        delay: Duration,
    ) {
        while let Some(packet) = outgoing.recv().await {
            let data = match serialize(&packet) {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to serialize packet: {}", e);
                    continue;
                }
            };

            if delay.is_zero() {
                if let Err(e) = socket.send_to(&data, server_addr).await {
                    error!("Failed to send packet: {}", e);
                }
            } else {
                let socket = Arc::clone(&socket);
                tokio::spawn(async move {
                    sleep(delay).await;
                    if let Err(e) = socket.send_to(&data, server_addr).await {
                        error!("Failed to send packet: {}", e);
                    }
                });
            }
        }
    }

    async fn run_receiver(
        socket: Arc<UdpSocket>,
        server_addr: SocketAddr,
        incoming: mpsc::UnboundedSender<Packet>,
        delay: Duration,
    ) {
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            let (len, addr) = match socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            if addr != server_addr {
                warn!("Ignoring datagram from unknown peer {}", addr);
                continue;
            }

            let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) else {
                warn!("Failed to deserialize packet from {}", addr);
                continue;
            };

            if delay.is_zero() {
                if incoming.send(packet).is_err() {
                    break;
                }
            } else {
                let incoming = incoming.clone();
                tokio::spawn(async move {
                    sleep(delay).await;
                    let _ = incoming.send(packet);
                });
            }
        }
    }
}
