//! # Stomp Client Library
//!
//! Client side of the stomp game. The local player's entity is predicted:
//! every input is simulated immediately, forwarded to the server exactly once
//! and later reconciled against the server's result. Every other entity is
//! drawn one input frame behind, interpolated between the positions the
//! server broadcasts.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! [`game::ClientWorld`] holds the predicted local entity and the remote
//! entities, and applies server packets to them. It never touches a socket:
//! outgoing inputs are queued and drained by the caller.
//!
//! ### Input Module (`input`)
//! Keyboard reader implementing the shared `InputSource` trait.
//!
//! ### Network Module (`network`)
//! UDP send and receive tasks on a background runtime, optional simulated
//! latency, and the clock that estimates server time from ping/pong.
//!
//! ### Rendering Module (`rendering`)
//! Rectangles for platforms and entities, plus a small HUD.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientWorld;
//! use client::network::{NetworkClock, NetworkHandle};
//! use shared::config::SimulationConfig;
//! use shared::input::ScriptedInput;
//! use shared::physics::Arena;
//! use shared::{Packet, PROTOCOL_VERSION};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut network = NetworkHandle::connect("127.0.0.1:8080", 0)?;
//! let clock = NetworkClock::new();
//! let mut world = ClientWorld::new(SimulationConfig::default(), Arena::standard());
//! let mut input = ScriptedInput::constant(1.0, false);
//!
//! network.send(Packet::Connect {
//!     client_version: PROTOCOL_VERSION,
//!     name: "Hopper".to_string(),
//! });
//!
//! loop {
//!     for packet in network.poll() {
//!         world.handle_packet(packet, clock.now());
//!     }
//!     world.update(&mut input, clock.now());
//!     network.send_outbox(world.drain_outbox());
//! }
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
